use std::fmt::Display;

use fxhash::FxHashSet;
use serde::Serialize;

use crate::{constants::DEFAULT_TOWER_RANGE_METERS, geopoint::GeoPoint};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RadioType {
    #[serde(rename = "GSM")]
    Gsm,
    #[serde(rename = "UMTS")]
    Umts,
    #[serde(rename = "CDMA")]
    Cdma,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "5G")]
    Nr,
    #[serde(rename = "unknown")]
    Unknown,
}

impl RadioType {
    /// Parses dataset radio tags, `NR` and `5G` both map to [`RadioType::Nr`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "GSM" => RadioType::Gsm,
            "UMTS" => RadioType::Umts,
            "CDMA" => RadioType::Cdma,
            "LTE" => RadioType::Lte,
            "NR" | "5G" => RadioType::Nr,
            _ => RadioType::Unknown,
        }
    }

    pub fn is_modern(&self) -> bool {
        matches!(self, RadioType::Lte | RadioType::Nr)
    }
}

impl Display for RadioType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RadioType::Gsm => "GSM",
                RadioType::Umts => "UMTS",
                RadioType::Cdma => "CDMA",
                RadioType::Lte => "LTE",
                RadioType::Nr => "5G",
                RadioType::Unknown => "unknown",
            }
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerSource {
    Dataset,
    Mock,
}

impl Display for TowerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TowerSource::Dataset => "dataset",
                TowerSource::Mock => "mock",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellTower {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub position: GeoPoint,
    pub radio: RadioType,
    /// dBm, typically in [-120, -50]
    pub average_signal: f64,
    /// Nominal range in meters, non-positive when unknown
    pub range: f64,
    pub source: TowerSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<u32>,
}

/// Identity of a tower site: coordinates rounded to 5 decimals (~1 m) and radio.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TowerKey {
    lat_e5: i64,
    lng_e5: i64,
    radio: RadioType,
}

impl CellTower {
    pub fn key(&self) -> TowerKey {
        TowerKey {
            lat_e5: (self.position.lat * 1e5).round() as i64,
            lng_e5: (self.position.lng * 1e5).round() as i64,
            radio: self.radio,
        }
    }

    pub fn effective_range(&self) -> f64 {
        if self.range > 0.0 {
            self.range
        } else {
            DEFAULT_TOWER_RANGE_METERS
        }
    }
}

/// Keeps the first tower of every [`TowerKey`], preserving order.
pub fn dedup_towers(towers: Vec<CellTower>) -> Vec<CellTower> {
    let mut seen = FxHashSet::default();
    towers
        .into_iter()
        .filter(|tower| seen.insert(tower.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tower(lat: f64, lng: f64, radio: RadioType) -> CellTower {
        CellTower {
            id: None,
            position: GeoPoint::new(lat, lng),
            radio,
            average_signal: -80.0,
            range: 0.0,
            source: TowerSource::Dataset,
            samples: None,
        }
    }

    #[test]
    fn test_radio_parse() {
        assert_eq!(RadioType::parse("lte"), RadioType::Lte);
        assert_eq!(RadioType::parse("NR"), RadioType::Nr);
        assert_eq!(RadioType::parse("5G"), RadioType::Nr);
        assert_eq!(RadioType::parse("wimax"), RadioType::Unknown);
        assert!(RadioType::Nr.is_modern());
        assert!(!RadioType::Gsm.is_modern());
    }

    #[test]
    fn test_dedup_by_rounded_coordinates_and_radio() {
        let towers = vec![
            tower(42.000001, -71.000001, RadioType::Lte),
            tower(42.000002, -71.000002, RadioType::Lte),
            tower(42.000001, -71.000001, RadioType::Gsm),
            tower(42.1, -71.0, RadioType::Lte),
        ];

        let deduped = dedup_towers(towers);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[1].radio, RadioType::Gsm);
    }

    #[test]
    fn test_effective_range() {
        let mut t = tower(0.0, 0.0, RadioType::Lte);
        assert_eq!(t.effective_range(), DEFAULT_TOWER_RANGE_METERS);
        t.range = 1200.0;
        assert_eq!(t.effective_range(), 1200.0);
    }
}
