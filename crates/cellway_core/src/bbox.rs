use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::geopoint::GeoPoint;

/// Axis aligned latitude / longitude rectangle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Corners may be given in any order.
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        BoundingBox {
            min_lat: min_lat.min(max_lat),
            min_lng: min_lng.min(max_lng),
            max_lat: min_lat.max(max_lat),
            max_lng: min_lng.max(max_lng),
        }
    }

    pub fn around(a: &GeoPoint, b: &GeoPoint) -> Self {
        BoundingBox::new(a.lat, a.lng, b.lat, b.lng)
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox::new(first.lat, first.lng, first.lat, first.lng);
        for point in iter {
            bbox.extend(point);
        }
        Some(bbox)
    }

    pub fn extend(&mut self, point: &GeoPoint) {
        self.min_lat = self.min_lat.min(point.lat);
        self.min_lng = self.min_lng.min(point.lng);
        self.max_lat = self.max_lat.max(point.lat);
        self.max_lng = self.max_lng.max(point.lng);
    }

    /// Grows every side by `degrees`, clamped to valid coordinates.
    pub fn expand(&self, degrees: f64) -> Self {
        BoundingBox {
            min_lat: (self.min_lat - degrees).max(-90.0),
            min_lng: (self.min_lng - degrees).max(-180.0),
            max_lat: (self.max_lat + degrees).min(90.0),
            max_lng: (self.max_lng + degrees).min(180.0),
        }
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        BoundingBox {
            min_lat: self.min_lat.min(other.min_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lat: self.max_lat.max(other.max_lat),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }

    pub fn intersection(&self, other: &BoundingBox) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_lat: self.min_lat.max(other.min_lat),
            min_lng: self.min_lng.max(other.min_lng),
            max_lat: self.max_lat.min(other.max_lat),
            max_lng: self.max_lng.min(other.max_lng),
        })
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        other.min_lat <= self.max_lat
            && other.min_lng <= self.max_lng
            && self.min_lat <= other.max_lat
            && self.min_lng <= other.max_lng
    }

    pub fn contains_point(&self, point: &GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lng >= self.min_lng
            && other.max_lng <= self.max_lng
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        self.lat_span() * self.lng_span()
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Scales both spans by `factor` around the center.
    pub fn scale(&self, factor: f64) -> Self {
        self.with_spans(self.lat_span() * factor, self.lng_span() * factor)
    }

    /// Box with the same center and the given spans.
    pub fn with_spans(&self, lat_span: f64, lng_span: f64) -> Self {
        let center = self.center();
        BoundingBox {
            min_lat: center.lat - lat_span / 2.0,
            min_lng: center.lng - lng_span / 2.0,
            max_lat: center.lat + lat_span / 2.0,
            max_lng: center.lng + lng_span / 2.0,
        }
    }

    /// Stable key quantized to 4 decimal degrees (~11 m).
    pub fn cache_key(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.min_lat, self.min_lng, self.max_lat, self.max_lng
        )
    }
}
