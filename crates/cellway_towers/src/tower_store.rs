use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use cellway_core::{
    BoundingBox, GeoPoint,
    tower::{CellTower, RadioType, TowerSource, dedup_towers},
};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const MAX_DATASET_TOWERS: usize = 500;
pub const SAMPLING_SEED: u64 = 42;

const MOCK_TOWER_COUNT: RangeInclusive<usize> = 30..=80;
const MOCK_SIGNAL_DBM: RangeInclusive<i32> = -115..=-65;
const BACKFILL_SIGNAL_DBM: RangeInclusive<i32> = -110..=-70;

/// Weighted towards modern technology.
const MOCK_RADIO_MIX: [RadioType; 7] = [
    RadioType::Lte,
    RadioType::Lte,
    RadioType::Lte,
    RadioType::Nr,
    RadioType::Nr,
    RadioType::Umts,
    RadioType::Gsm,
];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Cell tower dataset not found at {0}")]
    NotFound(PathBuf),

    #[error("Cell tower dataset at {0} has no usable record")]
    Empty(PathBuf),

    #[error("Failed to read cell tower dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of an OpenCelliD style export.
#[derive(Deserialize)]
struct TowerRecord {
    radio: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    mcc: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    net: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    area: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    cell: Option<u64>,
    lon: f64,
    lat: f64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    range: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    samples: Option<u32>,
    #[serde(
        default,
        rename = "averageSignal",
        deserialize_with = "csv::invalid_option"
    )]
    average_signal: Option<f64>,
}

impl TowerRecord {
    fn into_tower<R: Rng>(self, rng: &mut R) -> Option<CellTower> {
        let position = GeoPoint::try_new(self.lat, self.lon).ok()?;

        let average_signal = match self.average_signal {
            Some(signal) if signal != 0.0 && signal.is_finite() => signal,
            _ => rng.random_range(BACKFILL_SIGNAL_DBM) as f64,
        };

        let id = match (self.mcc, self.net, self.area, self.cell) {
            (Some(mcc), Some(net), Some(area), Some(cell)) => {
                Some(format!("{mcc}-{net}-{area}-{cell}"))
            }
            _ => None,
        };

        Some(CellTower {
            id,
            position,
            radio: RadioType::parse(&self.radio),
            average_signal,
            range: self.range.unwrap_or(0.0),
            source: TowerSource::Dataset,
            samples: self.samples,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TowerQuery {
    pub towers: Vec<CellTower>,
    /// Number of matching records before sampling.
    pub total_in_area: usize,
    pub source: TowerSource,
}

impl TowerQuery {
    /// Synthetic towers spread over `bbox`.
    pub fn mock(bbox: &BoundingBox) -> Self {
        let towers = generate_mock_towers(bbox, &mut rand::rng());
        TowerQuery {
            total_in_area: towers.len(),
            towers,
            source: TowerSource::Mock,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TowerStoreParams {
    pub dataset_path: Option<PathBuf>,
    pub max_towers: usize,
    pub sampling_seed: u64,
}

impl Default for TowerStoreParams {
    fn default() -> Self {
        TowerStoreParams {
            dataset_path: None,
            max_towers: MAX_DATASET_TOWERS,
            sampling_seed: SAMPLING_SEED,
        }
    }
}

/// Answers bounding box queries from a tower dataset, falling back to
/// synthetic towers whenever the dataset cannot answer.
pub struct TowerStore {
    params: TowerStoreParams,
    dataset: OnceLock<Option<Vec<CellTower>>>,
}

impl TowerStore {
    pub fn new(params: TowerStoreParams) -> Self {
        TowerStore {
            params,
            dataset: OnceLock::new(),
        }
    }

    /// Towers inside `bbox`. Never fails, the result is tagged with its source.
    pub fn get_towers(&self, bbox: &BoundingBox) -> TowerQuery {
        info!("TowerStore: fetching cell towers in {}", bbox);

        let Some(dataset) = self.dataset() else {
            return TowerQuery::mock(bbox);
        };

        let in_area: Vec<&CellTower> = dataset
            .iter()
            .filter(|tower| bbox.contains_point(&tower.position))
            .collect();

        let total_in_area = in_area.len();
        if total_in_area == 0 {
            warn!("TowerStore: no dataset tower in {}, using mock towers", bbox);
            return TowerQuery::mock(bbox);
        }

        let towers: Vec<CellTower> = if total_in_area > self.params.max_towers {
            info!(
                "TowerStore: found {} towers, sampling down to {}",
                total_in_area, self.params.max_towers
            );
            let mut rng = StdRng::seed_from_u64(self.params.sampling_seed);
            in_area
                .choose_multiple(&mut rng, self.params.max_towers)
                .map(|tower| (*tower).clone())
                .collect()
        } else {
            in_area.into_iter().cloned().collect()
        };

        info!(
            "TowerStore: returning {} of {} dataset towers",
            towers.len(),
            total_in_area
        );

        TowerQuery {
            towers,
            total_in_area,
            source: TowerSource::Dataset,
        }
    }

    fn dataset(&self) -> Option<&Vec<CellTower>> {
        self.dataset
            .get_or_init(|| {
                let path = self.params.dataset_path.as_ref()?;
                match load_dataset(path) {
                    Ok(towers) => {
                        info!(
                            "TowerStore: loaded {} towers from {}",
                            towers.len(),
                            path.display()
                        );
                        Some(towers)
                    }
                    Err(error) => {
                        warn!("TowerStore: {}, falling back to mock towers", error);
                        None
                    }
                }
            })
            .as_ref()
    }
}

pub fn load_dataset(path: &Path) -> Result<Vec<CellTower>, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut rng = rand::rng();
    let mut skipped = 0;
    let mut towers = Vec::new();

    for record in reader.deserialize::<TowerRecord>() {
        match record.ok().and_then(|record| record.into_tower(&mut rng)) {
            Some(tower) => towers.push(tower),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("TowerStore: skipped {} malformed records", skipped);
    }

    if towers.is_empty() {
        return Err(DatasetError::Empty(path.to_path_buf()));
    }

    Ok(dedup_towers(towers))
}

/// Between 30 and 80 towers uniformly spread over `bbox`.
pub fn generate_mock_towers<R: Rng>(bbox: &BoundingBox, rng: &mut R) -> Vec<CellTower> {
    let count = rng.random_range(MOCK_TOWER_COUNT);
    let lat_span = bbox.lat_span();
    let lng_span = bbox.lng_span();

    let towers: Vec<CellTower> = (0..count)
        .map(|i| {
            let lat = bbox.min_lat + rng.random::<f64>() * lat_span;
            let lng = bbox.min_lng + rng.random::<f64>() * lng_span;
            let radio = MOCK_RADIO_MIX[rng.random_range(0..MOCK_RADIO_MIX.len())];
            let range = if radio == RadioType::Nr {
                rng.random_range(500..=2000)
            } else {
                rng.random_range(1000..=5000)
            };

            CellTower {
                id: Some(format!("mock_{i}")),
                position: GeoPoint::new(lat, lng),
                radio,
                average_signal: rng.random_range(MOCK_SIGNAL_DBM) as f64,
                range: range as f64,
                source: TowerSource::Mock,
                samples: Some(rng.random_range(1..=50)),
            }
        })
        .collect();

    info!("TowerStore: generated {} mock cell towers", towers.len());
    towers
}
