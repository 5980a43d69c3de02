//! Coarse signal estimation from nearby towers.
//!
//! The estimate is an inverse-square-distance weighted mean of the towers that
//! reach a point, it is not a propagation model.

use cellway_core::{
    BoundingBox, GeoPoint,
    constants::{LOW_SIGNAL_THRESHOLD_DBM, NO_COVERAGE_DBM, normalize_signal},
    geometry::{cumulative_distances, project_onto_polyline, sample_indices},
    tower::CellTower,
};
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_MAX_TOWER_DISTANCE_METERS: f64 = 2_500.0;
pub const MAX_TOWERS_ON_ROUTE: usize = 200;
pub const MAX_SIGNAL_SAMPLES: usize = 100;

/// Distances under this are treated as this, a tower on top of the point would
/// otherwise take the whole weight.
const MIN_WEIGHT_DISTANCE_METERS: f64 = 100.0;

/// Signal assumed for a tower without a recorded average.
const UNKNOWN_TOWER_SIGNAL_DBM: f64 = -70.0;

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Estimated signal at `point` in dBm, [`NO_COVERAGE_DBM`] when no tower
/// reaches it.
pub fn estimate_signal(point: &GeoPoint, towers: &[CellTower]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for tower in towers {
        let distance = point.haversine_distance(&tower.position);
        if distance > tower.effective_range() {
            continue;
        }

        let distance = distance.max(MIN_WEIGHT_DISTANCE_METERS);
        let weight = 1.0 / (distance * distance);
        let signal = if tower.average_signal == 0.0 {
            UNKNOWN_TOWER_SIGNAL_DBM
        } else {
            tower.average_signal
        };

        weighted_sum += signal * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return NO_COVERAGE_DBM;
    }

    weighted_sum / total_weight
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerOnRoute {
    pub tower: CellTower,
    /// Meters between the tower and the closest point of the route.
    pub distance_to_route: f64,
    /// Normalized position of the tower projection along the route, in [0, 1].
    pub position: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SignalStats {
    pub average_signal: f64,
    pub min_signal: f64,
    pub signal_variance: f64,
    /// Fraction of samples under -90 dBm.
    pub low_signal_fraction: f64,
    pub samples: usize,
}

impl SignalStats {
    /// Statistics of a route with no sample at all.
    pub fn empty() -> Self {
        SignalStats {
            average_signal: NO_COVERAGE_DBM,
            min_signal: NO_COVERAGE_DBM,
            signal_variance: 0.0,
            low_signal_fraction: 1.0,
            samples: 0,
        }
    }

    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return SignalStats::empty();
        }

        let n = samples.len() as f64;
        let average_signal = samples.iter().sum::<f64>() / n;
        let min_signal = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let signal_variance = samples
            .iter()
            .map(|s| (s - average_signal).powi(2))
            .sum::<f64>()
            / n;
        let low = samples
            .iter()
            .filter(|&&s| s < LOW_SIGNAL_THRESHOLD_DBM)
            .count() as f64;

        SignalStats {
            average_signal,
            min_signal,
            signal_variance,
            low_signal_fraction: low / n,
            samples: samples.len(),
        }
    }

    /// Average signal mapped onto [0, 1].
    pub fn signal_score(&self) -> f64 {
        normalize_signal(self.average_signal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageProfile {
    /// Sorted by position along the route.
    pub towers: Vec<TowerOnRoute>,
    pub stats: SignalStats,
}

impl CoverageProfile {
    pub fn tower_count(&self) -> usize {
        self.towers.len()
    }

    pub fn cell_towers(&self) -> Vec<CellTower> {
        self.towers.iter().map(|t| t.tower.clone()).collect()
    }
}

/// Signal statistics over at most [`MAX_SIGNAL_SAMPLES`] evenly spaced points of `geometry`.
pub fn sample_signal_stats(geometry: &[GeoPoint], towers: &[CellTower]) -> SignalStats {
    let samples: Vec<f64> = sample_indices(geometry.len(), MAX_SIGNAL_SAMPLES)
        .map(|i| estimate_signal(&geometry[i], towers))
        .collect();

    SignalStats::from_samples(&samples)
}

/// Keeps the towers within `max_distance` meters of `geometry`, ordered along it.
pub fn associate_towers(
    geometry: &[GeoPoint],
    towers: &[CellTower],
    max_distance: f64,
) -> CoverageProfile {
    let stats = sample_signal_stats(geometry, towers);

    let Some(search_area) = BoundingBox::from_points(geometry.iter()) else {
        return CoverageProfile {
            towers: Vec::new(),
            stats,
        };
    };

    let lat_buffer = max_distance / METERS_PER_DEGREE;
    let max_abs_lat = search_area.min_lat.abs().max(search_area.max_lat.abs());
    let lng_buffer = lat_buffer / max_abs_lat.to_radians().cos().max(0.01);
    let search_area = BoundingBox::new(
        search_area.min_lat - lat_buffer,
        search_area.min_lng - lng_buffer,
        search_area.max_lat + lat_buffer,
        search_area.max_lng + lng_buffer,
    );

    let cumulative = cumulative_distances(geometry);

    let mut on_route: Vec<TowerOnRoute> = towers
        .iter()
        .filter(|tower| search_area.contains_point(&tower.position))
        .filter_map(|tower| {
            let projection = project_onto_polyline(&tower.position, geometry, &cumulative)?;
            (projection.distance <= max_distance).then(|| TowerOnRoute {
                tower: tower.clone(),
                distance_to_route: projection.distance,
                position: projection.position,
            })
        })
        .collect();

    on_route.sort_by(|a, b| a.position.total_cmp(&b.position));

    let found = on_route.len();
    let towers = downsample_evenly(on_route, MAX_TOWERS_ON_ROUTE);

    debug!(
        "Coverage: {} towers within {}m of route, kept {}, average signal {:.1} dBm",
        found,
        max_distance,
        towers.len(),
        stats.average_signal
    );

    CoverageProfile { towers, stats }
}

/// Picks `cap` items spread evenly over `items`, keeping their order.
fn downsample_evenly<T>(items: Vec<T>, cap: usize) -> Vec<T> {
    let len = items.len();
    if len <= cap {
        return items;
    }

    let mut keep = (0..cap).map(|i| i * len / cap).peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use cellway_core::tower::{RadioType, TowerSource};

    use super::*;

    fn tower(lat: f64, lng: f64, signal: f64, range: f64) -> CellTower {
        CellTower {
            id: None,
            position: GeoPoint::new(lat, lng),
            radio: RadioType::Lte,
            average_signal: signal,
            range,
            source: TowerSource::Mock,
            samples: None,
        }
    }

    fn route() -> Vec<GeoPoint> {
        (0..=20)
            .map(|i| GeoPoint::new(42.30, -71.10 + i as f64 * 0.0025))
            .collect()
    }

    #[test]
    fn test_no_tower_in_range() {
        let towers = vec![tower(43.0, -71.0, -60.0, 1000.0)];
        assert_eq!(estimate_signal(&GeoPoint::new(42.0, -71.0), &towers), NO_COVERAGE_DBM);
        assert_eq!(estimate_signal(&GeoPoint::new(42.0, -71.0), &[]), NO_COVERAGE_DBM);
    }

    #[test]
    fn test_closer_tower_dominates() {
        let point = GeoPoint::new(42.30, -71.10);
        let towers = vec![
            tower(42.301, -71.10, -60.0, 5000.0),
            tower(42.32, -71.10, -110.0, 5000.0),
        ];

        let signal = estimate_signal(&point, &towers);
        assert!(signal > -65.0, "{signal}");
    }

    #[test]
    fn test_signal_is_non_increasing_with_distance() {
        for base in [-60.0, -95.0, -115.0] {
            let towers = vec![tower(42.30, -71.10, base, 3000.0)];
            let mut previous = f64::INFINITY;
            // 0.001 deg of latitude is ~111m, so the sweep stays inside the range
            for step in 0..27 {
                let point = GeoPoint::new(42.30 + step as f64 * 0.001, -71.10);
                let signal = estimate_signal(&point, &towers);
                assert!(signal <= previous, "{base} at step {step}");
                previous = signal;
            }
        }
    }

    #[test]
    fn test_weak_tower_is_not_floored() {
        let towers = vec![tower(42.3045, -71.10, -110.0, 3000.0)];
        let signal = estimate_signal(&GeoPoint::new(42.30, -71.10), &towers);
        assert_eq!(signal, -110.0);

        let towers = vec![
            tower(42.3045, -71.10, -110.0, 3000.0),
            tower(42.2955, -71.10, -120.0, 3000.0),
        ];
        let signal = estimate_signal(&GeoPoint::new(42.30, -71.10), &towers);
        assert!((signal - -115.0).abs() < 0.01, "{signal}");
    }

    #[test]
    fn test_missing_range_uses_default() {
        // ~4.4km away, inside the 5km default
        let towers = vec![tower(42.34, -71.10, -75.0, 0.0)];
        let signal = estimate_signal(&GeoPoint::new(42.30, -71.10), &towers);
        assert_eq!(signal, -75.0);
    }

    #[test]
    fn test_associate_towers_respects_max_distance() {
        let geometry = route();
        let towers: Vec<CellTower> = (0..40)
            .map(|i| tower(42.30 + (i as f64 - 20.0) * 0.002, -71.08, -80.0, 3000.0))
            .collect();

        let profile = associate_towers(&geometry, &towers, DEFAULT_MAX_TOWER_DISTANCE_METERS);

        assert!(!profile.towers.is_empty());
        assert!(profile.tower_count() < towers.len());
        for on_route in &profile.towers {
            assert!(on_route.distance_to_route <= DEFAULT_MAX_TOWER_DISTANCE_METERS);
        }
    }

    #[test]
    fn test_associate_towers_sorted_by_position() {
        let geometry = route();
        let towers = vec![
            tower(42.301, -71.06, -80.0, 3000.0),
            tower(42.299, -71.095, -80.0, 3000.0),
            tower(42.302, -71.08, -80.0, 3000.0),
        ];

        let profile = associate_towers(&geometry, &towers, DEFAULT_MAX_TOWER_DISTANCE_METERS);
        let positions: Vec<f64> = profile.towers.iter().map(|t| t.position).collect();

        assert_eq!(positions.len(), 3);
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));
        assert!(positions[0] < 0.2);
        assert!(positions[2] > 0.7);
    }

    #[test]
    fn test_associate_towers_downsamples_evenly() {
        let geometry = route();
        let towers: Vec<CellTower> = (0..500)
            .map(|i| tower(42.3005, -71.10 + i as f64 * 0.0001, -80.0, 3000.0))
            .collect();

        let profile = associate_towers(&geometry, &towers, DEFAULT_MAX_TOWER_DISTANCE_METERS);

        assert_eq!(profile.tower_count(), MAX_TOWERS_ON_ROUTE);
        let first = profile.towers.first().unwrap().position;
        let last = profile.towers.last().unwrap().position;
        assert!(first < 0.01);
        assert!(last > 0.95, "{last}");
    }

    #[test]
    fn test_stats_without_towers() {
        let profile = associate_towers(&route(), &[], DEFAULT_MAX_TOWER_DISTANCE_METERS);
        assert_eq!(profile.stats.average_signal, NO_COVERAGE_DBM);
        assert_eq!(profile.stats.low_signal_fraction, 1.0);
        assert_eq!(profile.stats.signal_variance, 0.0);
    }

    #[test]
    fn test_stats_from_samples() {
        let stats = SignalStats::from_samples(&[-80.0, -100.0, -60.0, -100.0]);
        assert_eq!(stats.average_signal, -85.0);
        assert_eq!(stats.min_signal, -100.0);
        assert_eq!(stats.low_signal_fraction, 0.5);
        assert_eq!(stats.signal_variance, 275.0);
        assert_eq!(stats.samples, 4);

        let empty = SignalStats::from_samples(&[]);
        assert_eq!(empty.average_signal, NO_COVERAGE_DBM);
        assert_eq!(empty.low_signal_fraction, 1.0);
    }

    #[test]
    fn test_downsample_evenly() {
        let kept = downsample_evenly((0..10).collect(), 4);
        assert_eq!(kept, vec![0, 2, 5, 7]);
        assert_eq!(downsample_evenly(vec![1, 2], 4), vec![1, 2]);
    }
}
