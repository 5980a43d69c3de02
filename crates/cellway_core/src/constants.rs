/// Mean earth radius, matches the radius used by `geo::Haversine`.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Very poor signal returned when no tower covers a point.
pub const NO_COVERAGE_DBM: f64 = -100.0;

/// Signal values below this are counted as low-signal samples.
pub const LOW_SIGNAL_THRESHOLD_DBM: f64 = -90.0;

/// Bounds used to map a dBm value onto [0, 1].
pub const SIGNAL_FLOOR_DBM: f64 = -120.0;
pub const SIGNAL_CEILING_DBM: f64 = -50.0;

pub const DEFAULT_TOWER_RANGE_METERS: f64 = 5_000.0;

/// Maps a signal strength onto [0, 1], -120 dBm being 0 and -50 dBm being 1.
pub fn normalize_signal(signal_dbm: f64) -> f64 {
    ((signal_dbm - SIGNAL_FLOOR_DBM) / (SIGNAL_CEILING_DBM - SIGNAL_FLOOR_DBM)).clamp(0.0, 1.0)
}
