use std::fmt::Display;

use geo::{Bearing, Distance, Haversine};
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// WGS84 coordinate in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    /// Builds a point, rejecting latitudes outside [-90, 90] and longitudes outside [-180, 180].
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, RoutingError> {
        let point = GeoPoint { lat, lng };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(RoutingError::InvalidCoordinate { lat, lng })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle distance in meters.
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        Haversine.distance(geo::Point::from(self), geo::Point::from(other))
    }

    /// Initial bearing towards `other`, in degrees.
    pub fn bearing(&self, other: &GeoPoint) -> f64 {
        Haversine.bearing(geo::Point::from(self), geo::Point::from(other))
    }
}

impl From<&GeoPoint> for geo::Point<f64> {
    fn from(point: &GeoPoint) -> Self {
        geo::Point::new(point.lng, point.lat)
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        geo::Point::new(point.lng, point.lat)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(point: geo::Point<f64>) -> Self {
        GeoPoint {
            lat: point.y(),
            lng: point.x(),
        }
    }
}

impl From<&GeoPoint> for [f64; 2] {
    fn from(point: &GeoPoint) -> Self {
        [point.lng, point.lat]
    }
}

/// GeoJSON ordering, `[lng, lat]`.
impl From<[f64; 2]> for GeoPoint {
    fn from(value: [f64; 2]) -> Self {
        GeoPoint {
            lat: value[1],
            lng: value[0],
        }
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}
