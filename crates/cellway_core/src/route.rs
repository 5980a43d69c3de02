use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{bbox::BoundingBox, geopoint::GeoPoint};

/// Which engine produced a route alternative.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteProvider {
    GraphHopper,
    Osrm,
    SignalAwareGraph,
}

impl Display for RouteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RouteProvider::GraphHopper => "graphhopper",
                RouteProvider::Osrm => "osrm",
                RouteProvider::SignalAwareGraph => "signal_aware_graph",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Maneuver {
    /// Provider specific maneuver descriptor (GraphHopper sign, OSRM type).
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_angle: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub name: String,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    pub geometry: Vec<GeoPoint>,
    pub maneuver: Maneuver,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

/// A complete candidate path between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAlternative {
    pub geometry: Vec<GeoPoint>,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    pub steps: Vec<RouteStep>,
    pub provider: RouteProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descend: Option<f64>,
}

impl RouteAlternative {
    pub fn new(
        geometry: Vec<GeoPoint>,
        distance: f64,
        duration: f64,
        provider: RouteProvider,
    ) -> Self {
        RouteAlternative {
            geometry,
            distance,
            duration,
            steps: Vec::new(),
            provider,
            ascend: None,
            descend: None,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.geometry.iter())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoints {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

/// Candidate routes returned by a routing provider for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAlternatives {
    pub routes: Vec<RouteAlternative>,
    pub waypoints: Waypoints,
}
