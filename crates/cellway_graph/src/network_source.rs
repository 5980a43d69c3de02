use std::time::Duration;

use cellway_core::BoundingBox;
use thiserror::Error;

use crate::road_graph::RoadGraph;

#[derive(Debug, Error)]
pub enum NetworkSourceError {
    #[error("Road network request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Could not reach the road network source: {0}")]
    Connection(String),

    #[error("Road network source error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid road network response: {0}")]
    Parse(String),
}

impl NetworkSourceError {
    /// Timeouts and connection failures are retried on a smaller area.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkSourceError::Timeout(_) | NetworkSourceError::Connection(_) => true,
            // Overpass answers 429 / 504 when the query is too heavy for its slots
            NetworkSourceError::Api { status, .. } => matches!(status, 429 | 504),
            NetworkSourceError::Parse(_) => false,
        }
    }
}

/// Provides the drivable road network of an area.
pub trait RoadNetworkSource: Send + Sync {
    fn fetch_network(
        &self,
        bbox: &BoundingBox,
        timeout: Duration,
    ) -> impl Future<Output = Result<RoadGraph, NetworkSourceError>> + Send;
}
