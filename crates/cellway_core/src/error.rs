use thiserror::Error;

/// Errors surfaced to callers of the route optimization engine.
///
/// Tower and road-network failures never show up here, they degrade to
/// synthetic data instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Could not find a road near the start or end point: {0}")]
    PointNotFound(String),

    #[error("No route found between the specified points: {0}")]
    NoRoute(String),

    #[error("Routing service timed out: {0}")]
    Timeout(String),

    #[error("Routing service configuration error: {0}")]
    ConfigError(String),

    #[error("Routing service error: {0}")]
    ProviderError(String),

    /// The road graph has no connection between the two nodes.
    #[error("No path between graph nodes {start} and {end}")]
    PathNotFound { start: usize, end: usize },

    #[error("Invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

impl RoutingError {
    /// Whether a secondary provider should be tried after this error.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            RoutingError::Timeout(_) | RoutingError::ProviderError(_)
        )
    }

    /// Errors the end user can fix by changing the request.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            RoutingError::PointNotFound(_)
                | RoutingError::NoRoute(_)
                | RoutingError::InvalidCoordinate { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            RoutingError::PointNotFound(_) => "PointNotFound",
            RoutingError::NoRoute(_) => "NoRoute",
            RoutingError::Timeout(_) => "Timeout",
            RoutingError::ConfigError(_) => "ConfigError",
            RoutingError::ProviderError(_) => "ProviderError",
            RoutingError::PathNotFound { .. } => "PathNotFound",
            RoutingError::InvalidCoordinate { .. } => "InvalidCoordinate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_eligibility() {
        assert!(RoutingError::Timeout(String::new()).is_fallback_eligible());
        assert!(RoutingError::ProviderError(String::new()).is_fallback_eligible());
        assert!(!RoutingError::ConfigError(String::new()).is_fallback_eligible());
        assert!(!RoutingError::PointNotFound(String::new()).is_fallback_eligible());
        assert!(!RoutingError::NoRoute(String::new()).is_fallback_eligible());
    }

    #[test]
    fn test_user_correctable() {
        assert!(RoutingError::NoRoute(String::new()).is_user_correctable());
        assert!(RoutingError::InvalidCoordinate { lat: 91.0, lng: 0.0 }.is_user_correctable());
        assert!(!RoutingError::Timeout(String::new()).is_user_correctable());
        assert!(!RoutingError::PathNotFound { start: 0, end: 1 }.is_user_correctable());
    }
}
