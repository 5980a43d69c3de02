use std::{fmt::Display, path::PathBuf};

use cellway_graph::{NetworkCacheParams, OverpassNetworkSourceParams};
use cellway_providers::{
    GraphHopperRouteClientParams, OsrmRouteClientParams,
    alternative_route_provider::LONG_ROUTE_THRESHOLD_METERS,
};
use cellway_towers::{TowerStoreParams, coverage::DEFAULT_MAX_TOWER_DISTANCE_METERS};
use serde::Serialize;
use thiserror::Error;

use crate::selection::OptimizationType;

pub const GRAPHHOPPER_API_KEY_ENV_VAR: &str = "GRAPHHOPPER_API_KEY";
pub const GRAPHHOPPER_URL_ENV_VAR: &str = "CELLWAY_GRAPHHOPPER_URL";
pub const OSRM_URL_ENV_VAR: &str = "CELLWAY_OSRM_URL";
pub const OVERPASS_URL_ENV_VAR: &str = "CELLWAY_OVERPASS_URL";
pub const TOWER_DATASET_ENV_VAR: &str = "CELLWAY_TOWER_DATASET";
pub const ROUTING_MODE_ENV_VAR: &str = "CELLWAY_ROUTING_MODE";
pub const GRAPH_CACHE_SIZE_ENV_VAR: &str = "CELLWAY_GRAPH_CACHE_SIZE";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid routing mode {0:?}, expected \"provider\" or \"graph\"")]
    InvalidRoutingMode(String),

    #[error("Invalid value {value:?} for {name}")]
    InvalidNumber { name: &'static str, value: String },
}

/// How routes are produced: re-ranking provider alternatives, or searching
/// the road network directly with signal-weighted edge costs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    #[default]
    ProviderAlternatives,
    SignalAwareGraph,
}

impl RoutingMode {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "provider" | "provider_alternatives" => Ok(RoutingMode::ProviderAlternatives),
            "graph" | "signal_aware_graph" => Ok(RoutingMode::SignalAwareGraph),
            _ => Err(ConfigError::InvalidRoutingMode(value.to_string())),
        }
    }
}

impl Display for RoutingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RoutingMode::ProviderAlternatives => "provider",
                RoutingMode::SignalAwareGraph => "graph",
            }
        )
    }
}

/// Weights of the balanced score.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScoringWeights {
    pub duration: f64,
    pub signal: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            duration: 0.5,
            signal: 0.5,
        }
    }
}

/// Signal weight handed to the pathfinder for each optimization type.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PathfinderWeights {
    pub fastest: f64,
    pub cell_coverage: f64,
    pub balanced: f64,
}

impl PathfinderWeights {
    pub fn signal_weight(&self, optimization: OptimizationType) -> f64 {
        match optimization {
            OptimizationType::Fastest => self.fastest,
            OptimizationType::CellCoverage => self.cell_coverage,
            OptimizationType::Balanced => self.balanced,
        }
    }
}

impl Default for PathfinderWeights {
    fn default() -> Self {
        PathfinderWeights {
            fastest: 0.0,
            cell_coverage: 1.0,
            balanced: 0.25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptimizerParams {
    pub routing_mode: RoutingMode,
    /// Alternatives requested from the routing provider.
    pub max_alternatives: usize,
    /// Meters between a tower and a route for the tower to count as on it.
    pub tower_proximity: f64,
    /// Degrees added around the endpoints for the first tower query.
    pub tower_search_buffer: f64,
    /// Degrees added around every candidate geometry when extending the tower area.
    pub route_tower_buffer: f64,
    /// Degrees added around the endpoints for the road network area.
    pub graph_buffer: f64,
    pub scoring_weights: ScoringWeights,
    pub pathfinder_weights: PathfinderWeights,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        OptimizerParams {
            routing_mode: RoutingMode::default(),
            max_alternatives: 5,
            tower_proximity: DEFAULT_MAX_TOWER_DISTANCE_METERS,
            tower_search_buffer: 0.1,
            route_tower_buffer: 0.05,
            graph_buffer: 0.02,
            scoring_weights: ScoringWeights::default(),
            pathfinder_weights: PathfinderWeights::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CellwayConfig {
    pub graphhopper: GraphHopperRouteClientParams,
    pub osrm: OsrmRouteClientParams,
    pub overpass: OverpassNetworkSourceParams,
    pub network_cache: NetworkCacheParams,
    pub towers: TowerStoreParams,
    /// Meters of great-circle distance above which OSRM is asked first.
    pub long_route_threshold: f64,
    pub optimizer: OptimizerParams,
}

impl Default for CellwayConfig {
    fn default() -> Self {
        CellwayConfig {
            graphhopper: GraphHopperRouteClientParams::default(),
            osrm: OsrmRouteClientParams::default(),
            overpass: OverpassNetworkSourceParams::default(),
            network_cache: NetworkCacheParams::default(),
            towers: TowerStoreParams::default(),
            long_route_threshold: LONG_ROUTE_THRESHOLD_METERS,
            optimizer: OptimizerParams::default(),
        }
    }
}

impl CellwayConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with the variables `lookup` knows about. Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = CellwayConfig::default();

        if let Some(api_key) = lookup(GRAPHHOPPER_API_KEY_ENV_VAR) {
            config.graphhopper.api_key = Some(api_key);
        }
        if let Some(url) = lookup(GRAPHHOPPER_URL_ENV_VAR) {
            config.graphhopper.url = url;
        }
        if let Some(url) = lookup(OSRM_URL_ENV_VAR) {
            config.osrm.osrm_url = url;
        }
        if let Some(url) = lookup(OVERPASS_URL_ENV_VAR) {
            config.overpass.url = url;
        }
        if let Some(path) = lookup(TOWER_DATASET_ENV_VAR) {
            config.towers.dataset_path = Some(PathBuf::from(path));
        }
        if let Some(mode) = lookup(ROUTING_MODE_ENV_VAR) {
            config.optimizer.routing_mode = RoutingMode::parse(&mode)?;
        }
        if let Some(size) = lookup(GRAPH_CACHE_SIZE_ENV_VAR) {
            config.network_cache.capacity = size
                .trim()
                .parse()
                .ok()
                .filter(|&capacity: &usize| capacity > 0)
                .ok_or_else(|| ConfigError::InvalidNumber {
                    name: GRAPH_CACHE_SIZE_ENV_VAR,
                    value: size.clone(),
                })?;
        }

        Ok(config)
    }
}
