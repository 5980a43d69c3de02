pub mod config;
pub mod optimizer;
pub mod selection;

pub use config::{
    CellwayConfig, ConfigError, OptimizerParams, PathfinderWeights, RoutingMode, ScoringWeights,
};
pub use optimizer::{DefaultRouteOptimizer, OptimizedRoute, RouteMetadata, RouteOptimizer, RouteVariants};
pub use selection::{
    OptimizationType, OptimizedSelection, ScoredRoute, select_from_profiles, select_optimized,
};
