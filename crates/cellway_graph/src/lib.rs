pub mod grid;
pub mod network_cache;
pub mod network_source;
pub mod overpass;
pub mod pathfinder;
pub mod road_graph;
pub mod simplify;
pub mod speed;

pub use network_cache::{NetworkCacheParams, RoadNetworkCache};
pub use network_source::{NetworkSourceError, RoadNetworkSource};
pub use overpass::{OverpassNetworkSource, OverpassNetworkSourceParams};
pub use pathfinder::{PathResult, PathfinderError, RouteStats, find_path};
pub use road_graph::{GraphEdge, RoadGraph, RoadGraphBuilder};
