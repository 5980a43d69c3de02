pub mod alternative_route_provider;
pub mod error;
pub mod graphhopper_api;
pub mod osrm_api;
pub mod routing_provider;

pub use alternative_route_provider::{AlternativeRouteProvider, AlternativeRouteProviderParams};
pub use graphhopper_api::{GraphHopperRouteClient, GraphHopperRouteClientParams};
pub use osrm_api::{OsrmRouteClient, OsrmRouteClientParams};
pub use routing_provider::RoutingProvider;
