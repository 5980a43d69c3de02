use cellway_core::{
    GeoPoint, RoutingError,
    route::{RouteAlternatives, RouteProvider},
};

/// A routing engine able to return candidate routes between two points.
pub trait RoutingProvider: Send + Sync {
    fn provider(&self) -> RouteProvider;

    /// Up to `count` alternatives, providers without alternative support return one.
    fn fetch_routes(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        count: usize,
    ) -> impl Future<Output = Result<RouteAlternatives, RoutingError>> + Send;
}
