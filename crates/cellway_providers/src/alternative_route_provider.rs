use cellway_core::{GeoPoint, RoutingError, route::RouteAlternatives};
use tracing::{error, info, warn};

use crate::routing_provider::RoutingProvider;

pub const MAX_ALTERNATIVES: usize = 10;
pub const LONG_ROUTE_THRESHOLD_METERS: f64 = 400_000.0;

#[derive(Debug, Clone)]
pub struct AlternativeRouteProviderParams {
    /// Great-circle distance above which the secondary provider is asked first.
    pub long_route_threshold: f64,
}

impl Default for AlternativeRouteProviderParams {
    fn default() -> Self {
        AlternativeRouteProviderParams {
            long_route_threshold: LONG_ROUTE_THRESHOLD_METERS,
        }
    }
}

/// Fetches route alternatives from a primary provider, falling back to a
/// secondary one on timeouts, transport failures and very long requests.
pub struct AlternativeRouteProvider<P, S> {
    primary: P,
    secondary: S,
    params: AlternativeRouteProviderParams,
}

impl<P, S> AlternativeRouteProvider<P, S>
where
    P: RoutingProvider,
    S: RoutingProvider,
{
    pub fn new(primary: P, secondary: S, params: AlternativeRouteProviderParams) -> Self {
        Self {
            primary,
            secondary,
            params,
        }
    }

    pub async fn get_alternatives(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        count: usize,
    ) -> Result<RouteAlternatives, RoutingError> {
        for point in [&origin, &destination] {
            if !point.is_valid() {
                return Err(RoutingError::InvalidCoordinate {
                    lat: point.lat,
                    lng: point.lng,
                });
            }
        }

        let count = count.clamp(1, MAX_ALTERNATIVES);
        let distance = origin.haversine_distance(&destination);

        if distance > self.params.long_route_threshold {
            info!(
                "AlternativeRouteProvider: {:.0}km request, asking {} first",
                distance / 1000.0,
                self.secondary.provider()
            );

            match self.secondary.fetch_routes(origin, destination, count).await {
                Ok(alternatives) => return Ok(alternatives),
                Err(err) => warn!(
                    "AlternativeRouteProvider: {} failed on long route: {}",
                    self.secondary.provider(),
                    err
                ),
            }

            return self
                .primary
                .fetch_routes(origin, destination, count)
                .await
                .inspect_err(|err| error!("AlternativeRouteProvider: {}", err));
        }

        let primary_error = match self.primary.fetch_routes(origin, destination, count).await {
            Ok(alternatives) => return Ok(alternatives),
            Err(err) => err,
        };

        if !primary_error.is_fallback_eligible() {
            error!(
                "AlternativeRouteProvider: {} failed: {}",
                self.primary.provider(),
                primary_error
            );
            return Err(primary_error);
        }

        warn!(
            "AlternativeRouteProvider: {} failed ({}), falling back to {}",
            self.primary.provider(),
            primary_error,
            self.secondary.provider()
        );

        match self.secondary.fetch_routes(origin, destination, count).await {
            Ok(alternatives) => Ok(alternatives),
            Err(err) => {
                error!(
                    "AlternativeRouteProvider: {} also failed: {}",
                    self.secondary.provider(),
                    err
                );
                Err(primary_error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use cellway_core::route::{RouteAlternative, RouteProvider, Waypoints};

    use super::*;

    struct FakeProvider {
        provider: RouteProvider,
        result: Result<(), RoutingError>,
        calls: AtomicUsize,
        requested: Mutex<Vec<usize>>,
    }

    impl FakeProvider {
        fn new(provider: RouteProvider, result: Result<(), RoutingError>) -> Self {
            FakeProvider {
                provider,
                result,
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RoutingProvider for FakeProvider {
        fn provider(&self) -> RouteProvider {
            self.provider
        }

        async fn fetch_routes(
            &self,
            origin: GeoPoint,
            destination: GeoPoint,
            count: usize,
        ) -> Result<RouteAlternatives, RoutingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(count);
            self.result.clone()?;

            Ok(RouteAlternatives {
                routes: vec![RouteAlternative::new(
                    vec![origin, destination],
                    origin.haversine_distance(&destination),
                    600.0,
                    self.provider,
                )],
                waypoints: Waypoints {
                    origin,
                    destination,
                },
            })
        }
    }

    fn provider(
        primary: Result<(), RoutingError>,
        secondary: Result<(), RoutingError>,
    ) -> AlternativeRouteProvider<FakeProvider, FakeProvider> {
        AlternativeRouteProvider::new(
            FakeProvider::new(RouteProvider::GraphHopper, primary),
            FakeProvider::new(RouteProvider::Osrm, secondary),
            AlternativeRouteProviderParams::default(),
        )
    }

    fn boston() -> (GeoPoint, GeoPoint) {
        (GeoPoint::new(42.30, -71.10), GeoPoint::new(42.36, -71.05))
    }

    #[tokio::test]
    async fn test_primary_success() {
        let provider = provider(Ok(()), Ok(()));
        let (origin, destination) = boston();

        let result = provider.get_alternatives(origin, destination, 3).await.unwrap();

        assert_eq!(result.routes[0].provider, RouteProvider::GraphHopper);
        assert_eq!(provider.secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_count_is_clamped() {
        let provider = provider(Ok(()), Ok(()));
        let (origin, destination) = boston();

        provider.get_alternatives(origin, destination, 0).await.unwrap();
        provider.get_alternatives(origin, destination, 50).await.unwrap();

        assert_eq!(*provider.primary.requested.lock().unwrap(), vec![1, 10]);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let provider = provider(Err(RoutingError::Timeout("slow".into())), Ok(()));
        let (origin, destination) = boston();

        let result = provider.get_alternatives(origin, destination, 3).await.unwrap();

        assert_eq!(result.routes[0].provider, RouteProvider::Osrm);
        assert_eq!(provider.secondary.calls(), 1);
    }

    #[tokio::test]
    async fn test_user_errors_do_not_fall_back() {
        for error in [
            RoutingError::PointNotFound("snap".into()),
            RoutingError::NoRoute("island".into()),
            RoutingError::ConfigError("key".into()),
        ] {
            let provider = provider(Err(error.clone()), Ok(()));
            let (origin, destination) = boston();

            let result = provider.get_alternatives(origin, destination, 3).await;

            assert_eq!(result.unwrap_err(), error);
            assert_eq!(provider.secondary.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_primary_error_surfaced_when_both_fail() {
        let provider = provider(
            Err(RoutingError::ProviderError("503".into())),
            Err(RoutingError::Timeout("osrm".into())),
        );
        let (origin, destination) = boston();

        let result = provider.get_alternatives(origin, destination, 3).await;

        assert_eq!(result.unwrap_err(), RoutingError::ProviderError("503".into()));
    }

    #[tokio::test]
    async fn test_long_route_prefers_secondary() {
        let provider = provider(Ok(()), Ok(()));
        let origin = GeoPoint::new(42.36, -71.05);
        let destination = GeoPoint::new(38.90, -77.04);

        let result = provider.get_alternatives(origin, destination, 3).await.unwrap();

        assert_eq!(result.routes[0].provider, RouteProvider::Osrm);
        assert_eq!(provider.primary.calls(), 0);
    }

    #[tokio::test]
    async fn test_long_route_uses_primary_when_secondary_fails() {
        let provider = provider(Ok(()), Err(RoutingError::Timeout("osrm".into())));
        let origin = GeoPoint::new(42.36, -71.05);
        let destination = GeoPoint::new(38.90, -77.04);

        let result = provider.get_alternatives(origin, destination, 3).await.unwrap();

        assert_eq!(result.routes[0].provider, RouteProvider::GraphHopper);
    }

    #[tokio::test]
    async fn test_invalid_coordinate() {
        let provider = provider(Ok(()), Ok(()));
        let result = provider
            .get_alternatives(GeoPoint::new(91.0, 0.0), GeoPoint::new(0.0, 0.0), 3)
            .await;

        assert!(matches!(result, Err(RoutingError::InvalidCoordinate { .. })));
        assert_eq!(provider.primary.calls(), 0);
    }
}
