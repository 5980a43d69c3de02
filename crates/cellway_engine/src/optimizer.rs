use std::sync::Arc;

use cellway_core::{
    BoundingBox, GeoPoint, RoutingError,
    route::{RouteAlternative, RouteProvider, Waypoints},
    tower::TowerSource,
};
use cellway_graph::{
    OverpassNetworkSource, RoadNetworkCache, RoadNetworkSource,
    pathfinder::{find_path_with_signals, node_signals},
};
use cellway_providers::{
    AlternativeRouteProvider, AlternativeRouteProviderParams, GraphHopperRouteClient,
    OsrmRouteClient, RoutingProvider,
};
use cellway_towers::{
    SignalStats, TowerOnRoute, TowerQuery, TowerStore, associate_towers,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    config::{CellwayConfig, OptimizerParams, RoutingMode},
    selection::{
        OptimizationType, OptimizedSelection, ScoredRoute, score_candidates, select_optimized,
    },
};

pub type DefaultRouteOptimizer =
    RouteOptimizer<GraphHopperRouteClient, OsrmRouteClient, OverpassNetworkSource>;

#[derive(Debug, Clone, Serialize)]
pub struct RouteMetadata {
    pub optimization_type: OptimizationType,
    /// Differs from `optimization_type` when the requested variant was
    /// unavailable and the fastest route was returned instead.
    pub selected_variant: OptimizationType,
    pub routing_mode: RoutingMode,
    pub tower_source: TowerSource,
    pub selected_index: usize,
    pub candidate_count: usize,
    pub norm_duration: f64,
    pub norm_signal: f64,
    pub balanced_score: f64,
    pub signal: SignalStats,
    pub tower_count: usize,
    pub waypoints: Waypoints,
    /// The route was searched on a synthetic grid.
    pub degraded_network: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizedRoute {
    pub route: RouteAlternative,
    pub towers: Vec<TowerOnRoute>,
    pub metadata: RouteMetadata,
}

/// Every variant computed for one request.
#[derive(Debug, Clone, Serialize)]
pub struct RouteVariants {
    pub selection: OptimizedSelection,
    pub waypoints: Waypoints,
    pub routing_mode: RoutingMode,
    pub tower_source: TowerSource,
    pub candidate_count: usize,
    pub degraded_network: bool,
}

impl RouteVariants {
    /// The requested variant, the fastest one when it is missing, `NoRoute` when
    /// there is no route at all.
    pub fn into_route(self, optimization: OptimizationType) -> Result<OptimizedRoute, RoutingError> {
        let Some((selected_variant, scored)) = self.selection.take(optimization) else {
            return Err(RoutingError::NoRoute(format!(
                "no {} route candidate available",
                optimization
            )));
        };

        if selected_variant != optimization {
            warn!(
                "RouteOptimizer: no {} route, returning the {} route",
                optimization, selected_variant
            );
        }

        let ScoredRoute {
            index,
            route,
            coverage,
            norm_duration,
            norm_signal,
            balanced_score,
        } = scored;

        Ok(OptimizedRoute {
            metadata: RouteMetadata {
                optimization_type: optimization,
                selected_variant,
                routing_mode: self.routing_mode,
                tower_source: self.tower_source,
                selected_index: index,
                candidate_count: self.candidate_count,
                norm_duration,
                norm_signal,
                balanced_score,
                signal: coverage.stats,
                tower_count: coverage.tower_count(),
                waypoints: self.waypoints,
                degraded_network: self.degraded_network,
            },
            route,
            towers: coverage.towers,
        })
    }
}

/// Entry point of the engine: fetches candidates, annotates them with cell
/// coverage and picks the route matching an optimization type.
pub struct RouteOptimizer<P, S, N> {
    alternatives: AlternativeRouteProvider<P, S>,
    tower_store: Arc<TowerStore>,
    network: RoadNetworkCache<N>,
    params: OptimizerParams,
}

impl DefaultRouteOptimizer {
    pub fn from_config(config: CellwayConfig) -> Self {
        RouteOptimizer::new(
            AlternativeRouteProvider::new(
                GraphHopperRouteClient::new(config.graphhopper),
                OsrmRouteClient::new(config.osrm),
                AlternativeRouteProviderParams {
                    long_route_threshold: config.long_route_threshold,
                },
            ),
            TowerStore::new(config.towers),
            RoadNetworkCache::new(
                OverpassNetworkSource::new(config.overpass),
                config.network_cache,
            ),
            config.optimizer,
        )
    }
}

impl<P, S, N> RouteOptimizer<P, S, N>
where
    P: RoutingProvider,
    S: RoutingProvider,
    N: RoadNetworkSource,
{
    pub fn new(
        alternatives: AlternativeRouteProvider<P, S>,
        tower_store: TowerStore,
        network: RoadNetworkCache<N>,
        params: OptimizerParams,
    ) -> Self {
        info!(
            "RouteOptimizer: routing mode {}, {} alternatives",
            params.routing_mode, params.max_alternatives
        );
        Self {
            alternatives,
            tower_store: Arc::new(tower_store),
            network,
            params,
        }
    }

    pub fn params(&self) -> &OptimizerParams {
        &self.params
    }

    pub fn network(&self) -> &RoadNetworkCache<N> {
        &self.network
    }

    pub async fn get_route_fastest(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<OptimizedRoute, RoutingError> {
        self.get_route(start, end, OptimizationType::Fastest).await
    }

    pub async fn get_route_cell_coverage(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<OptimizedRoute, RoutingError> {
        self.get_route(start, end, OptimizationType::CellCoverage)
            .await
    }

    pub async fn get_route_balanced(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<OptimizedRoute, RoutingError> {
        self.get_route(start, end, OptimizationType::Balanced).await
    }

    pub async fn get_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
        optimization: OptimizationType,
    ) -> Result<OptimizedRoute, RoutingError> {
        info!(
            "RouteOptimizer: {} route from {} to {}",
            optimization, start, end
        );

        self.compute_variants(start, end, &[optimization])
            .await?
            .into_route(optimization)
    }

    /// All three variants for the same request.
    pub async fn compare(&self, start: GeoPoint, end: GeoPoint) -> Result<RouteVariants, RoutingError> {
        self.compute_variants(start, end, &OptimizationType::ALL)
            .await
    }

    /// Towers inside `bbox`, read off the async runtime. Never fails.
    pub async fn get_towers(&self, bbox: &BoundingBox) -> TowerQuery {
        let store = Arc::clone(&self.tower_store);
        let area = *bbox;

        match tokio::task::spawn_blocking(move || store.get_towers(&area)).await {
            Ok(query) => query,
            Err(err) => {
                error!("RouteOptimizer: tower query failed: {}, using mock towers", err);
                TowerQuery::mock(bbox)
            }
        }
    }

    async fn compute_variants(
        &self,
        start: GeoPoint,
        end: GeoPoint,
        optimizations: &[OptimizationType],
    ) -> Result<RouteVariants, RoutingError> {
        for point in [&start, &end] {
            if !point.is_valid() {
                return Err(RoutingError::InvalidCoordinate {
                    lat: point.lat,
                    lng: point.lng,
                });
            }
        }

        match self.params.routing_mode {
            RoutingMode::ProviderAlternatives => self.provider_variants(start, end).await,
            RoutingMode::SignalAwareGraph => self.graph_variants(start, end, optimizations).await,
        }
    }

    async fn provider_variants(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RouteVariants, RoutingError> {
        let endpoints_area =
            BoundingBox::around(&start, &end).expand(self.params.tower_search_buffer);

        let (alternatives, prewarmed) = tokio::join!(
            self.alternatives
                .get_alternatives(start, end, self.params.max_alternatives),
            self.get_towers(&endpoints_area)
        );
        let alternatives = alternatives?;

        if alternatives.routes.is_empty() {
            return Err(RoutingError::NoRoute(
                "routing provider returned no route".to_string(),
            ));
        }

        info!(
            "RouteOptimizer: fetched {} alternatives from {}",
            alternatives.routes.len(),
            alternatives.routes[0].provider
        );

        let tower_area = alternatives
            .routes
            .iter()
            .filter_map(RouteAlternative::bbox)
            .fold(endpoints_area, |area, route_area| {
                area.union(&route_area.expand(self.params.route_tower_buffer))
            });

        let towers = if endpoints_area.contains(&tower_area) {
            prewarmed
        } else {
            info!(
                "RouteOptimizer: routes leave {}, querying towers in {}",
                endpoints_area, tower_area
            );
            self.get_towers(&tower_area).await
        };

        let candidate_count = alternatives.routes.len();
        let selection = select_optimized(
            alternatives.routes,
            &towers.towers,
            &self.params.scoring_weights,
            self.params.tower_proximity,
        );

        Ok(RouteVariants {
            selection,
            waypoints: alternatives.waypoints,
            routing_mode: RoutingMode::ProviderAlternatives,
            tower_source: towers.source,
            candidate_count,
            degraded_network: false,
        })
    }

    async fn graph_variants(
        &self,
        start: GeoPoint,
        end: GeoPoint,
        optimizations: &[OptimizationType],
    ) -> Result<RouteVariants, RoutingError> {
        let graph_area = BoundingBox::around(&start, &end).expand(self.params.graph_buffer);
        let tower_area = BoundingBox::around(&start, &end).expand(self.params.tower_search_buffer);

        let (graph, towers) = tokio::join!(
            self.network.get_graph(&graph_area, Some((start, end))),
            self.get_towers(&tower_area)
        );

        let (Some(start_node), Some(end_node)) = (graph.nearest_node(&start), graph.nearest_node(&end))
        else {
            return Err(RoutingError::PointNotFound(
                "road network has no node near the requested points".to_string(),
            ));
        };

        if graph.is_degraded() {
            warn!("RouteOptimizer: searching a degraded road network");
        }

        let signals = node_signals(&graph, &towers.towers);

        let mut candidates = Vec::with_capacity(optimizations.len());
        for &optimization in optimizations {
            let signal_weight = self.params.pathfinder_weights.signal_weight(optimization);
            let path = find_path_with_signals(&graph, start_node, end_node, &signals, signal_weight)?;

            info!(
                "RouteOptimizer: {} path with signal weight {}: {} nodes, {:.0}m, {:.0}s, signal score {:.2}",
                optimization,
                signal_weight,
                path.nodes.len(),
                path.stats.distance,
                path.stats.duration,
                path.stats.signal_score
            );

            let coverage =
                associate_towers(&path.geometry, &towers.towers, self.params.tower_proximity);
            let route = RouteAlternative::new(
                path.geometry,
                path.stats.distance,
                path.stats.duration,
                RouteProvider::SignalAwareGraph,
            );
            candidates.push((route, coverage));
        }

        let candidate_count = candidates.len();
        let mut selection = OptimizedSelection::default();
        for (optimization, scored) in optimizations
            .iter()
            .zip(score_candidates(candidates, &self.params.scoring_weights))
        {
            selection.set(*optimization, scored);
        }

        Ok(RouteVariants {
            selection,
            waypoints: Waypoints {
                origin: *graph.node(start_node),
                destination: *graph.node(end_node),
            },
            routing_mode: RoutingMode::SignalAwareGraph,
            tower_source: towers.source,
            candidate_count,
            degraded_network: graph.is_degraded(),
        })
    }
}
