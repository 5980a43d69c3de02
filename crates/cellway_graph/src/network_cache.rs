use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use cellway_core::{BoundingBox, GeoPoint};
use fxhash::FxHashMap;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    grid::{GRID_SIZE, synthetic_grid},
    network_source::RoadNetworkSource,
    road_graph::RoadGraph,
};

/// Degrees always kept around the endpoints so they can snap to a road.
const MIN_CORRIDOR_BUFFER: f64 = 0.005;

#[derive(Debug, Clone)]
pub struct NetworkCacheParams {
    /// Maximum number of cached graphs.
    pub capacity: usize,
    pub base_timeout: Duration,
    /// Added to the timeout on every retry.
    pub timeout_increment: Duration,
    pub max_retries: usize,
    /// Span multiplier applied to the area on every retry.
    pub shrink_factor: f64,
    /// Areas above this many square degrees are narrowed before fetching.
    pub max_area: f64,
    /// Degrees kept around the route endpoints when narrowing.
    pub corridor_buffer: f64,
}

impl Default for NetworkCacheParams {
    fn default() -> Self {
        NetworkCacheParams {
            capacity: 32,
            base_timeout: Duration::from_secs(30),
            timeout_increment: Duration::from_secs(15),
            max_retries: 3,
            shrink_factor: 0.6,
            max_area: 0.1,
            corridor_buffer: 0.02,
        }
    }
}

/// Read-mostly LRU of road graphs keyed by quantized bounding box.
///
/// Concurrent misses on the same key wait on a per-key lock so only one of
/// them reaches the network source.
pub struct RoadNetworkCache<S> {
    source: S,
    params: NetworkCacheParams,
    graphs: Mutex<LruCache<String, Arc<RoadGraph>>>,
    in_flight: Mutex<FxHashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S> RoadNetworkCache<S>
where
    S: RoadNetworkSource,
{
    pub fn new(source: S, params: NetworkCacheParams) -> Self {
        let capacity = NonZeroUsize::new(params.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            params,
            graphs: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.graphs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.lock().is_empty()
    }

    /// Area actually fetched for `bbox`.
    ///
    /// Large areas are cut down to the corridor around `route`. The buffer
    /// around the endpoints shrinks to fit `max_area`, but the endpoints are
    /// always kept, so a long diagonal route may still exceed it. Without a
    /// route the area is scaled around its center until it fits.
    pub fn narrow(&self, bbox: &BoundingBox, route: Option<(GeoPoint, GeoPoint)>) -> BoundingBox {
        if bbox.area() <= self.params.max_area {
            return *bbox;
        }

        let narrowed = match route {
            Some((start, end)) => {
                let endpoints = BoundingBox::around(&start, &end);
                let buffer =
                    fitting_buffer(&endpoints, self.params.corridor_buffer, self.params.max_area);
                endpoints
                    .expand(buffer)
                    .intersection(bbox)
                    .unwrap_or(endpoints)
            }
            None => bbox.scale((self.params.max_area / bbox.area()).sqrt()),
        };

        if narrowed.area() > self.params.max_area + 1e-9 {
            warn!(
                "RoadNetworkCache: corridor {} ({:.3} sq deg) is above {} sq deg to keep both endpoints",
                narrowed,
                narrowed.area(),
                self.params.max_area
            );
        }

        info!(
            "RoadNetworkCache: narrowed {} ({:.3} sq deg) to {} ({:.3} sq deg)",
            bbox,
            bbox.area(),
            narrowed,
            narrowed.area()
        );

        narrowed
    }

    /// Road graph covering `bbox`. Never fails: when the source cannot answer,
    /// a degraded synthetic grid over `bbox` is returned and not cached.
    pub async fn get_graph(
        &self,
        bbox: &BoundingBox,
        route: Option<(GeoPoint, GeoPoint)>,
    ) -> Arc<RoadGraph> {
        let area = self.narrow(bbox, route);
        let key = area.cache_key();
        let endpoints = route.map(|(start, end)| BoundingBox::around(&start, &end));

        if let Some(graph) = self.cached(&key) {
            debug!("RoadNetworkCache: hit {}", key);
            return graph;
        }

        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;
        let _in_flight = InFlightEntry {
            in_flight: &self.in_flight,
            key: &key,
            lock: &lock,
        };

        // Another request may have filled the entry while we waited
        if let Some(graph) = self.cached(&key) {
            debug!("RoadNetworkCache: hit {} after wait", key);
            return graph;
        }

        match self.fetch_with_retries(&area, endpoints.as_ref()).await {
            Some(graph) => {
                let graph = Arc::new(graph);
                self.graphs.lock().put(key.clone(), graph.clone());
                graph
            }
            None => Arc::new(synthetic_grid(bbox, GRID_SIZE, GRID_SIZE)),
        }
    }

    fn cached(&self, key: &str) -> Option<Arc<RoadGraph>> {
        self.graphs.lock().get(key).cloned()
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Fetches `bbox`, shrinking it on every retryable failure. The shrunk
    /// area never drops `keep`.
    async fn fetch_with_retries(
        &self,
        bbox: &BoundingBox,
        keep: Option<&BoundingBox>,
    ) -> Option<RoadGraph> {
        let mut area = *bbox;
        let mut timeout = self.params.base_timeout;

        for attempt in 0..=self.params.max_retries {
            match self.source.fetch_network(&area, timeout).await {
                Ok(graph) if !graph.is_empty() => {
                    info!(
                        "RoadNetworkCache: fetched {} nodes, {} edges for {}",
                        graph.node_count(),
                        graph.edge_count(),
                        area
                    );
                    return Some(graph);
                }
                Ok(_) => {
                    warn!("RoadNetworkCache: empty road network for {}", area);
                    return None;
                }
                Err(error) if error.is_retryable() && attempt < self.params.max_retries => {
                    let shrunk = area.scale(self.params.shrink_factor);
                    area = keep
                        .and_then(|keep| shrunk.union(keep).intersection(&area))
                        .unwrap_or(shrunk);
                    timeout += self.params.timeout_increment;
                    warn!(
                        "RoadNetworkCache: {} (attempt {}/{}), retrying on {} with {:?}",
                        error,
                        attempt + 1,
                        self.params.max_retries + 1,
                        area,
                        timeout
                    );
                }
                Err(error) => {
                    warn!("RoadNetworkCache: giving up on {}: {}", area, error);
                    return None;
                }
            }
        }

        None
    }
}

/// Removes the per-key lock once the request holding it is done, including
/// when its future is dropped mid-fetch.
struct InFlightEntry<'a> {
    in_flight: &'a Mutex<FxHashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    key: &'a str,
    lock: &'a Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InFlightEntry<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        // A newer request may already own a fresh lock under the same key
        if in_flight
            .get(self.key)
            .is_some_and(|lock| Arc::ptr_eq(lock, self.lock))
        {
            in_flight.remove(self.key);
        }
    }
}

/// Largest buffer up to `buffer` keeping `endpoints` expanded by it under
/// `max_area`, floored at [`MIN_CORRIDOR_BUFFER`].
fn fitting_buffer(endpoints: &BoundingBox, buffer: f64, max_area: f64) -> f64 {
    // (lat + 2b) * (lng + 2b) = max_area
    let spans = endpoints.lat_span() + endpoints.lng_span();
    let excess = endpoints.area() - max_area;
    let discriminant = (spans * spans - 4.0 * excess).max(0.0);
    let fitted = (discriminant.sqrt() - spans) / 4.0;

    fitted.max(MIN_CORRIDOR_BUFFER).min(buffer)
}
