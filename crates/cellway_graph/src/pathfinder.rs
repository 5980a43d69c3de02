//! Signal-aware shortest path search.
//!
//! Dijkstra with lazy deletion where the cost of relaxing `u -> v` is
//! `(1 - w) * length + w * (1 - normalized_signal(v)) * DISTANCE_SCALE`.
//! With `w = 0` this is a plain shortest distance search.

use std::{cmp::Ordering, collections::BinaryHeap};

use cellway_core::{
    GeoPoint, RoutingError, constants::normalize_signal, geometry::sample_indices,
    tower::CellTower,
};
use cellway_towers::coverage::{MAX_SIGNAL_SAMPLES, SignalStats, estimate_signal};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::road_graph::RoadGraph;

/// Makes the signal term commensurate with edge lengths in meters.
pub const DISTANCE_SCALE: f64 = 1000.0;

const INVALID_EDGE: usize = usize::MAX;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathfinderError {
    #[error("No path between nodes {start} and {end}")]
    NotFound { start: usize, end: usize },

    #[error("Node {0} is not part of the graph")]
    InvalidNode(usize),

    #[error("Got {actual} node signals for a graph of {expected} nodes")]
    SignalCountMismatch { expected: usize, actual: usize },
}

impl From<PathfinderError> for RoutingError {
    fn from(error: PathfinderError) -> Self {
        match error {
            PathfinderError::NotFound { start, end } => RoutingError::PathNotFound { start, end },
            PathfinderError::InvalidNode(node) => RoutingError::PathNotFound {
                start: node,
                end: node,
            },
            PathfinderError::SignalCountMismatch { expected, actual } => {
                RoutingError::ProviderError(format!(
                    "node signals do not match the road network ({actual} for {expected} nodes)"
                ))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStats {
    /// Meters
    pub distance: f64,
    /// Seconds
    pub duration: f64,
    pub signal: SignalStats,
    /// Average signal mapped onto [0, 1].
    pub signal_score: f64,
}

#[derive(Debug, Clone)]
pub struct PathResult {
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
    pub geometry: Vec<GeoPoint>,
    /// Accumulated search cost, not a physical quantity.
    pub cost: f64,
    pub stats: RouteStats,
}

#[derive(Copy, Clone, Debug)]
struct HeapItem {
    node_id: usize,
    cost: f64,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &HeapItem) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &HeapItem) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Flip cost to make this a min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

/// Estimated signal at every node of the graph.
pub fn node_signals(graph: &RoadGraph, towers: &[CellTower]) -> Vec<f64> {
    graph
        .nodes()
        .par_iter()
        .map(|node| estimate_signal(node, towers))
        .collect()
}

#[inline(always)]
pub fn edge_cost(length: f64, target_signal: f64, signal_weight: f64) -> f64 {
    (1.0 - signal_weight) * length
        + signal_weight * (1.0 - normalize_signal(target_signal)) * DISTANCE_SCALE
}

pub fn find_path(
    graph: &RoadGraph,
    start: usize,
    end: usize,
    towers: &[CellTower],
    signal_weight: f64,
) -> Result<PathResult, PathfinderError> {
    let signals = node_signals(graph, towers);
    find_path_with_signals(graph, start, end, &signals, signal_weight)
}

/// Same as [`find_path`] with node signals computed beforehand, `signals[i]`
/// being the signal at node `i`.
pub fn find_path_with_signals(
    graph: &RoadGraph,
    start: usize,
    end: usize,
    signals: &[f64],
    signal_weight: f64,
) -> Result<PathResult, PathfinderError> {
    for node in [start, end] {
        if node >= graph.node_count() {
            return Err(PathfinderError::InvalidNode(node));
        }
    }

    if signals.len() != graph.node_count() {
        return Err(PathfinderError::SignalCountMismatch {
            expected: graph.node_count(),
            actual: signals.len(),
        });
    }

    let signal_weight = signal_weight.clamp(0.0, 1.0);
    let node_count = graph.node_count();

    let mut costs = vec![f64::INFINITY; node_count];
    let mut settled = vec![false; node_count];
    let mut parent_edge = vec![INVALID_EDGE; node_count];
    let mut heap: BinaryHeap<HeapItem> = BinaryHeap::with_capacity(1024);

    costs[start] = 0.0;
    heap.push(HeapItem {
        node_id: start,
        cost: 0.0,
    });

    let mut settled_count = 0;

    while let Some(HeapItem { node_id, cost }) = heap.pop() {
        // Stale entry
        if settled[node_id] {
            continue;
        }
        settled[node_id] = true;
        settled_count += 1;

        if node_id == end {
            break;
        }

        for &edge_id in graph.outgoing_edges(node_id) {
            let edge = graph.edge(edge_id);
            if settled[edge.to] {
                continue;
            }

            let next_cost = cost + edge_cost(edge.length, signals[edge.to], signal_weight);
            if next_cost < costs[edge.to] {
                costs[edge.to] = next_cost;
                parent_edge[edge.to] = edge_id;
                heap.push(HeapItem {
                    node_id: edge.to,
                    cost: next_cost,
                });
            }
        }
    }

    if !settled[end] {
        info!(
            "Pathfinder: no path from {} to {} after settling {} nodes",
            start, end, settled_count
        );
        return Err(PathfinderError::NotFound { start, end });
    }

    debug!(
        "Pathfinder: settled {} of {} nodes, cost {:.1}",
        settled_count, node_count, costs[end]
    );

    Ok(build_path(graph, start, end, &parent_edge, signals, costs[end]))
}

fn build_path(
    graph: &RoadGraph,
    start: usize,
    end: usize,
    parent_edge: &[usize],
    signals: &[f64],
    cost: f64,
) -> PathResult {
    let mut edges = Vec::new();
    let mut node = end;
    while node != start {
        let edge_id = parent_edge[node];
        edges.push(edge_id);
        node = graph.edge(edge_id).from;
    }
    edges.reverse();

    let mut nodes = Vec::with_capacity(edges.len() + 1);
    nodes.push(start);

    let mut geometry = vec![*graph.node(start)];
    let mut distance = 0.0;
    let mut duration = 0.0;

    for &edge_id in &edges {
        let edge = graph.edge(edge_id);
        nodes.push(edge.to);
        geometry.extend(edge.geometry.iter().skip(1));
        distance += edge.length;
        duration += edge.travel_time();
    }

    let samples: Vec<f64> = sample_indices(nodes.len(), MAX_SIGNAL_SAMPLES)
        .map(|i| signals[nodes[i]])
        .collect();
    let signal = SignalStats::from_samples(&samples);

    PathResult {
        nodes,
        edges,
        geometry,
        cost,
        stats: RouteStats {
            distance,
            duration,
            signal_score: signal.signal_score(),
            signal,
        },
    }
}

#[cfg(test)]
mod tests {
    use cellway_core::{
        BoundingBox,
        tower::{RadioType, TowerSource},
    };
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{grid::synthetic_grid, road_graph::RoadGraphBuilder};

    fn tower(lat: f64, lng: f64, signal: f64, range: f64) -> CellTower {
        CellTower {
            id: None,
            position: GeoPoint::new(lat, lng),
            radio: RadioType::Lte,
            average_signal: signal,
            range,
            source: TowerSource::Mock,
            samples: None,
        }
    }

    /// Jittered lattice so edge lengths are all distinct.
    fn random_graph(seed: u64, size: usize) -> RoadGraph {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut builder = RoadGraphBuilder::new();
        for row in 0..size {
            for col in 0..size {
                builder.add_node(GeoPoint::new(
                    42.0 + row as f64 * 0.01 + rng.random_range(-0.003..0.003),
                    -71.0 + col as f64 * 0.01 + rng.random_range(-0.003..0.003),
                ));
            }
        }

        let id = |row: usize, col: usize| row * size + col;
        for row in 0..size {
            for col in 0..size {
                if col + 1 < size && rng.random_bool(0.85) {
                    builder.add_road(id(row, col), id(row, col + 1), 50.0, Vec::new(), false);
                }
                if row + 1 < size && rng.random_bool(0.85) {
                    builder.add_road(id(row, col), id(row + 1, col), 50.0, Vec::new(), false);
                }
            }
        }

        builder.build(BoundingBox::new(41.9, -71.1, 42.2, -70.8))
    }

    /// Quadratic Dijkstra on edge length only.
    fn reference_shortest_path(graph: &RoadGraph, start: usize, end: usize) -> Option<Vec<usize>> {
        let n = graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut done = vec![false; n];
        let mut parent = vec![usize::MAX; n];
        dist[start] = 0.0;

        loop {
            let current = (0..n)
                .filter(|&v| !done[v] && dist[v].is_finite())
                .min_by(|&a, &b| dist[a].total_cmp(&dist[b]))?;
            if current == end {
                break;
            }
            done[current] = true;

            for &edge_id in graph.outgoing_edges(current) {
                let edge = graph.edge(edge_id);
                if dist[current] + edge.length < dist[edge.to] {
                    dist[edge.to] = dist[current] + edge.length;
                    parent[edge.to] = current;
                }
            }
        }

        let mut path = vec![end];
        while *path.last()? != start {
            path.push(parent[*path.last()?]);
        }
        path.reverse();
        Some(path)
    }

    #[test]
    fn test_zero_signal_weight_matches_shortest_path() {
        let towers = vec![tower(42.05, -70.95, -60.0, 3000.0)];

        for seed in 0..5 {
            let graph = random_graph(seed, 10);
            let end = graph.node_count() - 1;

            let expected = reference_shortest_path(&graph, 0, end);
            let result = find_path(&graph, 0, end, &towers, 0.0);

            match (expected, result) {
                (Some(expected), Ok(result)) => {
                    assert_eq!(result.nodes, expected, "seed {seed}");
                    assert!((result.cost - result.stats.distance).abs() < 1e-6);
                }
                (None, Err(PathfinderError::NotFound { .. })) => {}
                (expected, result) => panic!("seed {seed}: {expected:?} vs {result:?}"),
            }
        }
    }

    fn detour_graph() -> RoadGraph {
        // a - b - c direct, a - d - c detour past a strong tower
        let mut builder = RoadGraphBuilder::new();
        let a = builder.add_node(GeoPoint::new(0.0, 0.0));
        let b = builder.add_node(GeoPoint::new(0.0, 0.01));
        let c = builder.add_node(GeoPoint::new(0.0, 0.02));
        let d = builder.add_node(GeoPoint::new(0.005, 0.01));
        builder.add_road(a, b, 50.0, Vec::new(), false);
        builder.add_road(b, c, 50.0, Vec::new(), false);
        builder.add_road(a, d, 50.0, Vec::new(), false);
        builder.add_road(d, c, 50.0, Vec::new(), false);
        builder.build(BoundingBox::new(-0.01, -0.01, 0.01, 0.03))
    }

    #[test]
    fn test_signal_weight_prefers_covered_nodes() {
        let graph = detour_graph();
        let towers = vec![tower(0.005, 0.01, -55.0, 300.0)];

        let fastest = find_path(&graph, 0, 2, &towers, 0.0).unwrap();
        assert_eq!(fastest.nodes, vec![0, 1, 2]);

        let covered = find_path(&graph, 0, 2, &towers, 1.0).unwrap();
        assert_eq!(covered.nodes, vec![0, 3, 2]);
        assert!(covered.stats.distance > fastest.stats.distance);
        assert!(covered.stats.signal.average_signal > fastest.stats.signal.average_signal);
    }

    #[test]
    fn test_route_stats() {
        let graph = detour_graph();
        let result = find_path(&graph, 0, 2, &[], 0.0).unwrap();

        assert_eq!(result.geometry.len(), 3);
        assert!((result.stats.duration - result.stats.distance / (50.0 / 3.6)).abs() < 1e-6);
        assert_eq!(result.stats.signal.average_signal, -100.0);
        assert_eq!(result.stats.signal.low_signal_fraction, 1.0);
        assert!((result.stats.signal_score - 20.0 / 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_disconnected_graph() {
        let mut builder = RoadGraphBuilder::new();
        let a = builder.add_node(GeoPoint::new(0.0, 0.0));
        let b = builder.add_node(GeoPoint::new(0.0, 0.01));
        let c = builder.add_node(GeoPoint::new(0.0, 0.02));
        builder.add_road(a, b, 50.0, Vec::new(), true);
        let graph = builder.build(BoundingBox::new(0.0, 0.0, 0.0, 0.02));

        assert_eq!(
            find_path(&graph, a, c, &[], 0.5).unwrap_err(),
            PathfinderError::NotFound { start: a, end: c }
        );
        // One-way edge cannot be used backwards
        assert!(find_path(&graph, b, a, &[], 0.0).is_err());
        assert_eq!(
            find_path(&graph, a, 10, &[], 0.0).unwrap_err(),
            PathfinderError::InvalidNode(10)
        );
    }

    #[test]
    fn test_start_equals_end() {
        let graph = detour_graph();
        let result = find_path(&graph, 1, 1, &[], 0.25).unwrap();

        assert_eq!(result.nodes, vec![1]);
        assert_eq!(result.stats.distance, 0.0);
    }

    #[test]
    fn test_grid_corner_to_corner() {
        let bbox = BoundingBox::new(42.3, -71.1, 42.36, -71.05);
        let grid = synthetic_grid(&bbox, 10, 10);

        let result = find_path(&grid, 0, 99, &[], 0.0).unwrap();

        // Manhattan path over the lattice
        assert_eq!(result.nodes.len(), 19);
        let expected = GeoPoint::new(42.3, -71.1).haversine_distance(&GeoPoint::new(42.36, -71.1))
            + GeoPoint::new(42.3, -71.1).haversine_distance(&GeoPoint::new(42.3, -71.05));
        assert!((result.stats.distance - expected).abs() < 10.0);
    }

    #[test]
    fn test_signal_count_must_match_graph() {
        let graph = detour_graph();

        let result = find_path_with_signals(&graph, 0, 2, &[-70.0], 0.5);

        assert_eq!(
            result.unwrap_err(),
            PathfinderError::SignalCountMismatch {
                expected: graph.node_count(),
                actual: 1,
            }
        );

        let signals = vec![-70.0; graph.node_count()];
        assert!(find_path_with_signals(&graph, 0, 2, &signals, 0.5).is_ok());
    }

    #[test]
    fn test_error_maps_to_path_not_found() {
        let error: RoutingError = PathfinderError::NotFound { start: 1, end: 2 }.into();
        assert_eq!(error, RoutingError::PathNotFound { start: 1, end: 2 });
        assert!(!error.is_fallback_eligible());
    }
}
