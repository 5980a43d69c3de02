//! Contraction of interstitial nodes.
//!
//! A node is interstitial when exactly one road passes through it: either a
//! single incoming and a single outgoing edge to two different neighbours, or
//! a two-way road where both neighbours are reachable in both directions.
//! Chains of such nodes are merged into single edges that keep the full
//! geometry, the summed length and the summed travel time.

use cellway_core::GeoPoint;
use fxhash::FxHashSet;
use tracing::info;

use crate::road_graph::{GraphEdge, RoadGraph};

pub const SIMPLIFY_NODE_THRESHOLD: usize = 5_000;

fn interstitial_nodes(graph: &RoadGraph) -> Vec<bool> {
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); graph.node_count()];
    for edge in graph.edges() {
        incoming[edge.to].push(edge.from);
    }

    (0..graph.node_count())
        .map(|node| {
            let outgoing: Vec<usize> = graph
                .outgoing_edges(node)
                .iter()
                .map(|&edge_id| graph.edge(edge_id).to)
                .collect();
            let incoming = &incoming[node];

            match (outgoing.as_slice(), incoming.as_slice()) {
                ([to], [from]) => to != from && *to != node && *from != node,
                ([a, b], [c, d]) => {
                    a != b
                        && *a != node
                        && *b != node
                        && FxHashSet::from_iter([*a, *b]) == FxHashSet::from_iter([*c, *d])
                }
                _ => false,
            }
        })
        .collect()
}

/// Merges chains of interstitial nodes. Returns the graph unchanged when
/// nothing can be contracted.
pub fn simplify(graph: RoadGraph) -> RoadGraph {
    let interstitial = interstitial_nodes(&graph);
    let contracted = interstitial.iter().filter(|&&i| i).count();
    if contracted == 0 {
        return graph;
    }

    let mut new_ids = vec![usize::MAX; graph.node_count()];
    let mut nodes = Vec::with_capacity(graph.node_count() - contracted);
    for (node, point) in graph.nodes().iter().enumerate() {
        if !interstitial[node] {
            new_ids[node] = nodes.len();
            nodes.push(*point);
        }
    }

    let mut edges = Vec::new();
    for start_edge in graph.edges() {
        if interstitial[start_edge.from] {
            continue;
        }

        let mut geometry: Vec<GeoPoint> = start_edge.geometry.clone();
        let mut length = start_edge.length;
        let mut time = start_edge.travel_time();
        let mut previous = start_edge.from;
        let mut current = start_edge.to;
        let mut steps = 0;

        while interstitial[current] && steps < graph.node_count() {
            let Some(next) = graph
                .outgoing_edges(current)
                .iter()
                .map(|&edge_id| graph.edge(edge_id))
                .find(|edge| edge.to != previous)
            else {
                break;
            };

            geometry.extend(next.geometry.iter().skip(1));
            length += next.length;
            time += next.travel_time();
            previous = current;
            current = next.to;
            steps += 1;
        }

        // Loop made only of interstitial nodes
        if interstitial[current] {
            continue;
        }

        let speed_kmh = if time > 0.0 {
            length / time * 3.6
        } else {
            start_edge.speed_kmh
        };

        edges.push(GraphEdge {
            from: new_ids[start_edge.from],
            to: new_ids[current],
            length,
            speed_kmh,
            geometry,
        });
    }

    info!(
        "Simplify: contracted {} interstitial nodes, {} -> {} edges",
        contracted,
        graph.edge_count(),
        edges.len()
    );

    let bbox = *graph.bbox();
    let simplified = RoadGraph::new(nodes, edges, bbox);
    if graph.is_degraded() {
        simplified.into_degraded()
    } else {
        simplified
    }
}
