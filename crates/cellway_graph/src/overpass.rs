use std::time::Duration;

use cellway_core::{BoundingBox, GeoPoint};
use fxhash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    network_source::{NetworkSourceError, RoadNetworkSource},
    road_graph::{RoadGraph, RoadGraphBuilder},
    simplify::{SIMPLIFY_NODE_THRESHOLD, simplify},
    speed::{DRIVABLE_HIGHWAYS, Oneway, Tags, average_speed, is_drivable, oneway},
};

pub const OVERPASS_API_URL: &str = "https://overpass-api.de/api/interpreter";

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OsmElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        nodes: Vec<i64>,
        #[serde(default)]
        tags: Tags,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OsmElement>,
}

#[derive(Debug, Clone)]
pub struct OverpassNetworkSourceParams {
    pub url: String,
}

impl Default for OverpassNetworkSourceParams {
    fn default() -> Self {
        OverpassNetworkSourceParams {
            url: OVERPASS_API_URL.to_string(),
        }
    }
}

/// Drivable OpenStreetMap ways fetched from an Overpass API endpoint.
pub struct OverpassNetworkSource {
    params: OverpassNetworkSourceParams,
    client: reqwest::Client,
}

impl OverpassNetworkSource {
    pub fn new(params: OverpassNetworkSourceParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }
}

fn overpass_query(bbox: &BoundingBox, timeout: Duration) -> String {
    format!(
        "[out:json][timeout:{}];way[\"highway\"~\"^({})$\"]({},{},{},{});(._;>;);out body;",
        timeout.as_secs().max(1),
        DRIVABLE_HIGHWAYS.join("|"),
        bbox.min_lat,
        bbox.min_lng,
        bbox.max_lat,
        bbox.max_lng
    )
}

fn request_error(error: reqwest::Error, timeout: Duration) -> NetworkSourceError {
    if error.is_timeout() {
        NetworkSourceError::Timeout(timeout)
    } else if let Some(status) = error.status() {
        NetworkSourceError::Api {
            status: status.as_u16(),
            message: error.to_string(),
        }
    } else if error.is_decode() || error.is_body() {
        NetworkSourceError::Parse(error.to_string())
    } else {
        NetworkSourceError::Connection(error.to_string())
    }
}

impl RoadNetworkSource for OverpassNetworkSource {
    async fn fetch_network(
        &self,
        bbox: &BoundingBox,
        timeout: Duration,
    ) -> Result<RoadGraph, NetworkSourceError> {
        info!("Overpass: fetching road network in {} (timeout {:?})", bbox, timeout);

        let response = self
            .client
            .post(&self.params.url)
            .form(&[("data", overpass_query(bbox, timeout))])
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| request_error(error, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkSourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: OverpassResponse = response
            .json()
            .await
            .map_err(|error| request_error(error, timeout))?;

        Ok(build_graph(body, *bbox))
    }
}

fn build_graph(response: OverpassResponse, bbox: BoundingBox) -> RoadGraph {
    let mut positions: FxHashMap<i64, GeoPoint> = FxHashMap::default();
    let mut ways = Vec::new();

    for element in response.elements {
        match element {
            OsmElement::Node { id, lat, lon } => {
                positions.insert(id, GeoPoint::new(lat, lon));
            }
            OsmElement::Way { nodes, tags } if is_drivable(&tags) => ways.push((nodes, tags)),
            _ => {}
        }
    }

    let mut builder = RoadGraphBuilder::new();
    let mut node_ids: FxHashMap<i64, usize> = FxHashMap::default();
    let mut missing_nodes = 0;

    for (nodes, tags) in &ways {
        let speed = average_speed(tags);
        let direction = oneway(tags);

        for pair in nodes.windows(2) {
            let (Some(from), Some(to)) = (positions.get(&pair[0]), positions.get(&pair[1])) else {
                missing_nodes += 1;
                continue;
            };

            let from = *node_ids
                .entry(pair[0])
                .or_insert_with(|| builder.add_node(*from));
            let to = *node_ids
                .entry(pair[1])
                .or_insert_with(|| builder.add_node(*to));

            if from == to {
                continue;
            }

            match direction {
                Oneway::No => builder.add_road(from, to, speed, Vec::new(), false),
                Oneway::Forward => builder.add_road(from, to, speed, Vec::new(), true),
                Oneway::Backward => builder.add_road(to, from, speed, Vec::new(), true),
            }
        }
    }

    if missing_nodes > 0 {
        warn!("Overpass: {} way segments reference unknown nodes", missing_nodes);
    }

    let graph = builder.build(bbox);
    debug!(
        "Overpass: {} ways, {} nodes, {} edges",
        ways.len(),
        graph.node_count(),
        graph.edge_count()
    );

    if graph.node_count() > SIMPLIFY_NODE_THRESHOLD {
        simplify(graph)
    } else {
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 42.300, "lon": -71.100},
            {"type": "node", "id": 2, "lat": 42.300, "lon": -71.090},
            {"type": "node", "id": 3, "lat": 42.310, "lon": -71.090},
            {"type": "node", "id": 4, "lat": 42.310, "lon": -71.080},
            {"type": "node", "id": 5, "lat": 42.320, "lon": -71.080},
            {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"highway": "residential", "name": "Elm Street"}},
            {"type": "way", "id": 11, "nodes": [3, 4], "tags": {"highway": "primary", "oneway": "-1", "maxspeed": "30 mph"}},
            {"type": "way", "id": 12, "nodes": [4, 5], "tags": {"highway": "footway"}},
            {"type": "way", "id": 13, "nodes": [4, 99], "tags": {"highway": "service"}},
            {"type": "relation", "id": 20, "members": []}
        ]
    }"#;

    #[test]
    fn test_build_graph_from_overpass() {
        let response: OverpassResponse = serde_json::from_str(RESPONSE).unwrap();
        let graph = build_graph(response, BoundingBox::new(42.29, -71.11, 42.33, -71.07));

        // Node 5 is only used by a footway, node 99 is unknown
        assert_eq!(graph.node_count(), 4);
        // Two two-way segments and one reversed one-way segment
        assert_eq!(graph.edge_count(), 5);

        let oneway_edge = graph
            .edges()
            .iter()
            .find(|edge| edge.speed_kmh > 40.0)
            .unwrap();
        assert_eq!(*graph.node(oneway_edge.from), GeoPoint::new(42.31, -71.08));
        assert_eq!(*graph.node(oneway_edge.to), GeoPoint::new(42.31, -71.09));
        assert!(!graph.is_degraded());
    }

    #[test]
    fn test_query_shape() {
        let query = overpass_query(
            &BoundingBox::new(42.3, -71.1, 42.36, -71.05),
            Duration::from_secs(45),
        );

        assert!(query.starts_with("[out:json][timeout:45];"));
        assert!(query.contains("(42.3,-71.1,42.36,-71.05)"));
        assert!(query.contains("motorway|motorway_link"));
        assert!(query.ends_with("out body;"));
    }

    #[test]
    fn test_request_error_retryability() {
        assert!(NetworkSourceError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(NetworkSourceError::Connection("reset".into()).is_retryable());
        assert!(
            NetworkSourceError::Api {
                status: 504,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!NetworkSourceError::Parse("eof".into()).is_retryable());
    }
}
