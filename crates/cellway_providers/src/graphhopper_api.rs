use std::time::Duration;

use cellway_core::{
    GeoPoint, RoutingError,
    route::{Maneuver, RouteAlternative, RouteAlternatives, RouteProvider, RouteStep, Waypoints},
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    error::{classify_http_status, classify_message, classify_transport_error, error_message},
    routing_provider::RoutingProvider,
};

pub const GRAPHHOPPER_ROUTE_API_URL: &str = "https://graphhopper.com/api/1/route";
pub const GRAPHHOPPER_MAX_PATHS: usize = 10;

const PROVIDER_NAME: &str = "GraphHopper";
const DETAILS: [&str; 5] = ["street_name", "time", "distance", "max_speed", "road_class"];

type GHPoint = [f64; 2];

#[derive(Deserialize)]
struct GHLineString {
    coordinates: Vec<GHPoint>,
}

#[derive(Deserialize)]
struct GHInstruction {
    #[serde(default)]
    distance: f64,
    /// Milliseconds
    #[serde(default)]
    time: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    street_name: String,
    #[serde(default)]
    sign: i32,
    #[serde(default)]
    interval: Vec<usize>,
    exit_number: Option<u32>,
    turn_angle: Option<f64>,
}

#[derive(Deserialize)]
struct GHPath {
    #[serde(default)]
    distance: f64,
    /// Milliseconds
    #[serde(default)]
    time: f64,
    points: Option<GHLineString>,
    #[serde(default)]
    instructions: Vec<GHInstruction>,
    ascend: Option<f64>,
    descend: Option<f64>,
    snapped_waypoints: Option<GHLineString>,
}

#[derive(Deserialize)]
struct GHRouteResponse {
    #[serde(default)]
    paths: Vec<GHPath>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GraphHopperRouteClientParams {
    /// Requests fail with a configuration error when absent.
    pub api_key: Option<String>,
    pub url: String,
    pub timeout: Duration,
    pub profile: String,
    pub max_weight_factor: f64,
    pub max_share_factor: f64,
}

impl Default for GraphHopperRouteClientParams {
    fn default() -> Self {
        GraphHopperRouteClientParams {
            api_key: None,
            url: GRAPHHOPPER_ROUTE_API_URL.to_string(),
            timeout: Duration::from_secs(20),
            profile: "car".to_string(),
            max_weight_factor: 1.8,
            max_share_factor: 0.8,
        }
    }
}

pub struct GraphHopperRouteClient {
    params: GraphHopperRouteClientParams,
    client: reqwest::Client,
}

impl GraphHopperRouteClient {
    pub fn new(params: GraphHopperRouteClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    fn query(
        &self,
        api_key: &str,
        origin: &GeoPoint,
        destination: &GeoPoint,
        count: usize,
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("point", format!("{},{}", origin.lat, origin.lng)),
            ("point", format!("{},{}", destination.lat, destination.lng)),
            ("profile", self.params.profile.clone()),
            ("algorithm", "alternative_route".to_string()),
            ("alternative_route.max_paths", count.to_string()),
            (
                "alternative_route.max_weight_factor",
                self.params.max_weight_factor.to_string(),
            ),
            (
                "alternative_route.max_share_factor",
                self.params.max_share_factor.to_string(),
            ),
            ("instructions", "true".to_string()),
            ("calc_points", "true".to_string()),
            ("points_encoded", "false".to_string()),
            ("locale", "en".to_string()),
            ("key", api_key.to_string()),
        ];
        query.extend(DETAILS.iter().map(|detail| ("details", detail.to_string())));
        query
    }
}

impl RoutingProvider for GraphHopperRouteClient {
    fn provider(&self) -> RouteProvider {
        RouteProvider::GraphHopper
    }

    async fn fetch_routes(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        count: usize,
    ) -> Result<RouteAlternatives, RoutingError> {
        let Some(api_key) = self.params.api_key.as_deref() else {
            return Err(RoutingError::ConfigError(
                "GraphHopper API key is missing".to_string(),
            ));
        };

        let count = count.clamp(1, GRAPHHOPPER_MAX_PATHS);
        info!(
            "GraphHopperApi: requesting {} alternatives from ({}, {}) to ({}, {})",
            count, origin.lat, origin.lng, destination.lat, destination.lng
        );

        let response = self
            .client
            .get(&self.params.url)
            .query(&self.query(api_key, &origin, &destination, count))
            .timeout(self.params.timeout)
            .send()
            .await
            .map_err(|error| classify_transport_error(PROVIDER_NAME, &error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!("GraphHopperApi: {} - {}", status.as_u16(), message);
            return Err(classify_http_status(PROVIDER_NAME, status.as_u16(), &message));
        }

        let body: GHRouteResponse = response
            .json()
            .await
            .map_err(|error| classify_transport_error(PROVIDER_NAME, &error))?;

        parse_route_response(body, origin, destination)
    }
}

fn parse_route_response(
    response: GHRouteResponse,
    origin: GeoPoint,
    destination: GeoPoint,
) -> Result<RouteAlternatives, RoutingError> {
    if response.paths.is_empty() {
        let message = response.message.unwrap_or_default();
        warn!("GraphHopperApi: no paths returned: {}", message);
        return Err(classify_message(&message).unwrap_or(RoutingError::NoRoute(message)));
    }

    let waypoints = response
        .paths
        .first()
        .and_then(|path| path.snapped_waypoints.as_ref())
        .and_then(|snapped| match snapped.coordinates.as_slice() {
            [first, .., last] => Some(Waypoints {
                origin: GeoPoint::from(*first),
                destination: GeoPoint::from(*last),
            }),
            _ => None,
        })
        .unwrap_or(Waypoints {
            origin,
            destination,
        });

    let routes: Vec<RouteAlternative> = response.paths.into_iter().filter_map(parse_path).collect();

    if routes.is_empty() {
        return Err(RoutingError::ProviderError(
            "GraphHopper returned paths without geometry".to_string(),
        ));
    }

    info!("GraphHopperApi: received {} alternative paths", routes.len());

    Ok(RouteAlternatives { routes, waypoints })
}

fn parse_path(path: GHPath) -> Option<RouteAlternative> {
    let Some(points) = path.points else {
        warn!("GraphHopperApi: path is missing its points");
        return None;
    };

    let geometry: Vec<GeoPoint> = points.coordinates.into_iter().map(GeoPoint::from).collect();

    let steps = path
        .instructions
        .into_iter()
        .map(|instruction| parse_instruction(instruction, &geometry))
        .collect();

    debug!(
        "GraphHopperApi: path {:.0}m, {:.0}s, {} points",
        path.distance,
        path.time / 1000.0,
        geometry.len()
    );

    Some(RouteAlternative {
        geometry,
        distance: path.distance,
        duration: path.time / 1000.0,
        steps,
        provider: RouteProvider::GraphHopper,
        ascend: path.ascend,
        descend: path.descend,
    })
}

fn parse_instruction(instruction: GHInstruction, geometry: &[GeoPoint]) -> RouteStep {
    RouteStep {
        name: instruction.street_name,
        distance: instruction.distance,
        duration: instruction.time / 1000.0,
        geometry: interval_geometry(&instruction.interval, geometry),
        maneuver: Maneuver {
            kind: instruction.sign.to_string(),
            modifier: None,
            exit_number: instruction.exit_number,
            turn_angle: instruction.turn_angle,
        },
        instruction: (!instruction.text.is_empty()).then_some(instruction.text),
    }
}

/// Slice of the path covered by an inclusive `[start, end]` point interval.
fn interval_geometry(interval: &[usize], geometry: &[GeoPoint]) -> Vec<GeoPoint> {
    let [start, end] = interval else {
        return Vec::new();
    };

    let start = (*start).min(geometry.len());
    let end = end.saturating_add(1).min(geometry.len());

    if start >= end {
        return Vec::new();
    }

    geometry[start..end].to_vec()
}
