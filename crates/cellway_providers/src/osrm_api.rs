use std::time::Duration;

use cellway_core::{
    GeoPoint, RoutingError,
    route::{Maneuver, RouteAlternative, RouteAlternatives, RouteProvider, RouteStep, Waypoints},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{error::classify_transport_error, routing_provider::RoutingProvider};

pub const OSRM_PUBLIC_URL: &str = "http://router.project-osrm.org";
pub const OSRM_ROUTE_API_PATH: &str = "/route/v1/driving/";

const PROVIDER_NAME: &str = "OSRM";

#[derive(Deserialize)]
struct OsrmLineString {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    modifier: Option<String>,
    exit: Option<u32>,
}

#[derive(Deserialize)]
struct OsrmStep {
    #[serde(default)]
    name: String,
    distance: f64,
    duration: f64,
    geometry: OsrmLineString,
    maneuver: OsrmManeuver,
}

#[derive(Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmLineString,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Deserialize)]
struct OsrmWaypoint {
    location: [f64; 2],
}

#[derive(Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
    #[serde(default)]
    waypoints: Vec<OsrmWaypoint>,
}

#[derive(Debug, Clone)]
pub struct OsrmRouteClientParams {
    pub osrm_url: String,
    pub timeout: Duration,
}

impl Default for OsrmRouteClientParams {
    fn default() -> Self {
        OsrmRouteClientParams {
            osrm_url: OSRM_PUBLIC_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Single best route from an OSRM compatible server.
pub struct OsrmRouteClient {
    params: OsrmRouteClientParams,
    client: reqwest::Client,
}

impl OsrmRouteClient {
    pub fn new(params: OsrmRouteClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    fn route_url(&self, origin: &GeoPoint, destination: &GeoPoint) -> String {
        let mut url = self.params.osrm_url.trim_end_matches('/').to_string();
        url.push_str(OSRM_ROUTE_API_PATH);
        url.push_str(&format!(
            "{},{};{},{}",
            origin.lng, origin.lat, destination.lng, destination.lat
        ));
        url
    }
}

impl RoutingProvider for OsrmRouteClient {
    fn provider(&self) -> RouteProvider {
        RouteProvider::Osrm
    }

    async fn fetch_routes(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        _count: usize,
    ) -> Result<RouteAlternatives, RoutingError> {
        info!(
            "OsrmApi: requesting route from ({}, {}) to ({}, {})",
            origin.lat, origin.lng, destination.lat, destination.lng
        );

        let response = self
            .client
            .get(self.route_url(&origin, &destination))
            .query(&[
                ("overview", "full"),
                ("geometries", "geojson"),
                ("steps", "true"),
            ])
            .timeout(self.params.timeout)
            .send()
            .await
            .map_err(|error| classify_transport_error(PROVIDER_NAME, &error))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(RoutingError::ProviderError(format!(
                "OSRM unavailable ({})",
                status.as_u16()
            )));
        }

        // OSRM reports NoRoute / NoSegment with a 400 and a JSON body
        let body = response
            .text()
            .await
            .map_err(|error| classify_transport_error(PROVIDER_NAME, &error))?;
        let body: OsrmRouteResponse = serde_json::from_str(&body).map_err(|error| {
            RoutingError::ProviderError(format!("OSRM returned an unreadable response: {error}"))
        })?;

        parse_route_response(body, origin, destination)
    }
}

fn parse_route_response(
    response: OsrmRouteResponse,
    origin: GeoPoint,
    destination: GeoPoint,
) -> Result<RouteAlternatives, RoutingError> {
    let message = response.message.unwrap_or_default();
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" => return Err(RoutingError::NoRoute(message)),
        "NoSegment" => return Err(RoutingError::PointNotFound(message)),
        other => {
            warn!("OsrmApi: {} - {}", other, message);
            return Err(RoutingError::ProviderError(format!("OSRM {other}: {message}")));
        }
    }

    let waypoints = match response.waypoints.as_slice() {
        [first, .., last] => Waypoints {
            origin: GeoPoint::from(first.location),
            destination: GeoPoint::from(last.location),
        },
        _ => Waypoints {
            origin,
            destination,
        },
    };

    let routes: Vec<RouteAlternative> = response
        .routes
        .into_iter()
        .take(1)
        .map(|route| RouteAlternative {
            geometry: route
                .geometry
                .coordinates
                .into_iter()
                .map(GeoPoint::from)
                .collect(),
            distance: route.distance,
            duration: route.duration,
            steps: route
                .legs
                .into_iter()
                .flat_map(|leg| leg.steps)
                .map(|step| RouteStep {
                    name: step.name,
                    distance: step.distance,
                    duration: step.duration,
                    geometry: step.geometry.coordinates.into_iter().map(GeoPoint::from).collect(),
                    maneuver: Maneuver {
                        kind: step.maneuver.kind,
                        modifier: step.maneuver.modifier,
                        exit_number: step.maneuver.exit,
                        turn_angle: None,
                    },
                    instruction: None,
                })
                .collect(),
            provider: RouteProvider::Osrm,
            ascend: None,
            descend: None,
        })
        .collect();

    if routes.is_empty() {
        return Err(RoutingError::NoRoute("OSRM returned no route".to_string()));
    }

    info!("OsrmApi: received route of {:.0}m", routes[0].distance);

    Ok(RouteAlternatives { routes, waypoints })
}
