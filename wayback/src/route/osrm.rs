//! OSRM-compatible HTTP routing provider.
//!
//! Issues `GET {base}/route/v1/{profile}/{lon},{lat};{lon},{lat}` with
//! `steps=true&geometries=geojson&overview=full` and converts the first route
//! in the answer into a [`RawRoute`].

use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;

use super::model::{RawRoute, Step, TransportMode};
use super::requester::{RouteRequester, RoutingError};
use crate::geo::Coordinate;

/// Default HTTP timeout for a single route call.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Routing provider backed by an OSRM `route` service.
#[derive(Debug, Clone)]
pub struct OsrmRouteRequester {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmRouteRequester {
    /// Create a requester for the given service root, e.g.
    /// `https://router.example.org`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RoutingError> {
        Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a requester with a custom HTTP timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// OSRM profile name for a transport mode.
    pub fn profile(mode: TransportMode) -> &'static str {
        match mode {
            TransportMode::Walking => "foot",
            TransportMode::Automobile => "car",
        }
    }

    /// Build the request URL.
    pub fn route_url(&self, origin: Coordinate, destination: Coordinate, mode: TransportMode) -> String {
        // OSRM takes lon,lat order
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?steps=true&geometries=geojson&overview=full",
            self.base_url,
            Self::profile(mode),
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
        )
    }

    async fn fetch(&self, url: String) -> Result<RawRoute, RoutingError> {
        tracing::debug!(url = %url, "Requesting route");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RoutingError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RoutingError::Http(format!("Failed to read response: {}", e)))?;

        // OSRM reports query errors as 400 with a JSON body, so try the body first
        match parse_osrm_response(&body) {
            Err(RoutingError::InvalidResponse(_)) if !status.is_success() => {
                Err(RoutingError::Http(format!("HTTP {} from {}", status, url)))
            }
            other => other,
        }
    }
}

impl RouteRequester for OsrmRouteRequester {
    fn request_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TransportMode,
    ) -> BoxFuture<'_, Result<RawRoute, RoutingError>> {
        let url = self.route_url(origin, destination, mode);
        Box::pin(self.fetch(url))
    }

    fn name(&self) -> &'static str {
        "osrm"
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    #[serde(default)]
    name: String,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
}

/// Decode an OSRM `route` response body.
///
/// Steps of all legs are concatenated in order. Geometry is GeoJSON
/// `[lon, lat]` pairs.
pub fn parse_osrm_response(body: &str) -> Result<RawRoute, RoutingError> {
    let response: OsrmResponse =
        serde_json::from_str(body).map_err(|e| RoutingError::InvalidResponse(e.to_string()))?;

    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" => return Err(RoutingError::NoRoute),
        _ => {
            return Err(RoutingError::Provider {
                message: response.message.unwrap_or_else(|| response.code.clone()),
                code: response.code,
            })
        }
    }

    let route = response.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;

    let steps = route
        .legs
        .iter()
        .flat_map(|leg| leg.steps.iter())
        .map(|step| Step::new(instruction_text(step), step.distance))
        .collect();

    let polyline = route
        .geometry
        .coordinates
        .iter()
        .map(|[lon, lat]| Coordinate::new(*lat, *lon))
        .collect();

    Ok(RawRoute {
        steps,
        polyline,
        total_distance_meters: route.distance,
        total_duration_seconds: route.duration,
    })
}

fn instruction_text(step: &OsrmStep) -> String {
    let modifier = step.maneuver.modifier.as_deref().unwrap_or("straight");
    let action = match step.maneuver.kind.as_str() {
        "depart" => "Head out".to_string(),
        "arrive" => return "Arrive at your car".to_string(),
        "roundabout" | "rotary" => "Enter the roundabout".to_string(),
        "continue" | "new name" => "Continue".to_string(),
        _ => match modifier {
            "uturn" => "Make a U-turn".to_string(),
            "straight" => "Continue straight".to_string(),
            m => format!("Turn {}", m),
        },
    };

    if step.name.is_empty() {
        action
    } else {
        format!("{} onto {}", action, step.name)
    }
}
