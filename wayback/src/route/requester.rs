//! Routing provider abstraction.
//!
//! Sessions depend on the [`RouteRequester`] trait rather than a concrete
//! provider, so the HTTP implementation, a fixed route loaded from disk, and
//! test doubles are interchangeable.

use std::path::Path;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;

use super::model::{RawRoute, TransportMode};
use crate::geo::Coordinate;

/// Errors reported by a routing provider.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    /// Transport-level failure (connection, TLS, HTTP status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with an error code.
    #[error("Provider error {code}: {message}")]
    Provider { code: String, message: String },

    /// The provider answered with something we could not decode.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The provider found no route between the endpoints.
    #[error("No route found")]
    NoRoute,

    /// The request did not complete within its deadline.
    #[error("Route request timed out after {0:?}")]
    Timeout(Duration),

    /// The request task died before producing an answer.
    #[error("Route request aborted: {0}")]
    Aborted(String),
}

impl RoutingError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            RoutingError::Http(_) | RoutingError::Timeout(_) => {
                "Could not reach the routing service. Check your connection and retry.".to_string()
            }
            RoutingError::NoRoute => "No route to your car could be found.".to_string(),
            RoutingError::Provider { message, .. } => {
                format!("The routing service reported an error: {}", message)
            }
            RoutingError::InvalidResponse(_) => {
                "The routing service returned an unreadable route.".to_string()
            }
            RoutingError::Aborted(_) => {
                "Route calculation stopped unexpectedly. Retry to try again.".to_string()
            }
        }
    }
}

/// One route request as seen by a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Where the user currently is.
    pub origin: Coordinate,
    /// Where the car is parked.
    pub destination: Coordinate,
    /// Travel mode selected for this request.
    pub mode: TransportMode,
}

/// Asynchronous origin → destination route provider.
///
/// # Implementors
///
/// - `OsrmRouteRequester` - OSRM-compatible HTTP service
/// - `StaticRouteRequester` - serves a fixed route (replays, tests)
pub trait RouteRequester: Send + Sync {
    /// Compute a route.
    ///
    /// The returned route is unvalidated; the session validates it before
    /// adopting it.
    fn request_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TransportMode,
    ) -> BoxFuture<'_, Result<RawRoute, RoutingError>>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Requester that answers every request with the same configured response.
///
/// Records each request so callers can inspect origins and modes.
#[derive(Debug)]
pub struct StaticRouteRequester {
    response: Mutex<Result<RawRoute, RoutingError>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RouteRequest>>,
}

impl StaticRouteRequester {
    /// Answer every request with `route`.
    pub fn new(route: RawRoute) -> Self {
        Self::with_response(Ok(route))
    }

    /// Fail every request with `error`.
    pub fn failing(error: RoutingError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<RawRoute, RoutingError>) -> Self {
        Self {
            response: Mutex::new(response),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Load the route to serve from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, super::RouteError> {
        Ok(Self::new(RawRoute::load(path)?))
    }

    /// Delay every answer, simulating provider latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the response served to subsequent requests.
    pub fn set_response(&self, response: Result<RawRoute, RoutingError>) {
        *self.response.lock() = response;
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl RouteRequester for StaticRouteRequester {
    fn request_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TransportMode,
    ) -> BoxFuture<'_, Result<RawRoute, RoutingError>> {
        self.requests.lock().push(RouteRequest {
            origin,
            destination,
            mode,
        });

        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let response = self.response.lock().clone();
            response
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Step;
    use std::sync::Arc;

    fn raw() -> RawRoute {
        RawRoute::new(
            vec![Step::new("Go", 10.0)],
            vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.0001)],
        )
    }

    #[tokio::test]
    async fn test_static_requester_serves_route_and_records_request() {
        let requester = StaticRouteRequester::new(raw());
        let origin = Coordinate::new(1.0, 1.0);
        let destination = Coordinate::new(2.0, 2.0);

        let route = requester
            .request_route(origin, destination, TransportMode::Walking)
            .await
            .unwrap();

        assert_eq!(route, raw());
        assert_eq!(
            requester.requests(),
            vec![RouteRequest {
                origin,
                destination,
                mode: TransportMode::Walking
            }]
        );
    }

    #[tokio::test]
    async fn test_static_requester_failure_and_swap() {
        let requester = StaticRouteRequester::failing(RoutingError::NoRoute);
        let c = Coordinate::new(0.0, 0.0);

        let err = requester
            .request_route(c, c, TransportMode::Automobile)
            .await
            .unwrap_err();
        assert_eq!(err, RoutingError::NoRoute);

        requester.set_response(Ok(raw()));
        assert!(requester
            .request_route(c, c, TransportMode::Automobile)
            .await
            .is_ok());
        assert_eq!(requester.request_count(), 2);
    }

    #[tokio::test]
    async fn test_trait_object_usage() {
        let requester: Arc<dyn RouteRequester> = Arc::new(StaticRouteRequester::new(raw()));
        let c = Coordinate::new(0.0, 0.0);
        assert!(requester
            .request_route(c, c, TransportMode::Walking)
            .await
            .is_ok());
        assert_eq!(requester.name(), "static");
    }

    #[test]
    fn test_user_messages_are_friendly() {
        assert!(RoutingError::Timeout(Duration::from_secs(5))
            .user_message()
            .contains("retry"));
        assert!(RoutingError::NoRoute.user_message().contains("No route"));
        let provider = RoutingError::Provider {
            code: "InvalidQuery".into(),
            message: "bad coordinates".into(),
        };
        assert!(provider.user_message().contains("bad coordinates"));
    }
}
