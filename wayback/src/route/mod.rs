//! Routes and the providers that compute them.
//!
//! # Overview
//!
//! ```text
//! RouteRequester ──► RawRoute ──► Route::from_raw_route ──► Arc<Route>
//! (OSRM, static)     (unchecked)   (EmptyRoute on failure)    (shared, immutable)
//! ```
//!
//! # Example
//!
//! ```
//! use wayback::geo::Coordinate;
//! use wayback::route::{Route, Step};
//!
//! let route = Route::new(
//!     vec![Step::new("Walk east", 50.0)],
//!     vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.00045)],
//! )
//! .unwrap();
//!
//! assert_eq!(route.destination(), Coordinate::new(0.0, 0.00045));
//! ```

mod model;
mod osrm;
mod requester;

pub use model::{RawRoute, Route, RouteError, Step, TransportMode};
pub use osrm::{parse_osrm_response, OsrmRouteRequester, DEFAULT_HTTP_TIMEOUT};
pub use requester::{RouteRequest, RouteRequester, RoutingError, StaticRouteRequester};
