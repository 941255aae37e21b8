//! Wayback - step-level guidance back to a parked car.
//!
//! Turns a stream of location fixes into progress along a precomputed route
//! to a single destination, detects arrival, and decides when the route must
//! be recomputed.
//!
//! # Modules
//!
//! - [`geo`] - great-circle distances and polyline positioning
//! - [`route`] - validated routes and routing providers
//! - [`progress`] - the step-tracking state machine
//! - [`recalculation`] - when to request a new route, and in which mode
//! - [`session`] - orchestration and observable state
//! - [`location`] - fix sources (channel, track replay) and filtering
//! - [`config`] - thresholds, provider and logging settings
//! - [`telemetry`] - session counters

pub mod config;
pub mod geo;
pub mod location;
pub mod logging;
pub mod progress;
pub mod recalculation;
pub mod route;
pub mod session;
pub mod telemetry;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
