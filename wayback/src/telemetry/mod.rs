//! Session telemetry.
//!
//! Lock-free atomic counters updated by the navigation session, and
//! point-in-time snapshots for display.
//!
//! # Architecture
//!
//! ```text
//! NavigationSession ─────► SessionMetrics ─────► TelemetrySnapshot ─────► Views
//!                         (atomic counters)     (point-in-time copy)      (CLI, etc.)
//! ```
//!
//! # Example
//!
//! ```
//! use wayback::telemetry::SessionMetrics;
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(SessionMetrics::new());
//! metrics.fix_received();
//! metrics.route_requested();
//! metrics.route_adopted();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.fixes_received, 1);
//! assert_eq!(snapshot.routes_adopted, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::SessionMetrics;
pub use snapshot::TelemetrySnapshot;
