//! Atomic session counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;

/// Counters shared between the session and its observers.
///
/// All updates use relaxed ordering; counters are independent and only read
/// for display.
#[derive(Debug)]
pub struct SessionMetrics {
    started_at: Instant,
    fixes_received: AtomicU64,
    route_requests: AtomicU64,
    requests_coalesced: AtomicU64,
    routes_adopted: AtomicU64,
    routes_rejected: AtomicU64,
    routing_failures: AtomicU64,
    step_advances: AtomicU64,
    arrivals: AtomicU64,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    /// Create counters starting at zero.
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            fixes_received: AtomicU64::new(0),
            route_requests: AtomicU64::new(0),
            requests_coalesced: AtomicU64::new(0),
            routes_adopted: AtomicU64::new(0),
            routes_rejected: AtomicU64::new(0),
            routing_failures: AtomicU64::new(0),
            step_advances: AtomicU64::new(0),
            arrivals: AtomicU64::new(0),
        }
    }

    pub fn fix_received(&self) {
        self.fixes_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn route_requested(&self) {
        self.route_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// A signal was folded into a pending follow-up request.
    pub fn request_coalesced(&self) {
        self.requests_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn route_adopted(&self) {
        self.routes_adopted.fetch_add(1, Ordering::Relaxed);
    }

    /// A provider route failed validation.
    pub fn route_rejected(&self) {
        self.routes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// The provider failed or timed out.
    pub fn routing_failed(&self) {
        self.routing_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn step_advanced(&self) {
        self.step_advances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn arrived(&self) {
        self.arrivals.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime: self.started_at.elapsed(),
            fixes_received: self.fixes_received.load(Ordering::Relaxed),
            route_requests: self.route_requests.load(Ordering::Relaxed),
            requests_coalesced: self.requests_coalesced.load(Ordering::Relaxed),
            routes_adopted: self.routes_adopted.load(Ordering::Relaxed),
            routes_rejected: self.routes_rejected.load(Ordering::Relaxed),
            routing_failures: self.routing_failures.load(Ordering::Relaxed),
            step_advances: self.step_advances.load(Ordering::Relaxed),
            arrivals: self.arrivals.load(Ordering::Relaxed),
        }
    }
}
