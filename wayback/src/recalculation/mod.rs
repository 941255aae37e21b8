//! Route recomputation policy.
//!
//! Decides from accumulated movement when a fresh route must be requested,
//! and which transport mode to request it with.
//!
//! The policy remembers the coordinate of the last route request. The first
//! fix of an episode always requests an initial route; after that a new route
//! is requested only once the user has moved more than the update threshold
//! away from that coordinate. Distance is measured from the last *request*
//! rather than the last fix, so slow drift accumulates until it crosses the
//! threshold.

use std::fmt;

use crate::config::NavigationConfig;
use crate::geo::{distance_meters, Coordinate};
use crate::location::LocationFix;
use crate::route::TransportMode;

/// Why a route request should be issued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecalculationSignal {
    /// No route has been requested yet.
    RequestInitialRoute { origin: Coordinate },
    /// The user moved far enough that the route is stale.
    Recompute { origin: Coordinate },
}

impl RecalculationSignal {
    /// Origin for the request.
    pub fn origin(&self) -> Coordinate {
        match self {
            RecalculationSignal::RequestInitialRoute { origin }
            | RecalculationSignal::Recompute { origin } => *origin,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RecalculationSignal::RequestInitialRoute { .. } => "initial",
            RecalculationSignal::Recompute { .. } => "recompute",
        }
    }
}

impl fmt::Display for RecalculationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.kind(), self.origin())
    }
}

/// Movement-based recomputation trigger.
#[derive(Debug, Clone)]
pub struct RecalculationPolicy {
    route_update_threshold_m: f64,
    last_route_request_coordinate: Option<Coordinate>,
}

impl RecalculationPolicy {
    /// Create a policy that recomputes after `route_update_threshold_m` meters.
    pub fn new(route_update_threshold_m: f64) -> Self {
        Self {
            route_update_threshold_m,
            last_route_request_coordinate: None,
        }
    }

    /// Create a policy from config.
    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(config.route_update_threshold_m)
    }

    /// Evaluate a fix.
    pub fn on_location_fix(&mut self, fix: &LocationFix) -> Option<RecalculationSignal> {
        let origin = fix.coordinate;

        let Some(last) = self.last_route_request_coordinate else {
            self.last_route_request_coordinate = Some(origin);
            return Some(RecalculationSignal::RequestInitialRoute { origin });
        };

        let moved = distance_meters(&origin, &last);
        if moved > self.route_update_threshold_m {
            tracing::debug!(
                moved_m = format!("{:.1}", moved),
                threshold_m = self.route_update_threshold_m,
                "Moved past route update threshold"
            );
            self.last_route_request_coordinate = Some(origin);
            return Some(RecalculationSignal::Recompute { origin });
        }

        None
    }

    /// Record a route request made outside the fix stream.
    pub fn mark_requested(&mut self, origin: Coordinate) {
        self.last_route_request_coordinate = Some(origin);
    }

    /// Forget the last request, so the next fix requests an initial route.
    pub fn reset(&mut self) {
        self.last_route_request_coordinate = None;
    }

    /// Coordinate of the last route request, if any.
    pub fn last_request_coordinate(&self) -> Option<Coordinate> {
        self.last_route_request_coordinate
    }

    /// Configured update threshold in meters.
    pub fn route_update_threshold_m(&self) -> f64 {
        self.route_update_threshold_m
    }
}

impl Default for RecalculationPolicy {
    fn default() -> Self {
        Self::from_config(&NavigationConfig::default())
    }
}

/// Pick the travel mode for a request.
///
/// Walking when the straight-line distance is at most `walking_threshold_m`,
/// driving otherwise.
pub fn select_transport_mode(
    origin: &Coordinate,
    destination: &Coordinate,
    walking_threshold_m: f64,
) -> TransportMode {
    if distance_meters(origin, destination) <= walking_threshold_m {
        TransportMode::Walking
    } else {
        TransportMode::Automobile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_WALKING_THRESHOLD_M;
    use crate::geo::offset_coordinate;

    const ORIGIN: Coordinate = Coordinate::new(0.0, 0.0);

    fn fix_at(bearing: f64, meters: f64) -> LocationFix {
        LocationFix::now(offset_coordinate(&ORIGIN, bearing, meters))
    }

    #[test]
    fn test_first_fix_requests_initial_route_once() {
        let mut policy = RecalculationPolicy::default();

        let signal = policy.on_location_fix(&LocationFix::now(ORIGIN));
        assert_eq!(
            signal,
            Some(RecalculationSignal::RequestInitialRoute { origin: ORIGIN })
        );
        assert_eq!(policy.last_request_coordinate(), Some(ORIGIN));

        assert_eq!(policy.on_location_fix(&LocationFix::now(ORIGIN)), None);
    }

    #[test]
    fn test_small_movement_does_not_recompute() {
        let mut policy = RecalculationPolicy::default();
        policy.on_location_fix(&LocationFix::now(ORIGIN));

        assert_eq!(policy.on_location_fix(&fix_at(0.0, 10.0)), None);
        assert_eq!(policy.last_request_coordinate(), Some(ORIGIN));
    }

    #[test]
    fn test_movement_past_threshold_recomputes() {
        let mut policy = RecalculationPolicy::default();
        policy.on_location_fix(&LocationFix::now(ORIGIN));
        assert_eq!(policy.on_location_fix(&fix_at(0.0, 10.0)), None);

        let far = fix_at(0.0, 60.0);
        let signal = policy.on_location_fix(&far);
        assert_eq!(
            signal,
            Some(RecalculationSignal::Recompute {
                origin: far.coordinate
            })
        );
        assert_eq!(policy.last_request_coordinate(), Some(far.coordinate));
    }

    #[test]
    fn test_drift_accumulates_from_last_request() {
        let mut policy = RecalculationPolicy::default();
        policy.on_location_fix(&LocationFix::now(ORIGIN));

        // Every step is small but the total crosses 50m
        let signals: Vec<_> = (1..=6)
            .filter_map(|i| policy.on_location_fix(&fix_at(90.0, i as f64 * 10.0)))
            .collect();
        assert_eq!(signals.len(), 1);
        assert!(matches!(signals[0], RecalculationSignal::Recompute { .. }));
    }

    #[test]
    fn test_exactly_at_threshold_does_not_recompute() {
        let mut policy = RecalculationPolicy::new(50.0);
        policy.on_location_fix(&LocationFix::now(ORIGIN));
        assert_eq!(policy.on_location_fix(&fix_at(0.0, 49.9)), None);
    }

    #[test]
    fn test_mark_requested_and_reset() {
        let mut policy = RecalculationPolicy::default();
        let marked = offset_coordinate(&ORIGIN, 0.0, 500.0);
        policy.mark_requested(marked);

        // Close to the marked origin, so no initial request
        let near = offset_coordinate(&marked, 90.0, 5.0);
        assert_eq!(policy.on_location_fix(&LocationFix::now(near)), None);

        policy.reset();
        assert_eq!(policy.last_request_coordinate(), None);
        assert!(matches!(
            policy.on_location_fix(&LocationFix::now(near)),
            Some(RecalculationSignal::RequestInitialRoute { .. })
        ));
    }

    #[test]
    fn test_signal_accessors() {
        let signal = RecalculationSignal::Recompute { origin: ORIGIN };
        assert_eq!(signal.origin(), ORIGIN);
        assert_eq!(signal.kind(), "recompute");
        assert_eq!(signal.to_string(), "recompute from 0.000000,0.000000");
    }

    #[test]
    fn test_transport_mode_by_distance() {
        let destination = offset_coordinate(&ORIGIN, 45.0, 500.0);
        assert_eq!(
            select_transport_mode(&ORIGIN, &destination, DEFAULT_WALKING_THRESHOLD_M),
            TransportMode::Walking
        );

        let destination = offset_coordinate(&ORIGIN, 45.0, 2000.0);
        assert_eq!(
            select_transport_mode(&ORIGIN, &destination, DEFAULT_WALKING_THRESHOLD_M),
            TransportMode::Automobile
        );
    }

    #[test]
    fn test_transport_mode_threshold_is_inclusive() {
        let destination = offset_coordinate(&ORIGIN, 0.0, 899.5);
        assert_eq!(
            select_transport_mode(&ORIGIN, &destination, 900.0),
            TransportMode::Walking
        );
        assert_eq!(
            select_transport_mode(&ORIGIN, &ORIGIN, 0.0),
            TransportMode::Walking
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_never_signals_within_threshold_of_last_request(
                moves in prop::collection::vec((0.0..360.0_f64, 0.0..80.0_f64), 1..50)
            ) {
                let mut policy = RecalculationPolicy::new(50.0);
                let mut position = ORIGIN;
                policy.on_location_fix(&LocationFix::now(position));

                for (bearing, meters) in moves {
                    position = offset_coordinate(&position, bearing, meters);
                    let previous = policy.last_request_coordinate().unwrap();

                    if let Some(signal) = policy.on_location_fix(&LocationFix::now(position)) {
                        prop_assert!(distance_meters(&signal.origin(), &previous) > 50.0);
                        prop_assert!(matches!(signal, RecalculationSignal::Recompute { .. }), "expected Recompute signal");
                    }
                }
            }
        }
    }
}
