//! Progress tracker state machine.

use std::fmt;
use std::sync::Arc;

use crate::config::NavigationConfig;
use crate::geo::{distance_meters, Coordinate};
use crate::location::LocationFix;
use crate::route::Route;

/// Lifecycle phase of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerPhase {
    /// No episode has started.
    #[default]
    Idle,
    /// Fixes are being matched against the route.
    Navigating,
    /// The destination was reached. Terminal until the next start.
    Arrived,
    /// The user stopped guidance; last progress is frozen for display.
    Stopped,
}

impl TrackerPhase {
    /// Short label for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerPhase::Idle => "idle",
            TrackerPhase::Navigating => "navigating",
            TrackerPhase::Arrived => "arrived",
            TrackerPhase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Guidance state published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NavigationState {
    /// Index of the step being walked, within `[0, step_count - 1]`.
    pub current_step_index: usize,
    /// Distance from the last fix to the end of the current step (meters).
    pub distance_to_next_step_meters: f64,
    /// Whether an episode is active.
    pub is_navigating: bool,
    /// Whether the destination was reached in this episode.
    pub has_arrived: bool,
}

/// What a single fix did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressUpdate {
    /// The tracker was not navigating.
    Ignored,
    /// Progress was recomputed.
    Progressed {
        /// Step index after this fix.
        step_index: usize,
        /// Whether the index moved forward.
        advanced: bool,
    },
    /// The fix was within the arrival threshold.
    Arrived,
}

/// Converts location fixes into step progress along one route.
#[derive(Debug)]
pub struct ProgressTracker {
    arrival_threshold_m: f64,
    step_completion_threshold_m: f64,
    lookahead_steps: usize,
    phase: TrackerPhase,
    route: Option<Arc<Route>>,
    state: NavigationState,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ProgressTracker {
    /// Create a tracker using the thresholds from `config`.
    pub fn new(config: &NavigationConfig) -> Self {
        Self {
            arrival_threshold_m: config.arrival_threshold_m,
            step_completion_threshold_m: config.step_completion_threshold_m,
            lookahead_steps: config.lookahead_steps,
            phase: TrackerPhase::Idle,
            route: None,
            state: NavigationState::default(),
        }
    }

    /// Create a tracker with default thresholds.
    pub fn with_defaults() -> Self {
        Self::new(&NavigationConfig::default())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    /// Current guidance state.
    pub fn state(&self) -> NavigationState {
        self.state
    }

    /// Route the tracker is following.
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// Begin a new episode on `route` at step 0.
    pub fn start_navigation(&mut self, route: Arc<Route>) {
        let previous = self.phase;
        self.state = NavigationState {
            current_step_index: 0,
            distance_to_next_step_meters: first_step_length(&route),
            is_navigating: true,
            has_arrived: false,
        };
        self.route = Some(route);
        self.phase = TrackerPhase::Navigating;

        tracing::info!(from = %previous, "Navigation started");
    }

    /// Stop the episode, freezing the last computed progress. Idempotent.
    pub fn stop_navigation(&mut self) {
        if self.phase != TrackerPhase::Navigating {
            return;
        }
        self.phase = TrackerPhase::Stopped;
        self.state.is_navigating = false;

        tracing::info!(
            step = self.state.current_step_index,
            "Navigation stopped"
        );
    }

    /// Switch to a recomputed route.
    ///
    /// Only applies while navigating; progress restarts at step 0 of the new
    /// route. In any other phase the new route is ignored until the next
    /// start.
    pub fn on_route_replaced(&mut self, route: Arc<Route>) {
        if self.phase != TrackerPhase::Navigating {
            return;
        }

        self.state.current_step_index = 0;
        self.state.distance_to_next_step_meters = first_step_length(&route);
        self.route = Some(route);

        tracing::debug!("Tracker switched to replacement route");
    }

    /// Return to `Idle`, forgetting the route and progress.
    pub fn reset(&mut self) {
        self.phase = TrackerPhase::Idle;
        self.route = None;
        self.state = NavigationState::default();
    }

    /// Update progress from a fix.
    ///
    /// Arrival is checked first and ends the episode without running step
    /// logic. Otherwise the closest step end inside the lookahead window may
    /// advance the index, followed by at most one automatic advance when the
    /// current step's end is already within the completion threshold.
    pub fn on_location_fix(&mut self, fix: &LocationFix) -> ProgressUpdate {
        if self.phase != TrackerPhase::Navigating {
            return ProgressUpdate::Ignored;
        }
        let Some(route) = self.route.clone() else {
            return ProgressUpdate::Ignored;
        };

        let position = fix.coordinate;
        let distance_to_destination = distance_meters(&position, &route.destination());

        if distance_to_destination < self.arrival_threshold_m {
            self.state.has_arrived = true;
            self.state.is_navigating = false;
            self.phase = TrackerPhase::Arrived;

            tracing::info!(
                distance_m = format!("{:.1}", distance_to_destination),
                step = self.state.current_step_index,
                "Arrived at destination"
            );
            return ProgressUpdate::Arrived;
        }

        let start_index = self.state.current_step_index;
        let last_index = route.last_step_index();

        let (candidate_index, candidate_distance) =
            self.closest_step_end(&route, start_index, last_index, &position);

        if candidate_index > start_index && candidate_distance < self.step_completion_threshold_m {
            self.state.current_step_index = candidate_index;
        }

        let mut distance = self.distance_to_step_end(&route, self.state.current_step_index, &position)
            .unwrap_or(distance_to_destination);

        if distance < self.step_completion_threshold_m && self.state.current_step_index < last_index {
            self.state.current_step_index += 1;
            distance = self
                .distance_to_step_end(&route, self.state.current_step_index, &position)
                .unwrap_or(distance_to_destination);
        }

        self.state.distance_to_next_step_meters = distance;

        let advanced = self.state.current_step_index > start_index;
        if advanced {
            tracing::info!(
                from = start_index,
                to = self.state.current_step_index,
                instruction = route
                    .step(self.state.current_step_index)
                    .map(|s| s.instruction.as_str())
                    .unwrap_or(""),
                "Advanced to step"
            );
        } else {
            tracing::debug!(
                step = self.state.current_step_index,
                distance_m = format!("{:.1}", distance),
                "Progress updated"
            );
        }

        ProgressUpdate::Progressed {
            step_index: self.state.current_step_index,
            advanced,
        }
    }

    /// Closest step end among `[from, min(from + lookahead, last)]`.
    ///
    /// A step whose end cannot be resolved counts as infinitely far away.
    fn closest_step_end(
        &self,
        route: &Route,
        from: usize,
        last: usize,
        position: &Coordinate,
    ) -> (usize, f64) {
        let window_end = from.saturating_add(self.lookahead_steps).min(last);

        (from..=window_end)
            .map(|index| {
                let distance = route
                    .step_end_coordinate(index)
                    .map(|end| distance_meters(position, &end))
                    .unwrap_or_else(|e| {
                        tracing::warn!(step = index, error = %e, "Skipping unresolvable step end");
                        f64::INFINITY
                    });
                (index, distance)
            })
            .fold((from, f64::INFINITY), |best, candidate| {
                if candidate.1 < best.1 {
                    candidate
                } else {
                    best
                }
            })
    }

    fn distance_to_step_end(&self, route: &Route, index: usize, position: &Coordinate) -> Option<f64> {
        match route.step_end_coordinate(index) {
            Ok(end) => Some(distance_meters(position, &end)),
            Err(e) => {
                tracing::warn!(step = index, error = %e, "Could not resolve step end");
                None
            }
        }
    }
}

fn first_step_length(route: &Route) -> f64 {
    route.steps()[0].length_meters
}
