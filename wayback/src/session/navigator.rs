//! The navigation session orchestrator.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::command::SessionCommand;
use super::error::SessionError;
use super::state::{SessionObserver, SessionPublisher};
use crate::config::NavigationConfig;
use crate::geo::Coordinate;
use crate::location::{LocationFix, LocationFixSource};
use crate::progress::{NavigationState, ProgressTracker, ProgressUpdate, TrackerPhase};
use crate::recalculation::{select_transport_mode, RecalculationPolicy};
use crate::route::{RawRoute, Route, RouteRequester, RoutingError, TransportMode};
use crate::telemetry::SessionMetrics;

/// Result of one spawned route request.
#[derive(Debug)]
struct RouteOutcome {
    id: u64,
    origin: Coordinate,
    destination: Coordinate,
    result: Result<RawRoute, RoutingError>,
}

#[derive(Debug)]
struct InFlightRequest {
    id: u64,
    origin: Coordinate,
    mode: TransportMode,
    handle: JoinHandle<()>,
}

/// Orchestrates one "return to destination" guidance session.
///
/// Owns the destination, the adopted route, the progress tracker and the
/// recalculation policy. All state changes happen on the task that owns the
/// session; route requests run on spawned tasks and report back through a
/// channel drained by [`run`](Self::run) or
/// [`await_route_response`](Self::await_route_response).
///
/// At most one route request is in flight. Signals raised while one is
/// outstanding are folded into a single follow-up request from the most
/// recent origin.
pub struct NavigationSession {
    config: NavigationConfig,
    destination: Option<Coordinate>,
    route: Option<Arc<Route>>,
    tracker: ProgressTracker,
    policy: RecalculationPolicy,
    requester: Arc<dyn RouteRequester>,
    publisher: SessionPublisher,
    metrics: Arc<SessionMetrics>,

    in_flight: Option<InFlightRequest>,
    pending_origin: Option<Coordinate>,
    next_request_id: u64,
    outcome_tx: mpsc::UnboundedSender<RouteOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<RouteOutcome>,

    /// Start was requested before any route existed.
    navigation_armed: bool,
    last_known_origin: Option<Coordinate>,
    failed_origin: Option<Coordinate>,
}

impl NavigationSession {
    /// Create a session with no destination.
    pub fn new(config: NavigationConfig, requester: Arc<dyn RouteRequester>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            tracker: ProgressTracker::new(&config),
            policy: RecalculationPolicy::from_config(&config),
            config,
            destination: None,
            route: None,
            requester,
            publisher: SessionPublisher::new(),
            metrics: Arc::new(SessionMetrics::new()),
            in_flight: None,
            pending_origin: None,
            next_request_id: 0,
            outcome_tx,
            outcome_rx,
            navigation_armed: false,
            last_known_origin: None,
            failed_origin: None,
        }
    }

    /// Set the destination fixes are routed to.
    pub fn with_destination(mut self, destination: Coordinate) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Handle for observing session state.
    pub fn observer(&self) -> SessionObserver {
        self.publisher.observer()
    }

    /// Shared session counters.
    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// The adopted route.
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// The destination.
    pub fn destination(&self) -> Option<Coordinate> {
        self.destination
    }

    /// Current guidance state.
    pub fn state(&self) -> NavigationState {
        self.tracker.state()
    }

    /// Current tracker phase.
    pub fn phase(&self) -> TrackerPhase {
        self.tracker.phase()
    }

    /// Navigation settings in use.
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Whether a route request is outstanding.
    pub fn is_request_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    // ==================== Fix handling ====================

    /// Process one location fix.
    ///
    /// The recalculation policy runs first and may issue a route request;
    /// the fix is then applied to the progress tracker. Must be called from
    /// within a tokio runtime.
    pub fn handle_fix(&mut self, fix: LocationFix) {
        self.metrics.fix_received();
        self.last_known_origin = Some(fix.coordinate);

        tracing::debug!(position = %fix.coordinate, "Location fix");

        if self.destination.is_some() {
            if let Some(signal) = self.policy.on_location_fix(&fix) {
                tracing::debug!(signal = %signal, "Route request signalled");
                self.dispatch_request(signal.origin());
            }
        }

        match self.tracker.on_location_fix(&fix) {
            ProgressUpdate::Progressed { advanced: true, .. } => self.metrics.step_advanced(),
            ProgressUpdate::Arrived => self.metrics.arrived(),
            ProgressUpdate::Progressed { .. } | ProgressUpdate::Ignored => {}
        }

        self.publish_navigation();
    }

    // ==================== Commands ====================

    /// Begin guidance.
    ///
    /// Restarts from step 0 when a route is adopted. Without a route,
    /// guidance starts as soon as the first route is adopted.
    pub fn start_navigation(&mut self) {
        match &self.route {
            Some(route) => {
                self.navigation_armed = false;
                self.tracker.start_navigation(Arc::clone(route));
            }
            None => {
                tracing::info!("Navigation armed, waiting for a route");
                self.navigation_armed = true;
            }
        }
        self.publish_navigation();
    }

    /// Stop guidance. Idempotent.
    ///
    /// An outstanding route request is left to complete; its route is
    /// adopted without resuming guidance.
    pub fn stop_navigation(&mut self) {
        self.navigation_armed = false;
        self.tracker.stop_navigation();
        self.publish_navigation();
    }

    /// Request a route from `origin` to `destination`.
    ///
    /// A destination different from the current one discards the adopted
    /// route and any request still outstanding for the old destination.
    pub fn request_initial_route(&mut self, origin: Coordinate, destination: Coordinate) {
        if self.destination != Some(destination) {
            self.change_destination(destination);
        }

        self.last_known_origin = Some(origin);
        self.policy.mark_requested(origin);
        self.dispatch_request(origin);
    }

    /// Re-issue the last failed request, clearing the error message.
    ///
    /// Falls back to the last known position when nothing has failed.
    pub fn retry_after_error(&mut self) -> Result<(), SessionError> {
        if self.destination.is_none() {
            return Err(SessionError::NoDestination);
        }
        let origin = self
            .failed_origin
            .or(self.last_known_origin)
            .ok_or(SessionError::NoOrigin)?;

        tracing::info!(origin = %origin, "Retrying route request");

        self.publisher.publish_error(None);
        self.policy.mark_requested(origin);
        self.dispatch_request(origin);
        Ok(())
    }

    /// Apply a [`SessionCommand`].
    pub fn apply_command(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        tracing::debug!(command = %command, "Session command");

        match command {
            SessionCommand::StartNavigation => self.start_navigation(),
            SessionCommand::StopNavigation => self.stop_navigation(),
            SessionCommand::RequestInitialRoute {
                origin,
                destination,
            } => self.request_initial_route(origin, destination),
            SessionCommand::RetryAfterError => self.retry_after_error()?,
        }
        Ok(())
    }

    // ==================== Route responses ====================

    /// Wait for the outstanding route request and apply its result.
    ///
    /// Returns `false` immediately if nothing is in flight.
    pub async fn await_route_response(&mut self) -> bool {
        if self.in_flight.is_none() {
            return false;
        }

        match self.outcome_rx.recv().await {
            Some(outcome) => {
                self.complete_request(outcome);
                true
            }
            None => false,
        }
    }

    /// Wait until no route request is outstanding, including follow-ups.
    pub async fn wait_until_idle(&mut self) {
        while self.await_route_response().await {}
    }

    /// Drive the session from a fix source and a command channel.
    ///
    /// Runs until `cancellation` fires, or until the fix stream ends and no
    /// route request is outstanding. The source is stopped on exit.
    pub async fn run<S>(
        &mut self,
        source: &mut S,
        mut commands: mpsc::Receiver<SessionCommand>,
        cancellation: CancellationToken,
    ) -> Result<(), SessionError>
    where
        S: LocationFixSource + ?Sized,
    {
        let mut fixes = source.start()?;
        let mut fixes_open = true;
        let mut commands_open = true;

        tracing::info!(
            requester = self.requester.name(),
            destination = ?self.destination,
            "Navigation session started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,

                Some(outcome) = self.outcome_rx.recv() => {
                    self.complete_request(outcome);
                }

                command = commands.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            if let Err(e) = self.apply_command(command) {
                                tracing::warn!(error = %e, "Command failed");
                            }
                        }
                        None => commands_open = false,
                    }
                }

                fix = fixes.recv(), if fixes_open => {
                    match fix {
                        Some(fix) => self.handle_fix(fix),
                        None => {
                            tracing::debug!("Fix stream ended");
                            fixes_open = false;
                        }
                    }
                }
            }

            if !fixes_open && self.in_flight.is_none() {
                break;
            }
        }

        source.stop();
        tracing::info!(
            phase = %self.tracker.phase(),
            step = self.tracker.state().current_step_index,
            "Navigation session stopped"
        );
        Ok(())
    }

    // ==================== Internals ====================

    fn change_destination(&mut self, destination: Coordinate) {
        tracing::info!(destination = %destination, "Destination changed");

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
            tracing::debug!(request = in_flight.id, "Discarded request for previous destination");
        }
        self.pending_origin = None;
        self.publisher.publish_loading(false);

        let was_navigating = self.tracker.phase() == TrackerPhase::Navigating;
        self.destination = Some(destination);
        self.route = None;
        self.tracker.reset();
        self.policy.reset();
        self.failed_origin = None;
        self.navigation_armed = self.navigation_armed || was_navigating;

        self.publisher.publish_route(None);
        self.publisher.publish_error(None);
        self.publish_navigation();
    }

    fn dispatch_request(&mut self, origin: Coordinate) {
        if self.in_flight.is_some() {
            if self.pending_origin.replace(origin).is_some() {
                tracing::debug!(origin = %origin, "Replaced pending follow-up request");
            }
            self.metrics.request_coalesced();
            return;
        }
        self.start_request(origin);
    }

    fn start_request(&mut self, origin: Coordinate) {
        let Some(destination) = self.destination else {
            tracing::warn!("Route request without destination ignored");
            return;
        };

        let mode = select_transport_mode(&origin, &destination, self.config.walking_threshold_m);
        let id = self.next_request_id;
        self.next_request_id += 1;

        let requester = Arc::clone(&self.requester);
        let outcome_tx = self.outcome_tx.clone();
        let timeout = self.config.route_request_timeout;

        let handle = tokio::spawn(async move {
            let request = AssertUnwindSafe(async {
                tokio::time::timeout(timeout, requester.request_route(origin, destination, mode))
                    .await
            });

            // Every request must report back, or the session waits on it forever.
            let result = match request.catch_unwind().await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(RoutingError::Timeout(timeout)),
                Err(panic) => Err(RoutingError::Aborted(panic_message(&*panic))),
            };

            // The session may be gone; nothing left to report to.
            let _ = outcome_tx.send(RouteOutcome {
                id,
                origin,
                destination,
                result,
            });
        });

        tracing::info!(
            request = id,
            origin = %origin,
            mode = %mode,
            provider = self.requester.name(),
            "Requesting route"
        );

        self.in_flight = Some(InFlightRequest {
            id,
            origin,
            mode,
            handle,
        });
        self.metrics.route_requested();
        self.publisher.publish_loading(true);
    }

    fn complete_request(&mut self, outcome: RouteOutcome) {
        match &self.in_flight {
            Some(in_flight) if in_flight.id == outcome.id => {
                tracing::debug!(
                    request = outcome.id,
                    origin = %in_flight.origin,
                    mode = %in_flight.mode,
                    "Route request completed"
                );
                self.in_flight = None;
            }
            _ => {
                tracing::debug!(request = outcome.id, "Ignoring stale route response");
                return;
            }
        }

        if self.destination == Some(outcome.destination) {
            match outcome.result {
                Ok(raw) => match Route::from_raw_route(raw) {
                    Ok(route) => self.adopt_route(Arc::new(route)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Rejected route from provider");
                        self.metrics.route_rejected();
                        self.failed_origin = Some(outcome.origin);
                        self.publisher
                            .publish_error(Some(format!("The route could not be used: {}", e)));
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        provider = self.requester.name(),
                        "Route request failed"
                    );
                    self.metrics.routing_failed();
                    self.failed_origin = Some(outcome.origin);
                    self.publisher.publish_error(Some(e.user_message()));
                }
            }
        } else {
            tracing::debug!(request = outcome.id, "Discarding route for previous destination");
        }

        match self.pending_origin.take() {
            Some(origin) => self.start_request(origin),
            None => self.publisher.publish_loading(false),
        }
    }

    fn adopt_route(&mut self, route: Arc<Route>) {
        tracing::info!(
            steps = route.step_count(),
            distance_m = format!("{:.0}", route.total_distance_meters()),
            duration_s = format!("{:.0}", route.total_duration_seconds()),
            "Adopted route"
        );

        self.route = Some(Arc::clone(&route));
        self.failed_origin = None;
        self.metrics.route_adopted();

        if self.tracker.phase() == TrackerPhase::Navigating {
            self.tracker.on_route_replaced(Arc::clone(&route));
        } else if self.navigation_armed {
            self.navigation_armed = false;
            self.tracker.start_navigation(Arc::clone(&route));
        }

        self.publisher.publish_route(Some(route));
        self.publisher.publish_error(None);
        self.publish_navigation();
    }

    fn publish_navigation(&self) {
        self.publisher.publish_navigation(self.tracker.state());
    }
}

impl std::fmt::Debug for NavigationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationSession")
            .field("destination", &self.destination)
            .field("phase", &self.tracker.phase())
            .field("requester", &self.requester.name())
            .field("in_flight", &self.in_flight.as_ref().map(|r| r.id))
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "requester panicked".to_string()
    }
}
