//! Integration tests for the navigation session.
//!
//! These tests drive `NavigationSession::run` end to end:
//! - Recorded track replay → route requests → step progress → arrival
//! - Commands (retry, stop) arriving over the command channel
//! - Cancellation of a running session
//!
//! Run with: `cargo test --test session_integration`

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wayback::config::NavigationConfig;
use wayback::geo::{distance_meters, offset_coordinate, Coordinate};
use wayback::location::{ChannelFixSource, LocationFix, LocationFixSource, ReplayFixSource};
use wayback::route::{
    RawRoute, RouteRequester, RoutingError, StaticRouteRequester, Step, TransportMode,
};
use wayback::session::{NavigationSession, SessionCommand};

// ============================================================================
// Helper Functions
// ============================================================================

/// Parking spot somewhere in Hamburg.
const START: Coordinate = Coordinate::new(53.5503, 9.9930);

/// Point `meters` east of the start.
fn east(meters: f64) -> Coordinate {
    offset_coordinate(&START, 90.0, meters)
}

/// Requester that answers with a straight two-step route from the origin.
///
/// Unlike `StaticRouteRequester`, each recomputed route starts where the
/// user is, like a real provider.
struct StraightLineRequester;

impl RouteRequester for StraightLineRequester {
    fn request_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        _mode: TransportMode,
    ) -> BoxFuture<'_, Result<RawRoute, RoutingError>> {
        Box::pin(async move { Ok(straight_route(origin, destination)) })
    }

    fn name(&self) -> &'static str {
        "straight-line"
    }
}

fn straight_route(origin: Coordinate, destination: Coordinate) -> RawRoute {
    let length = distance_meters(&origin, &destination);
    let segments = (length / 10.0).ceil().max(1.0) as usize;
    let polyline = (0..=segments)
        .map(|i| {
            let t = i as f64 / segments as f64;
            Coordinate::new(
                origin.latitude + (destination.latitude - origin.latitude) * t,
                origin.longitude + (destination.longitude - origin.longitude) * t,
            )
        })
        .collect();

    RawRoute::new(
        vec![
            Step::new("Head east", length / 2.0),
            Step::new("Continue to your car", length / 2.0),
        ],
        polyline,
    )
}

/// Write a track of fixes `spacing_secs` apart, one per distance east.
fn write_track(distances: &[f64], spacing_secs: i64) -> tempfile::NamedTempFile {
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 17, 0, 0).unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "timestamp,latitude,longitude").unwrap();
    for (i, meters) in distances.iter().enumerate() {
        let timestamp = base + chrono::Duration::seconds(i as i64 * spacing_secs);
        let position = east(*meters);
        writeln!(
            file,
            "{},{:.7},{:.7}",
            timestamp.to_rfc3339(),
            position.latitude,
            position.longitude
        )
        .unwrap();
    }
    file
}

/// Push a fix once the session has started the source.
async fn push_when_ready(sender: &wayback::location::FixSender, fix: LocationFix) {
    for _ in 0..100 {
        if sender.push(fix) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("fix source never started");
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A recorded walk from the car's surroundings back to it ends in arrival.
#[tokio::test(start_paused = true)]
async fn test_replayed_walk_arrives_at_destination() {
    let track = write_track(&[0.0, 40.0, 100.0, 160.0, 250.0, 295.0], 10);
    let mut source = ReplayFixSource::from_file(track.path())
        .unwrap()
        .with_speed(1.0);

    let mut session = NavigationSession::new(
        NavigationConfig::default(),
        Arc::new(StraightLineRequester),
    )
    .with_destination(east(300.0));
    let observer = session.observer();
    let metrics = session.metrics();

    let (commands, command_rx) = mpsc::channel(4);
    commands.send(SessionCommand::StartNavigation).await.unwrap();

    session
        .run(&mut source, command_rx, CancellationToken::new())
        .await
        .unwrap();

    let state = observer.navigation_state();
    assert!(state.has_arrived);
    assert!(!state.is_navigating);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.fixes_received, 6);
    assert_eq!(snapshot.arrivals, 1);
    assert!(snapshot.route_requests >= 3, "{:?}", snapshot);
    assert_eq!(snapshot.routes_adopted, snapshot.route_requests);
    assert_eq!(snapshot.routing_failures, 0);
    assert!(snapshot.step_advances >= 1);
    assert!(observer.error_message().is_none());
}

/// The run loop exits once the track is exhausted and no request is pending.
#[tokio::test]
async fn test_run_ends_when_track_is_exhausted() {
    let track = write_track(&[0.0], 1);
    let mut source = ReplayFixSource::from_file(track.path()).unwrap();

    let requester = Arc::new(StaticRouteRequester::new(straight_route(START, east(300.0))));
    let mut session = NavigationSession::new(NavigationConfig::default(), requester.clone())
        .with_destination(east(300.0));

    let (_commands, command_rx) = mpsc::channel(1);
    session
        .run(&mut source, command_rx, CancellationToken::new())
        .await
        .unwrap();

    // The initial request was allowed to complete before exiting
    assert!(session.route().is_some());
    assert!(!session.is_request_in_flight());
    assert_eq!(requester.request_count(), 1);
}

/// Provider failure is surfaced and a retry command recovers.
#[tokio::test]
async fn test_retry_command_recovers_from_failure() {
    let requester = Arc::new(StaticRouteRequester::failing(RoutingError::Http(
        "connection refused".into(),
    )));
    let session = NavigationSession::new(NavigationConfig::default(), requester.clone())
        .with_destination(east(300.0));
    let observer = session.observer();

    let (source, sender) = ChannelFixSource::new(16);
    let (commands, command_rx) = mpsc::channel(4);
    let cancellation = CancellationToken::new();

    let run_token = cancellation.clone();
    let handle = tokio::spawn(async move {
        let mut session = session;
        let mut source = source;
        let result = session.run(&mut source, command_rx, run_token).await;
        (session, result)
    });

    push_when_ready(&sender, LocationFix::now(START)).await;

    let mut errors = observer.error_updates();
    tokio::time::timeout(Duration::from_secs(5), errors.wait_for(|e| e.is_some()))
        .await
        .expect("error surfaced")
        .unwrap();
    assert!(observer.route().is_none());

    requester.set_response(Ok(straight_route(START, east(300.0))));
    commands.send(SessionCommand::RetryAfterError).await.unwrap();
    commands.send(SessionCommand::StartNavigation).await.unwrap();

    let mut routes = observer.route_updates();
    tokio::time::timeout(Duration::from_secs(5), routes.wait_for(|r| r.is_some()))
        .await
        .expect("route adopted")
        .unwrap();

    let mut navigation = observer.navigation_updates();
    tokio::time::timeout(Duration::from_secs(5), navigation.wait_for(|s| s.is_navigating))
        .await
        .expect("navigation started")
        .unwrap();
    assert!(observer.error_message().is_none());

    commands.send(SessionCommand::StopNavigation).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), navigation.wait_for(|s| !s.is_navigating))
        .await
        .expect("navigation stopped")
        .unwrap();

    cancellation.cancel();
    let (session, result) = handle.await.unwrap();
    result.unwrap();

    let snapshot = session.metrics().snapshot();
    assert_eq!(snapshot.routing_failures, 1);
    assert_eq!(snapshot.routes_adopted, 1);
    assert_eq!(requester.request_count(), 2);
}

/// Cancelling the token stops the session and its fix source.
#[tokio::test]
async fn test_cancellation_stops_session_and_source() {
    let requester = Arc::new(StaticRouteRequester::new(straight_route(START, east(300.0))));
    let mut session = NavigationSession::new(NavigationConfig::default(), requester)
        .with_destination(east(300.0));

    let (mut source, sender) = ChannelFixSource::new(16);
    let (_commands, command_rx) = mpsc::channel(1);
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    session
        .run(&mut source, command_rx, cancellation)
        .await
        .unwrap();

    assert!(!source.is_active());
    assert!(!sender.push(LocationFix::now(START)));
}

/// A source cannot be started by two sessions.
#[tokio::test]
async fn test_run_rejects_started_source() {
    let requester = Arc::new(StaticRouteRequester::new(straight_route(START, east(300.0))));
    let mut session = NavigationSession::new(NavigationConfig::default(), requester);

    let (mut source, _sender) = ChannelFixSource::new(16);
    let _fixes = source.start().unwrap();

    let (_commands, command_rx) = mpsc::channel(1);
    let result = session
        .run(&mut source, command_rx, CancellationToken::new())
        .await;
    assert!(result.is_err());
}
