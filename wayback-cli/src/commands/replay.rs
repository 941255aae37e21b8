//! Replay command - drive a navigation session from a recorded track.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wayback::config::ConfigFile;
use wayback::geo::Coordinate;
use wayback::location::ReplayFixSource;
use wayback::session::{NavigationSession, SessionCommand, SessionObserver};

use super::common::RouteSource;
use crate::error::CliError;
use crate::output;

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub track: PathBuf,
    pub route_file: Option<PathBuf>,
    pub osrm_url: Option<String>,
    pub destination: Option<Coordinate>,
    pub speed: Option<f64>,
}

/// Run the replay command.
pub fn run(args: ReplayArgs, config: &ConfigFile) -> Result<(), CliError> {
    if let Some(speed) = args.speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(CliError::InvalidArgument(format!(
                "--speed must be a positive number, got {}",
                speed
            )));
        }
    }

    let route_source = RouteSource::resolve(args.route_file, args.osrm_url, config)?;
    let destination = args
        .destination
        .or_else(|| route_source.destination())
        .ok_or_else(|| {
            CliError::InvalidArgument("--destination is required with --osrm-url".to_string())
        })?;

    let mut source = ReplayFixSource::from_file(&args.track)?
        .with_distance_filter(config.navigation.distance_filter_m);
    if let Some(speed) = args.speed {
        source = source.with_speed(speed);
    }

    output::print_header(&format!("Wayback Replay v{}", wayback::VERSION));
    println!("Track:       {} ({} fixes)", args.track.display(), source.len());
    println!("Routing:     {}", route_source.describe());
    println!("Destination: {}", destination);
    match args.speed {
        Some(speed) => println!("Pacing:      {}x recorded time", speed),
        None => println!("Pacing:      as fast as possible"),
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let requester = route_source.into_requester(config.navigation.route_request_timeout)?;
    let mut session =
        NavigationSession::new(config.navigation.clone(), requester).with_destination(destination);
    let observer = session.observer();
    let metrics = session.metrics();

    let cancellation = CancellationToken::new();
    let signal_token = cancellation.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        signal_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::RuntimeCreation(e.to_string()))?;

    runtime.block_on(async {
        let (commands, command_rx) = mpsc::channel(4);
        // Buffered; applied before the first fix
        let _ = commands.send(SessionCommand::StartNavigation).await;

        let reporter = tokio::spawn(report_progress(observer.clone(), cancellation.clone()));

        let result = session.run(&mut source, command_rx, cancellation.clone()).await;

        cancellation.cancel();
        if let Err(e) = reporter.await {
            tracing::warn!(error = %e, "Progress reporter failed");
        }
        result
    })?;

    output::print_session_summary(&metrics.snapshot(), &observer.navigation_state());
    Ok(())
}

/// Print route, step and error changes until cancelled. Cancels on arrival.
async fn report_progress(observer: SessionObserver, cancellation: CancellationToken) {
    let mut navigation = observer.navigation_updates();
    let mut routes = observer.route_updates();
    let mut errors = observer.error_updates();
    let mut last_step: Option<usize> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancellation.cancelled() => break,

            changed = routes.changed() => {
                if changed.is_err() {
                    break;
                }
                let route = routes.borrow_and_update().clone();
                if let Some(route) = route {
                    output::print_route_adopted(&route);
                    last_step = None;
                }
            }

            changed = errors.changed() => {
                if changed.is_err() {
                    break;
                }
                let message = errors.borrow_and_update().clone();
                if let Some(message) = message {
                    output::print_session_error(&message);
                }
            }

            changed = navigation.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *navigation.borrow_and_update();

                if state.has_arrived {
                    output::print_arrived();
                    cancellation.cancel();
                    break;
                }

                if state.is_navigating && last_step != Some(state.current_step_index) {
                    last_step = Some(state.current_step_index);
                    let instruction = observer
                        .route()
                        .and_then(|route| {
                            route
                                .step(state.current_step_index)
                                .map(|step| step.instruction.clone())
                        })
                        .unwrap_or_default();
                    output::print_step(&state, &instruction);
                }
            }
        }
    }
}
