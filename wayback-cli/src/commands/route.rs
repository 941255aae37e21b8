//! Route command - request a single route and print or save it.

use std::path::PathBuf;

use wayback::config::ConfigFile;
use wayback::geo::{distance_meters, Coordinate};
use wayback::recalculation::select_transport_mode;
use wayback::route::{OsrmRouteRequester, Route, RouteRequester, TransportMode};

use super::common::ModeArg;
use crate::error::CliError;
use crate::output;

/// Arguments for the route command.
pub struct RouteArgs {
    pub from: Coordinate,
    pub to: Coordinate,
    pub osrm_url: Option<String>,
    pub mode: Option<ModeArg>,
    pub output: Option<PathBuf>,
}

/// Run the route command.
pub fn run(args: RouteArgs, config: &ConfigFile) -> Result<(), CliError> {
    let url = args
        .osrm_url
        .or_else(|| config.routing.osrm_url.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No routing service. Use --osrm-url or set osrm_url under [routing] in config.ini"
                    .to_string(),
            )
        })?;

    let mode: TransportMode = match args.mode {
        Some(mode) => mode.into(),
        None => select_transport_mode(&args.from, &args.to, config.navigation.walking_threshold_m),
    };

    println!(
        "Requesting {} route from {} to {} ({} straight line)",
        mode,
        args.from,
        args.to,
        output::format_distance(distance_meters(&args.from, &args.to))
    );

    let requester = OsrmRouteRequester::with_timeout(url, config.navigation.route_request_timeout)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::RuntimeCreation(e.to_string()))?;

    let raw = runtime.block_on(requester.request_route(args.from, args.to, mode))?;
    let route = Route::from_raw_route(raw.clone())?;

    println!();
    output::print_route_adopted(&route);
    output::print_route_steps(&route);

    if let Some(path) = args.output {
        raw.save(&path)?;
        println!();
        println!("Saved route to {}", path.display());
    }

    Ok(())
}
