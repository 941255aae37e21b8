//! Wayback CLI - command-line interface
//!
//! Replays recorded location tracks through the wayback guidance engine and
//! queries routing services.

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wayback::config::ConfigFile;
use wayback::geo::Coordinate;
use wayback::logging::{init_logging, LoggingGuard};

use commands::common::{parse_coordinate, ModeArg};
use error::CliError;

#[derive(Parser)]
#[command(name = "wayback")]
#[command(version, about = "Step-by-step guidance back to your parked car", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/wayback/config.ini if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded track through a navigation session
    Replay {
        /// Recorded track (CSV: timestamp,latitude,longitude)
        #[arg(long)]
        track: PathBuf,

        /// Serve this route (JSON) for every route request
        #[arg(long, conflicts_with = "osrm_url")]
        route_file: Option<PathBuf>,

        /// OSRM-compatible routing service URL
        #[arg(long)]
        osrm_url: Option<String>,

        /// Where the car is parked, as lat,lon (defaults to the route file's end)
        #[arg(long, value_parser = parse_coordinate)]
        destination: Option<Coordinate>,

        /// Reproduce recorded timing at this speed factor (1.0 = real time)
        #[arg(long)]
        speed: Option<f64>,
    },

    /// Request a single route and print its steps
    Route {
        /// Origin as lat,lon
        #[arg(long, value_parser = parse_coordinate)]
        from: Coordinate,

        /// Destination as lat,lon
        #[arg(long, value_parser = parse_coordinate)]
        to: Coordinate,

        /// OSRM-compatible routing service URL
        #[arg(long)]
        osrm_url: Option<String>,

        /// Travel mode (chosen by distance when omitted)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Save the route as JSON for use with `replay --route-file`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = setup(&cli).and_then(|(config, _guard)| dispatch(cli.command, &config));

    if let Err(e) = result {
        eprintln!("{} {}", console::style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn setup(cli: &Cli) -> Result<(ConfigFile, LoggingGuard), CliError> {
    let mut config = ConfigFile::load_or_default(cli.config.as_deref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    let guard = init_logging(&config.logging)?;
    tracing::debug!(config = ?cli.config, "Configuration loaded");
    Ok((config, guard))
}

fn dispatch(command: Commands, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        Commands::Replay {
            track,
            route_file,
            osrm_url,
            destination,
            speed,
        } => commands::replay::run(
            commands::replay::ReplayArgs {
                track,
                route_file,
                osrm_url,
                destination,
                speed,
            },
            config,
        ),
        Commands::Route {
            from,
            to,
            osrm_url,
            mode,
            output,
        } => commands::route::run(
            commands::route::RouteArgs {
                from,
                to,
                osrm_url,
                mode,
                output,
            },
            config,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_replay_args() {
        let cli = Cli::try_parse_from([
            "wayback",
            "replay",
            "--track",
            "walk.csv",
            "--osrm-url",
            "http://localhost:5000",
            "--destination",
            "53.55,9.99",
            "--speed",
            "4",
        ])
        .unwrap();

        match cli.command {
            Commands::Replay {
                destination, speed, ..
            } => {
                assert_eq!(destination, Some(Coordinate::new(53.55, 9.99)));
                assert_eq!(speed, Some(4.0));
            }
            Commands::Route { .. } => panic!("expected replay"),
        }
    }

    #[test]
    fn test_route_file_conflicts_with_osrm_url() {
        let result = Cli::try_parse_from([
            "wayback",
            "replay",
            "--track",
            "walk.csv",
            "--route-file",
            "route.json",
            "--osrm-url",
            "http://localhost:5000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let result = Cli::try_parse_from([
            "wayback", "route", "--from", "here", "--to", "53.5,9.9",
        ]);
        assert!(result.is_err());
    }
}
