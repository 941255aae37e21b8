//! Common types and utilities shared across CLI commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use wayback::config::ConfigFile;
use wayback::geo::Coordinate;
use wayback::route::{OsrmRouteRequester, RawRoute, RouteRequester, StaticRouteRequester, TransportMode};

use crate::error::CliError;

/// Parse a `lat,lon` argument.
pub fn parse_coordinate(s: &str) -> Result<Coordinate, String> {
    s.parse::<Coordinate>().map_err(|e| e.to_string())
}

/// Travel mode selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ModeArg {
    /// Route on foot
    Walking,
    /// Route by car
    Driving,
}

impl From<ModeArg> for TransportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Walking => TransportMode::Walking,
            ModeArg::Driving => TransportMode::Automobile,
        }
    }
}

/// Where routes come from.
#[derive(Debug)]
pub enum RouteSource {
    /// A fixed route loaded from a JSON file.
    File { path: PathBuf, route: RawRoute },
    /// An OSRM-compatible HTTP service.
    Osrm(String),
}

impl RouteSource {
    /// Resolve from CLI args and config. A route file wins over any URL;
    /// a CLI URL wins over the configured one.
    pub fn resolve(
        route_file: Option<PathBuf>,
        osrm_url: Option<String>,
        config: &ConfigFile,
    ) -> Result<Self, CliError> {
        if let Some(path) = route_file {
            let route = RawRoute::load(&path)?;
            return Ok(RouteSource::File { path, route });
        }

        osrm_url
            .or_else(|| config.routing.osrm_url.clone())
            .map(RouteSource::Osrm)
            .ok_or_else(|| {
                CliError::Config(
                    "No routing provider. Use --route-file, --osrm-url, \
                     or set osrm_url under [routing] in config.ini"
                        .to_string(),
                )
            })
    }

    /// Destination implied by the source, if any.
    pub fn destination(&self) -> Option<Coordinate> {
        match self {
            RouteSource::File { route, .. } => route.polyline.last().copied(),
            RouteSource::Osrm(_) => None,
        }
    }

    /// Short description for the banner.
    pub fn describe(&self) -> String {
        match self {
            RouteSource::File { path, .. } => format!("file {}", path.display()),
            RouteSource::Osrm(url) => format!("OSRM at {}", url),
        }
    }

    /// Build the requester for this source.
    pub fn into_requester(self, timeout: Duration) -> Result<Arc<dyn RouteRequester>, CliError> {
        let requester: Arc<dyn RouteRequester> = match self {
            RouteSource::File { route, .. } => Arc::new(StaticRouteRequester::new(route)),
            RouteSource::Osrm(url) => Arc::new(OsrmRouteRequester::with_timeout(url, timeout)?),
        };
        Ok(requester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        let c = parse_coordinate("53.55,9.99").unwrap();
        assert_eq!(c, Coordinate::new(53.55, 9.99));
        assert!(parse_coordinate("north").is_err());
        assert!(parse_coordinate("91.0,0.0").is_err());
    }

    #[test]
    fn test_mode_arg_conversion() {
        assert_eq!(TransportMode::from(ModeArg::Walking), TransportMode::Walking);
        assert_eq!(TransportMode::from(ModeArg::Driving), TransportMode::Automobile);
    }

    #[test]
    fn test_resolve_prefers_cli_url_over_config() {
        let mut config = ConfigFile::default();
        config.routing.osrm_url = Some("http://config.example".to_string());

        let source =
            RouteSource::resolve(None, Some("http://cli.example".to_string()), &config).unwrap();
        assert!(matches!(source, RouteSource::Osrm(url) if url == "http://cli.example"));

        let source = RouteSource::resolve(None, None, &config).unwrap();
        assert!(matches!(source, RouteSource::Osrm(url) if url == "http://config.example"));
    }

    #[test]
    fn test_resolve_without_provider_fails() {
        let err = RouteSource::resolve(None, None, &ConfigFile::default()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_route_file_supplies_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.json");
        let end = Coordinate::new(0.0, 0.001);
        RawRoute::new(
            vec![wayback::route::Step::new("Walk east", 111.0)],
            vec![Coordinate::new(0.0, 0.0), end],
        )
        .save(&path)
        .unwrap();

        let source = RouteSource::resolve(Some(path), None, &ConfigFile::default()).unwrap();
        assert_eq!(source.destination(), Some(end));
        assert!(source.describe().starts_with("file "));
    }
}
