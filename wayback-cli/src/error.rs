//! CLI error type.

use std::fmt;

use wayback::config::ConfigError;
use wayback::location::LocationError;
use wayback::logging::LoggingError;
use wayback::route::{RouteError, RoutingError};
use wayback::session::SessionError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete.
    Config(String),

    /// A command-line argument is invalid.
    InvalidArgument(String),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// The recorded track could not be loaded.
    Track(LocationError),

    /// A route file or provider route is unusable.
    Route(RouteError),

    /// The routing provider failed.
    Routing(RoutingError),

    /// The session could not run.
    Session(SessionError),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Track(e) => write!(f, "Failed to load track: {}", e),
            CliError::Route(e) => write!(f, "Unusable route: {}", e),
            CliError::Routing(e) => write!(f, "Routing failed: {}", e),
            CliError::Session(e) => write!(f, "Session failed: {}", e),
            CliError::RuntimeCreation(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Track(e) => Some(e),
            CliError::Route(e) => Some(e),
            CliError::Routing(e) => Some(e),
            CliError::Session(e) => Some(e),
            CliError::Config(_) | CliError::InvalidArgument(_) | CliError::RuntimeCreation(_) => {
                None
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<LocationError> for CliError {
    fn from(e: LocationError) -> Self {
        CliError::Track(e)
    }
}

impl From<RouteError> for CliError {
    fn from(e: RouteError) -> Self {
        CliError::Route(e)
    }
}

impl From<RoutingError> for CliError {
    fn from(e: RoutingError) -> Self {
        CliError::Routing(e)
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        CliError::Session(e)
    }
}
