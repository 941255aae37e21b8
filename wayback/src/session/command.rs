//! Commands accepted by a running session.

use std::fmt;

use crate::geo::Coordinate;

/// A user command for [`NavigationSession::run`](super::NavigationSession::run).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    /// Begin guidance, or arm it until the first route arrives.
    StartNavigation,
    /// Stop guidance, keeping the last progress visible.
    StopNavigation,
    /// Request a route for a (possibly new) destination.
    RequestInitialRoute {
        origin: Coordinate,
        destination: Coordinate,
    },
    /// Re-issue the request that last failed.
    RetryAfterError,
}

impl fmt::Display for SessionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionCommand::StartNavigation => write!(f, "start"),
            SessionCommand::StopNavigation => write!(f, "stop"),
            SessionCommand::RequestInitialRoute {
                origin,
                destination,
            } => write!(f, "route {} -> {}", origin, destination),
            SessionCommand::RetryAfterError => write!(f, "retry"),
        }
    }
}
