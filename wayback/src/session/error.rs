//! Session error types.

use thiserror::Error;

use crate::location::LocationError;

/// Errors from session commands and the run loop.
///
/// Routing failures are not here: they become observable state rather than
/// errors returned to the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The command needs a destination and none is set.
    #[error("No destination set")]
    NoDestination,

    /// The command needs an origin and no fix has been received.
    #[error("No origin known; wait for a location fix")]
    NoOrigin,

    /// The fix source could not be started.
    #[error("Location source error: {0}")]
    Location(#[from] LocationError),
}
