//! Location fixes and the sources that push them.
//!
//! A [`LocationFixSource`] hands the session a channel of fixes when started;
//! fixes arrive one at a time, in order. Permission handling and platform
//! location APIs live outside this crate; they feed a source such as
//! [`ChannelFixSource`] through its [`FixSender`].
//!
//! # Example
//!
//! ```ignore
//! use wayback::location::{ChannelFixSource, LocationFix, LocationFixSource};
//!
//! let (mut source, sender) = ChannelFixSource::new(64);
//! let mut fixes = source.start()?;
//!
//! // Platform callback
//! sender.push(LocationFix::now(coordinate));
//!
//! while let Some(fix) = fixes.recv().await {
//!     session.handle_fix(fix);
//! }
//! ```

mod channel;
mod filter;
mod replay;

pub use channel::{ChannelFixSource, FixSender};
pub use filter::DistanceFilter;
pub use replay::{parse_track, ReplayFixSource};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::geo::Coordinate;

/// A single timestamped location sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Reported position.
    pub coordinate: Coordinate,
    /// When the position was measured.
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    /// Create a fix with an explicit timestamp.
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            timestamp,
        }
    }

    /// Create a fix stamped with the current time.
    pub fn now(coordinate: Coordinate) -> Self {
        Self::new(coordinate, Utc::now())
    }
}

/// Errors from fix sources.
#[derive(Debug, Error)]
pub enum LocationError {
    /// `start()` was called on a source that is already running.
    #[error("Location source already started")]
    AlreadyStarted,

    /// A recorded track could not be read.
    #[error("Failed to read track: {0}")]
    Io(#[from] std::io::Error),

    /// A recorded track line could not be parsed.
    #[error("Invalid track line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Push-based source of location fixes.
///
/// The session calls `start()` once and consumes the returned receiver until
/// it closes or the session stops; `stop()` ends delivery.
pub trait LocationFixSource: Send {
    /// Begin delivering fixes.
    fn start(&mut self) -> Result<mpsc::Receiver<LocationFix>, LocationError>;

    /// Stop delivering fixes. Idempotent.
    fn stop(&mut self);
}
