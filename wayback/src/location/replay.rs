//! Replay of recorded fix tracks.
//!
//! Track files are CSV with one fix per line:
//!
//! ```text
//! timestamp,latitude,longitude
//! 2025-06-01T17:02:11Z,53.55012,9.99341
//! 2025-06-01T17:02:14Z,53.55031,9.99377
//! ```
//!
//! The header line is optional; blank lines and lines starting with `#` are
//! skipped.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{DistanceFilter, LocationError, LocationFix, LocationFixSource};
use crate::geo::Coordinate;

const REPLAY_CHANNEL_CAPACITY: usize = 64;

/// Longest pause between two replayed fixes, whatever the speed factor.
const MAX_REPLAY_WAIT: Duration = Duration::from_secs(3600);

/// Parse a recorded track.
pub fn parse_track(contents: &str) -> Result<Vec<LocationFix>, LocationError> {
    let mut fixes = Vec::new();

    for (index, raw_line) in contents.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with("timestamp") {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(LocationError::Parse {
                line: line_no,
                message: format!("expected 3 fields, found {}", fields.len()),
            });
        }

        let timestamp = DateTime::parse_from_rfc3339(fields[0])
            .map_err(|e| LocationError::Parse {
                line: line_no,
                message: format!("bad timestamp '{}': {}", fields[0], e),
            })?
            .with_timezone(&Utc);

        let coordinate = format!("{},{}", fields[1], fields[2])
            .parse::<Coordinate>()
            .map_err(|e| LocationError::Parse {
                line: line_no,
                message: e.to_string(),
            })?;

        fixes.push(LocationFix::new(coordinate, timestamp));
    }

    Ok(fixes)
}

/// Fix source that replays a recorded track.
///
/// Without a speed factor fixes are delivered as fast as the consumer takes
/// them. With one, the gaps between recorded timestamps are reproduced,
/// divided by the factor.
#[derive(Debug)]
pub struct ReplayFixSource {
    fixes: Vec<LocationFix>,
    speed: Option<f64>,
    distance_filter_m: Option<f64>,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
    started: bool,
}

impl ReplayFixSource {
    /// Replay the given fixes.
    pub fn new(fixes: Vec<LocationFix>) -> Self {
        Self {
            fixes,
            speed: None,
            distance_filter_m: None,
            cancellation: CancellationToken::new(),
            handle: None,
            started: false,
        }
    }

    /// Load a track file.
    pub fn from_file(path: &Path) -> Result<Self, LocationError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::new(parse_track(&contents)?))
    }

    /// Reproduce recorded timing, sped up by `factor` (1.0 is real time).
    ///
    /// A single pause never exceeds one hour.
    pub fn with_speed(mut self, factor: f64) -> Self {
        self.speed = (factor.is_finite() && factor > 0.0).then_some(factor);
        self
    }

    /// Drop fixes closer than `meters` to the last delivered fix.
    pub fn with_distance_filter(mut self, meters: f64) -> Self {
        self.distance_filter_m = Some(meters);
        self
    }

    /// Number of fixes in the track.
    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    /// Whether the track is empty.
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

impl LocationFixSource for ReplayFixSource {
    fn start(&mut self) -> Result<mpsc::Receiver<LocationFix>, LocationError> {
        if self.started {
            return Err(LocationError::AlreadyStarted);
        }
        self.started = true;

        let (tx, rx) = mpsc::channel(REPLAY_CHANNEL_CAPACITY);
        let fixes = std::mem::take(&mut self.fixes);
        let speed = self.speed;
        let mut filter = self.distance_filter_m.map(DistanceFilter::new);
        let cancellation = self.cancellation.clone();

        tracing::info!(fixes = fixes.len(), speed = ?speed, "Starting track replay");

        self.handle = Some(tokio::spawn(async move {
            let mut previous: Option<DateTime<Utc>> = None;

            for fix in fixes {
                if let (Some(factor), Some(prev)) = (speed, previous) {
                    let gap = (fix.timestamp - prev).to_std().unwrap_or(Duration::ZERO);
                    let wait = scaled_wait(gap, factor);
                    tokio::select! {
                        _ = cancellation.cancelled() => return,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                previous = Some(fix.timestamp);

                if let Some(filter) = filter.as_mut() {
                    if !filter.accept(&fix) {
                        continue;
                    }
                }

                tokio::select! {
                    _ = cancellation.cancelled() => return,
                    sent = tx.send(fix) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }

            tracing::debug!("Track replay finished");
        }));

        Ok(rx)
    }

    fn stop(&mut self) {
        self.cancellation.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ReplayFixSource {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// Recorded gap scaled by the speed factor, capped at [`MAX_REPLAY_WAIT`].
fn scaled_wait(gap: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(gap.as_secs_f64() / factor)
        .map_or(MAX_REPLAY_WAIT, |wait| wait.min(MAX_REPLAY_WAIT))
}
