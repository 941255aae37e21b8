//! Channel-fed fix source.
//!
//! Platform glue pushes fixes through a cloneable [`FixSender`]; the session
//! drains them from the receiver returned by `start()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{DistanceFilter, LocationError, LocationFix, LocationFixSource};

/// Fix source fed explicitly through a [`FixSender`].
#[derive(Debug)]
pub struct ChannelFixSource {
    receiver: Option<mpsc::Receiver<LocationFix>>,
    active: Arc<AtomicBool>,
}

/// Push handle for a [`ChannelFixSource`].
#[derive(Debug, Clone)]
pub struct FixSender {
    tx: mpsc::Sender<LocationFix>,
    active: Arc<AtomicBool>,
    filter: Option<Arc<Mutex<DistanceFilter>>>,
}

impl ChannelFixSource {
    /// Create a source buffering up to `capacity` undelivered fixes.
    pub fn new(capacity: usize) -> (Self, FixSender) {
        Self::build(capacity, None)
    }

    /// Create a source that drops fixes closer than `min_distance_m` to the
    /// last delivered one.
    pub fn with_distance_filter(capacity: usize, min_distance_m: f64) -> (Self, FixSender) {
        Self::build(
            capacity,
            Some(Arc::new(Mutex::new(DistanceFilter::new(min_distance_m)))),
        )
    }

    fn build(capacity: usize, filter: Option<Arc<Mutex<DistanceFilter>>>) -> (Self, FixSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let active = Arc::new(AtomicBool::new(false));

        let source = Self {
            receiver: Some(rx),
            active: Arc::clone(&active),
        };
        let sender = FixSender { tx, active, filter };
        (source, sender)
    }

    /// Whether the source is currently delivering.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl LocationFixSource for ChannelFixSource {
    fn start(&mut self) -> Result<mpsc::Receiver<LocationFix>, LocationError> {
        let receiver = self.receiver.take().ok_or(LocationError::AlreadyStarted)?;
        self.active.store(true, Ordering::SeqCst);
        tracing::debug!("Channel fix source started");
        Ok(receiver)
    }

    fn stop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::debug!("Channel fix source stopped");
        }
    }
}

impl FixSender {
    /// Push a fix without blocking.
    ///
    /// Returns `true` if the fix was queued. Fixes are dropped while the
    /// source is not started, when the distance filter rejects them, or when
    /// the buffer is full.
    pub fn push(&self, fix: LocationFix) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }

        if let Some(filter) = &self.filter {
            if !filter.lock().accept(&fix) {
                return false;
            }
        }

        match self.tx.try_send(fix) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Fix buffer full, dropping fix");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{offset_coordinate, Coordinate};

    fn fix_at(meters_north: f64) -> LocationFix {
        LocationFix::now(offset_coordinate(&Coordinate::new(0.0, 0.0), 0.0, meters_north))
    }

    #[tokio::test]
    async fn test_push_before_start_is_dropped() {
        let (mut source, sender) = ChannelFixSource::new(8);
        assert!(!sender.push(fix_at(0.0)));

        let mut rx = source.start().unwrap();
        assert!(sender.push(fix_at(1.0)));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.coordinate, fix_at(1.0).coordinate);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (mut source, _sender) = ChannelFixSource::new(8);
        let _rx = source.start().unwrap();
        assert!(matches!(source.start(), Err(LocationError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_stop_halts_delivery() {
        let (mut source, sender) = ChannelFixSource::new(8);
        let _rx = source.start().unwrap();
        assert!(source.is_active());

        source.stop();
        source.stop();
        assert!(!source.is_active());
        assert!(!sender.push(fix_at(0.0)));
    }

    #[tokio::test]
    async fn test_distance_filter_applied_on_push() {
        let (mut source, sender) = ChannelFixSource::with_distance_filter(8, 20.0);
        let mut rx = source.start().unwrap();

        assert!(sender.push(fix_at(0.0)));
        assert!(!sender.push(fix_at(10.0)));
        assert!(sender.push(fix_at(30.0)));

        drop(sender);
        let mut delivered = 0;
        while rx.recv().await.is_some() {
            delivered += 1;
        }
        assert_eq!(delivered, 2);
    }

    #[tokio::test]
    async fn test_full_buffer_drops() {
        let (mut source, sender) = ChannelFixSource::new(1);
        let _rx = source.start().unwrap();
        assert!(sender.push(fix_at(0.0)));
        assert!(!sender.push(fix_at(100.0)));
    }
}
