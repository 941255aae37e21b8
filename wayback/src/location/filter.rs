//! Distance filter for incoming fixes.
//!
//! Position sources report far more often than guidance needs. The filter
//! accepts a fix only once the user has moved a minimum distance from the
//! last accepted one, so downstream consumers see a sparser, steadier stream.

use super::LocationFix;
use crate::geo::distance_meters;

/// Drops fixes closer than a minimum distance to the last accepted fix.
#[derive(Debug, Clone)]
pub struct DistanceFilter {
    min_distance_m: f64,
    last_accepted: Option<LocationFix>,
    accepted: u64,
    dropped: u64,
}

impl DistanceFilter {
    /// Create a filter. A minimum of zero accepts every fix.
    pub fn new(min_distance_m: f64) -> Self {
        Self {
            min_distance_m: min_distance_m.max(0.0),
            last_accepted: None,
            accepted: 0,
            dropped: 0,
        }
    }

    /// Offer a fix. Returns `true` if it should be delivered.
    pub fn accept(&mut self, fix: &LocationFix) -> bool {
        if let Some(last) = &self.last_accepted {
            if distance_meters(&last.coordinate, &fix.coordinate) < self.min_distance_m {
                self.dropped += 1;
                return false;
            }
        }

        self.last_accepted = Some(*fix);
        self.accepted += 1;
        true
    }

    /// The most recently accepted fix.
    pub fn last_accepted(&self) -> Option<&LocationFix> {
        self.last_accepted.as_ref()
    }

    /// Number of fixes accepted so far.
    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    /// Number of fixes dropped so far.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Forget the last accepted fix so the next one is always delivered.
    pub fn clear(&mut self) {
        self.last_accepted = None;
    }
}
