//! Point-in-time copy of session counters.

use std::time::Duration;

/// Session counters at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Time since the metrics were created.
    pub uptime: Duration,
    pub fixes_received: u64,
    pub route_requests: u64,
    pub requests_coalesced: u64,
    pub routes_adopted: u64,
    pub routes_rejected: u64,
    pub routing_failures: u64,
    pub step_advances: u64,
    pub arrivals: u64,
}

impl TelemetrySnapshot {
    /// Uptime as HH:MM:SS or MM:SS.
    pub fn uptime_human(&self) -> String {
        let secs = self.uptime.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, mins, secs)
        } else {
            format!("{:02}:{:02}", mins, secs)
        }
    }

    /// Fraction of route requests that produced an adopted route.
    pub fn adoption_rate(&self) -> f64 {
        if self.route_requests == 0 {
            0.0
        } else {
            self.routes_adopted as f64 / self.route_requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_human() {
        let mut snapshot = TelemetrySnapshot {
            uptime: Duration::from_secs(75),
            ..Default::default()
        };
        assert_eq!(snapshot.uptime_human(), "01:15");

        snapshot.uptime = Duration::from_secs(3 * 3600 + 62);
        assert_eq!(snapshot.uptime_human(), "03:01:02");
    }

    #[test]
    fn test_adoption_rate() {
        let mut snapshot = TelemetrySnapshot::default();
        assert_eq!(snapshot.adoption_rate(), 0.0);

        snapshot.route_requests = 4;
        snapshot.routes_adopted = 3;
        assert!((snapshot.adoption_rate() - 0.75).abs() < f64::EPSILON);
    }
}
