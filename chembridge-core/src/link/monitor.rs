//! Device communication monitor
//!
//! Tracks how long it has been since the bus task delivered a state. Polling
//! carries on regardless; once the silence passes the threshold the last known
//! state is republished once, flagged `comms_lost`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use chembridge_protocol::DeviceState;

/// Default silence before the device is considered lost
pub const DEFAULT_COMMS_LOST_THRESHOLD_MS: u64 = 30_000;

/// Communication health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommsStatus {
    /// States arriving within the threshold
    Ok,
    /// No state within the threshold
    Lost,
}

/// Tracks device silence and builds the comms-lost republish
#[derive(Debug, Clone)]
pub struct CommsMonitor {
    threshold_ms: u64,
    /// Last state delivery, or monitor start if none yet
    last_seen_ms: u64,
    last_state: Option<DeviceState>,
    lost: bool,
    /// Number of times comms were declared lost
    lost_count: u32,
}

impl CommsMonitor {
    pub fn new(threshold_ms: u64, now_ms: u64) -> Self {
        Self {
            threshold_ms,
            last_seen_ms: now_ms,
            last_state: None,
            lost: false,
            lost_count: 0,
        }
    }

    /// Record a fresh state
    ///
    /// Returns true if this ends a comms-lost period.
    pub fn state_received(&mut self, state: &DeviceState, now_ms: u64) -> bool {
        self.last_seen_ms = now_ms;
        self.last_state = Some(*state);
        let restored = self.lost;
        self.lost = false;
        restored
    }

    /// Check the silence against the threshold
    ///
    /// On the transition to lost, returns the last known state with
    /// `comms_lost` set, ready to republish. Returns `None` otherwise,
    /// including when no state has ever been received.
    pub fn check(&mut self, now_ms: u64) -> Option<DeviceState> {
        if self.lost || now_ms.saturating_sub(self.last_seen_ms) < self.threshold_ms {
            return None;
        }

        self.lost = true;
        self.lost_count = self.lost_count.saturating_add(1);

        self.last_state.map(|mut state| {
            state.comms_lost = true;
            state
        })
    }

    pub fn status(&self) -> CommsStatus {
        if self.lost {
            CommsStatus::Lost
        } else {
            CommsStatus::Ok
        }
    }

    /// Milliseconds since the last state (or since start)
    pub fn silence_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_seen_ms)
    }

    pub fn lost_count(&self) -> u32 {
        self.lost_count
    }

    pub fn last_state(&self) -> Option<&DeviceState> {
        self.last_state.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_within_threshold() {
        let mut monitor = CommsMonitor::new(30_000, 0);
        monitor.state_received(&DeviceState::default(), 1_000);
        assert_eq!(monitor.check(30_999), None);
        assert_eq!(monitor.status(), CommsStatus::Ok);
    }

    #[test]
    fn test_lost_republishes_once() {
        let mut monitor = CommsMonitor::new(30_000, 0);
        let mut state = DeviceState::default();
        state.temperature = 80;
        monitor.state_received(&state, 1_000);

        let republish = monitor.check(31_000).unwrap();
        assert!(republish.comms_lost);
        assert_eq!(republish.temperature, 80);
        assert_eq!(monitor.status(), CommsStatus::Lost);

        // Only once per lost period
        assert_eq!(monitor.check(60_000), None);
        assert_eq!(monitor.lost_count(), 1);

        // Stored state is not modified
        assert!(!monitor.last_state().unwrap().comms_lost);
    }

    #[test]
    fn test_restored_on_next_state() {
        let mut monitor = CommsMonitor::new(5_000, 0);
        monitor.state_received(&DeviceState::default(), 0);
        assert!(monitor.check(5_000).is_some());

        assert!(monitor.state_received(&DeviceState::default(), 6_000));
        assert_eq!(monitor.status(), CommsStatus::Ok);
        assert!(!monitor.state_received(&DeviceState::default(), 7_000));

        // A second outage is reported again
        assert!(monitor.check(12_000).is_some());
        assert_eq!(monitor.lost_count(), 2);
    }

    #[test]
    fn test_lost_without_any_state() {
        let mut monitor = CommsMonitor::new(5_000, 100);
        assert_eq!(monitor.check(5_100), None);
        assert_eq!(monitor.status(), CommsStatus::Lost);
        assert_eq!(monitor.silence_ms(6_000), 5_900);
    }
}
