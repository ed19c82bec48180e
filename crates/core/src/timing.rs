//! Timing heuristics shared by predicates and the recheck scheduler.

use std::time::Duration;

/// A resource counts as edited only when it was updated more than this long
/// after creation. Absorbs second-precision timestamps on the remote side.
pub const EDIT_TOLERANCE: Duration = Duration::from_millis(1_000);

/// Pending entries checked more recently than this are skipped by a tick.
pub const RECHECK_DEBOUNCE: Duration = Duration::from_millis(5_000);

/// Interval of the background pending-recheck loop.
pub const PENDING_RECHECK_INTERVAL: Duration = Duration::from_millis(45_000);

/// Interval of the connectivity probe.
pub const CONNECTIVITY_INTERVAL: Duration = Duration::from_millis(60_000);

/// Length of the blocking countdown shown when "next" is refused.
pub const REDIRECT_COUNTDOWN_SECS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub edit_tolerance: Duration,
    pub recheck_debounce: Duration,
    pub pending_recheck_interval: Duration,
    pub connectivity_interval: Duration,
    pub redirect_countdown_secs: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            edit_tolerance: EDIT_TOLERANCE,
            recheck_debounce: RECHECK_DEBOUNCE,
            pending_recheck_interval: PENDING_RECHECK_INTERVAL,
            connectivity_interval: CONNECTIVITY_INTERVAL,
            redirect_countdown_secs: REDIRECT_COUNTDOWN_SECS,
        }
    }
}

impl Timing {
    #[must_use]
    pub fn with_recheck_interval(mut self, interval: Duration) -> Self {
        self.pending_recheck_interval = interval;
        self
    }
}
