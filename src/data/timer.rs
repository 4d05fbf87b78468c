//! Countdown timers.

use serde::{Deserialize, Serialize};

/// Live countdown to an event's expiration, ticked outside the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownTimer {
    /// Epoch milliseconds at which the timer expires.
    pub expire_time: i64,
}

impl CountdownTimer {
    /// Create a timer expiring at the given instant.
    pub fn new(expire_time: i64) -> Self {
        Self { expire_time }
    }

    /// Milliseconds left at `now`; zero once expired.
    pub fn remaining_millis(&self, now: i64) -> i64 {
        (self.expire_time - now).max(0)
    }
}
