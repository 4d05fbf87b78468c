//! Single-value state channels.

use crate::data::TimeRange;
use crate::error::{ConsoleError, Result};

/// Holds the one time range the console's ruler shows.
///
/// The ruler has exactly one visible range, so pushing several ranges at
/// once is a caller bug and is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRangeChannel {
    name: String,
    state: Option<TimeRange>,
}

impl TimeRangeChannel {
    /// Create an empty channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: None,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn state(&self) -> Option<TimeRange> {
        self.state
    }

    /// Set the value. Returns whether it changed.
    pub fn set_state(&mut self, range: TimeRange) -> bool {
        if self.state == Some(range) {
            return false;
        }
        self.state = Some(range);
        true
    }

    /// Set the value from a batch, which must hold at most one range.
    pub fn set_states(&mut self, ranges: &[TimeRange]) -> Result<bool> {
        match ranges {
            [] => Ok(false),
            [range] => Ok(self.set_state(*range)),
            _ => Err(ConsoleError::unsupported_bulk_change(&self.name)),
        }
    }
}
