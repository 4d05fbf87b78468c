//! Backing event store.
//!
//! The console never mutates events itself. Everything it knows comes from an
//! [`EventStore`], and every change it wants goes through one and may be
//! refused. [`InMemoryEventStore`] is a complete implementation used by the
//! command line replay and the tests.

mod filter;
mod memory;

pub use filter::EventFilter;
pub use memory::{HazardTypeSettings, InMemoryEventStore};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::data::{Color, HazardEvent, TimeRange, TimeResolution};
use crate::entity::EntityKey;

/// Subsystem that initiated a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Originator {
    /// The console itself, acting on a user edit.
    Console,
    /// Another part of the session (spatial display, recommenders).
    #[default]
    Session,
    /// Another workstation or the database.
    Other,
}

/// Lock held on an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum LockStatus {
    /// Nobody holds a lock.
    #[default]
    Unlocked,
    /// This workstation holds the lock.
    LockedByMe,
    /// Someone else holds the lock.
    #[serde(rename_all = "camelCase")]
    LockedByOther {
        /// Workstation holding the lock.
        workstation: String,
        /// User holding the lock.
        user_name: String,
    },
}

impl LockStatus {
    /// Text shown in the lock status column, if any.
    pub fn description(&self) -> Option<String> {
        match self {
            Self::Unlocked => None,
            Self::LockedByMe => Some("Editing".to_string()),
            Self::LockedByOther {
                workstation,
                user_name,
            } => Some(format!("Locked by {}@{}", user_name, workstation)),
        }
    }

    /// Whether edits from this workstation are refused.
    pub fn is_locked_by_other(&self) -> bool {
        matches!(self, Self::LockedByOther { .. })
    }
}

/// A requested change to an event property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyChange {
    /// New start and end times.
    TimeRange(TimeRange),
    /// New value for the until-further-notice attribute.
    UntilFurtherNotice(bool),
}

/// Result of asking the store for a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The change was applied.
    Success,
    /// The change was refused; the event is untouched.
    Rejected,
}

impl ChangeOutcome {
    /// Whether the change was refused.
    pub fn is_rejected(self) -> bool {
        self == Self::Rejected
    }
}

/// Read and write access to the events behind the console.
pub trait EventStore {
    /// Events passing the current filters, in canonical order.
    fn events_for_current_settings(&self) -> Vec<HazardEvent>;

    /// Identifiers of [`Self::events_for_current_settings`], in the same order.
    fn event_ids_for_current_settings(&self) -> Vec<String> {
        self.events_for_current_settings()
            .into_iter()
            .map(|event| event.event_id)
            .collect()
    }

    /// Whether an event passes the current filters.
    fn matches_current_settings(&self, event: &HazardEvent) -> bool;

    /// Current version of an event.
    fn event_by_id(&self, identifier: &str) -> Option<HazardEvent>;

    /// Persisted versions of an event, oldest first.
    fn event_history_by_id(&self, identifier: &str) -> Option<Vec<HazardEvent>>;

    /// Number of persisted versions of an event.
    fn historical_version_count(&self, identifier: &str) -> usize {
        self.event_history_by_id(identifier)
            .map(|history| history.len())
            .unwrap_or(0)
    }

    /// Ask for a property change.
    fn change_event_property(
        &mut self,
        identifier: &str,
        change: PropertyChange,
        originator: Originator,
    ) -> ChangeOutcome;

    /// Tick or untick an event's checkbox. Never refused.
    fn set_event_checked(&mut self, identifier: &str, checked: bool, originator: Originator);

    /// Whether an event's checkbox is ticked.
    fn is_event_checked(&self, identifier: &str) -> bool;

    /// Lock held on an event.
    fn lock_status(&self, identifier: &str) -> LockStatus;

    /// Selected event versions.
    fn selection(&self) -> BTreeSet<EntityKey>;

    /// Whether an event version is selected.
    fn is_selected(&self, key: &EntityKey) -> bool {
        self.selection().contains(key)
    }

    /// Add event versions to the selection.
    fn add_to_selection(&mut self, keys: &BTreeSet<EntityKey>, originator: Originator);

    /// Remove event versions from the selection.
    fn remove_from_selection(&mut self, keys: &BTreeSet<EntityKey>, originator: Originator);

    /// Replace the selection wholesale.
    fn set_selection(&mut self, keys: BTreeSet<EntityKey>, originator: Originator);

    /// Whether the end time is picked from a list of durations.
    fn has_duration_choices(&self, event: &HazardEvent) -> bool;

    /// Whether the hazard type permits "until further notice".
    fn allows_until_further_notice(&self, event: &HazardEvent) -> bool;

    /// Allowed values for the start time.
    fn start_time_boundaries(&self, event: &HazardEvent) -> TimeRange;

    /// Allowed values for the end time.
    fn end_time_boundaries(&self, event: &HazardEvent) -> TimeRange;

    /// Display color.
    fn color_for(&self, event: &HazardEvent) -> Color;

    /// Edit granularity.
    fn time_resolution_for(&self, event: &HazardEvent) -> TimeResolution;
}
