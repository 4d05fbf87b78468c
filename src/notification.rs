//! Change notifications delivered to the console.
//!
//! The transport that carries these (a session event bus) lives outside this
//! crate. It hands each notification, in arrival order, to
//! [`TabularEntityManager::handle_notification`](crate::manager::TabularEntityManager::handle_notification).

use std::collections::{BTreeSet, HashMap};

use crate::columns::{ConsoleColumns, Sort};
use crate::data::CountdownTimer;
use crate::entity::EntityKey;
use crate::store::Originator;

/// Kind of modification made to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModificationKind {
    /// Status changed.
    Status,
    /// Start or end time changed.
    TimeRange,
    /// Phenomenon, significance or subtype changed.
    Type,
    /// Free-form attributes changed.
    Attributes,
    /// Area changed; nothing the console shows.
    Geometry,
}

impl ModificationKind {
    /// Whether a modification of this kind made by the console itself is
    /// skipped, because the console already reconciled it when the user edited.
    pub fn requires_originator_check(self) -> bool {
        match self {
            Self::TimeRange | Self::Attributes | Self::Geometry => true,
            Self::Status | Self::Type => false,
        }
    }
}

/// Something changed outside the console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleNotification {
    /// An event was created.
    EventAdded {
        /// Event identifier.
        identifier: String,
    },
    /// An event was deleted.
    EventRemoved {
        /// Event identifier.
        identifier: String,
    },
    /// An event's current version changed.
    EventModified {
        /// Event identifier.
        identifier: String,
        /// What changed.
        modifications: Vec<ModificationKind>,
        /// Who changed it.
        originator: Originator,
    },
    /// A version of an event was persisted.
    EventHistoryAppended {
        /// Event identifier.
        identifier: String,
    },
    /// The selection changed.
    SelectionChanged {
        /// Versions whose selection state flipped.
        keys: BTreeSet<EntityKey>,
        /// Who changed it.
        originator: Originator,
    },
    /// An event's checkbox changed.
    CheckedChanged {
        /// Event identifier.
        identifier: String,
        /// Who changed it.
        originator: Originator,
    },
    /// Locks were taken or released.
    LockStatusChanged {
        /// Affected events.
        identifiers: Vec<String>,
    },
    /// The event filters changed.
    FiltersChanged,
    /// The column configuration changed.
    ColumnsChanged(ConsoleColumns),
    /// The sort configuration changed.
    SortsChanged(Vec<Sort>),
    /// History rows were shown or hidden.
    ShowHistoryChanged(bool),
    /// The set of running countdown timers changed.
    CountdownTimersChanged(HashMap<String, CountdownTimer>),
}

impl ConsoleNotification {
    /// Whether a modification notification only echoes an edit the console
    /// already reconciled.
    pub fn is_own_echo(&self) -> bool {
        match self {
            Self::EventModified {
                modifications,
                originator,
                ..
            } => {
                *originator == Originator::Console
                    && modifications
                        .iter()
                        .all(|kind| kind.requires_originator_check())
            },
            Self::SelectionChanged { originator, .. } | Self::CheckedChanged { originator, .. } => {
                *originator == Originator::Console
            },
            _ => false,
        }
    }
}
