//! Table row entities.
//!
//! A [`TabularEntity`] is an immutable snapshot of one version of a hazard
//! event, either the current version (a root row) or a persisted historical
//! version (a child row). Entities are shared through [`Rc`] so that a rebuild
//! which changes nothing hands back the very same allocation.

mod builder;
mod property;

pub use builder::{build_entity, EntityBuilder};
pub use property::{EntityProperty, PropertySource};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::data::{CellValue, Color, TimeRange, TimeResolution};

/// Identifies one version of one event: the current version when
/// `history_index` is `None`, otherwise a persisted version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    /// Event identifier.
    pub identifier: String,
    /// Position in the event's history, oldest first.
    #[serde(default)]
    pub history_index: Option<usize>,
}

impl EntityKey {
    /// Key of the current version of an event.
    pub fn current(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            history_index: None,
        }
    }

    /// Key of a persisted version of an event.
    pub fn historical(identifier: impl Into<String>, history_index: usize) -> Self {
        Self {
            identifier: identifier.into(),
            history_index: Some(history_index),
        }
    }
}

/// One row of the console table.
///
/// Fields are public so a view can clone an entity, apply a user edit to the
/// clone and hand it back through
/// [`TabularEntityManager::handle_user_changes_to_entities`](crate::manager::TabularEntityManager::handle_user_changes_to_entities).
/// Entities held by the manager are never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularEntity {
    /// Event identifier, stable across versions.
    pub identifier: String,
    /// `None` for the current version, otherwise the position in the
    /// event's history (oldest first, so it never shifts when versions are appended).
    pub history_index: Option<usize>,
    /// Persist instant of a historical version.
    pub persisted_timestamp: Option<i64>,
    /// Whether the current version carries changes that still have to be issued.
    pub unsaved: bool,
    /// Valid period.
    pub time_range: TimeRange,
    /// Whether the end time is "until further notice".
    pub end_time_until_further_notice: bool,
    /// Whether moving one end must drag the other along.
    pub time_range_interval_locked: bool,
    /// Allowed values for the start time.
    pub lower_time_boundaries: TimeRange,
    /// Allowed values for the end time.
    pub upper_time_boundaries: TimeRange,
    /// Edit granularity.
    pub time_resolution: TimeResolution,
    /// Whether "until further notice" may currently be chosen.
    pub allow_until_further_notice: bool,
    /// Row color.
    pub color: Color,
    /// Whether the row is selected.
    pub selected: bool,
    /// Whether the row's checkbox is ticked.
    pub checked: bool,
    /// Cell values keyed by column identifier.
    pub attributes: BTreeMap<String, CellValue>,
    /// Historical versions, newest first. Empty unless history is shown.
    pub children: Vec<Rc<TabularEntity>>,
}

impl TabularEntity {
    pub(crate) fn empty(identifier: &str, history_index: Option<usize>) -> Self {
        Self {
            identifier: identifier.to_string(),
            history_index,
            persisted_timestamp: None,
            unsaved: false,
            time_range: TimeRange::point(0),
            end_time_until_further_notice: false,
            time_range_interval_locked: false,
            lower_time_boundaries: TimeRange::point(0),
            upper_time_boundaries: TimeRange::point(0),
            time_resolution: TimeResolution::default(),
            allow_until_further_notice: false,
            color: Color::default(),
            selected: false,
            checked: false,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Key identifying this version.
    pub fn key(&self) -> EntityKey {
        EntityKey {
            identifier: self.identifier.clone(),
            history_index: self.history_index,
        }
    }

    /// Whether this is a persisted (read-only) version.
    pub fn is_historical(&self) -> bool {
        self.history_index.is_some()
    }

    /// Cell value for a column identifier.
    pub fn attribute(&self, identifier: &str) -> Option<&CellValue> {
        self.attributes.get(identifier)
    }
}
