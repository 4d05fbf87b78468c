//! Scripted replay of store changes and user edits.
//!
//! A scenario file describes an initial store and a list of steps. Each step
//! changes the store (as another part of the session would), changes the
//! console configuration, or edits rows (as the user would). Store
//! notifications raised by a step are fed to the manager before the next step.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::columns::Sort;
use crate::config::ConsoleSettings;
use crate::data::{CountdownTimer, HazardEvent, TimeRange};
use crate::entity::{EntityKey, TabularEntity};
use crate::error::{ConsoleError, Result};
use crate::manager::{RecordingView, TabularEntityManager, TimeRangeChannel, ViewOperation};
use crate::notification::ConsoleNotification;
use crate::store::{EventFilter, EventStore, HazardTypeSettings, InMemoryEventStore, LockStatus, Originator};

/// Manager type driven by a replay.
pub type ReplayManager = TabularEntityManager<InMemoryEventStore, RecordingView>;

/// An event in the initial store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioEvent {
    /// Current version.
    #[serde(flatten)]
    pub event: HazardEvent,
    /// Instants at which the current version was persisted, oldest first.
    #[serde(default)]
    pub persisted_at: Vec<i64>,
}

/// A user edit of one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowEdit {
    /// Event identifier.
    pub identifier: String,
    /// Submit a historical version instead of the root. Always refused.
    pub history_index: Option<usize>,
    /// New valid period.
    pub time_range: Option<TimeRange>,
    /// New "until further notice" state.
    pub until_further_notice: Option<bool>,
    /// New checkbox state.
    pub checked: Option<bool>,
    /// New selection state of the root row.
    pub selected: Option<bool>,
    /// New selection states of historical rows, by history index.
    pub selected_history: BTreeMap<usize, bool>,
}

/// One step of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum ScenarioStep {
    /// Create an event.
    Add {
        /// The new event.
        event: HazardEvent,
    },
    /// Replace an event's current version.
    Modify {
        /// The new current version.
        event: HazardEvent,
    },
    /// Delete an event.
    Remove {
        /// Event identifier.
        identifier: String,
    },
    /// Persist an event's current version.
    Persist {
        /// Event identifier.
        identifier: String,
        /// Persist instant.
        at: i64,
    },
    /// Take or release a lock.
    Lock {
        /// Event identifier.
        identifier: String,
        /// New lock.
        status: LockStatus,
    },
    /// Replace the selection from outside the console.
    Select {
        /// Selected versions.
        keys: Vec<EntityKey>,
    },
    /// Change the active sorts.
    Sort {
        /// New sorts.
        sorts: Vec<Sort>,
    },
    /// Show or hide history rows.
    ShowHistory {
        /// Whether history rows are shown.
        show: bool,
    },
    /// Resize a column in the console.
    Resize {
        /// Column name.
        column: String,
        /// New width in pixels.
        width: u32,
    },
    /// Edit rows as the user would.
    Edit {
        /// Edited rows, submitted together.
        rows: Vec<RowEdit>,
    },
    /// Replace the running countdown timers.
    Timers {
        /// Timers by event identifier.
        timers: HashMap<String, CountdownTimer>,
    },
    /// Change the event filter.
    Filter {
        /// New filter.
        filter: EventFilter,
    },
    /// Rebuild every row.
    Recreate,
    /// Move the visible time range of the ruler.
    VisibleTimeRange {
        /// Ranges pushed at once; only one is allowed.
        ranges: Vec<TimeRange>,
    },
    /// Advance the clock used for countdown cells.
    Clock {
        /// New time in epoch milliseconds.
        now: i64,
    },
}

impl ScenarioStep {
    /// Short name of the step.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Modify { .. } => "modify",
            Self::Remove { .. } => "remove",
            Self::Persist { .. } => "persist",
            Self::Lock { .. } => "lock",
            Self::Select { .. } => "select",
            Self::Sort { .. } => "sort",
            Self::ShowHistory { .. } => "showHistory",
            Self::Resize { .. } => "resize",
            Self::Edit { .. } => "edit",
            Self::Timers { .. } => "timers",
            Self::Filter { .. } => "filter",
            Self::Recreate => "recreate",
            Self::VisibleTimeRange { .. } => "visibleTimeRange",
            Self::Clock { .. } => "clock",
        }
    }
}

/// A scenario file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    /// Console settings.
    pub settings: ConsoleSettings,
    /// Clock used for countdown cells, in epoch milliseconds.
    pub now: i64,
    /// Outer limits for start and end times.
    pub time_limits: Option<TimeRange>,
    /// Rules per hazard type (`PHEN.SIG[.SUB]`).
    pub hazard_types: BTreeMap<String, HazardTypeSettings>,
    /// Initial events, in canonical order.
    pub events: Vec<ScenarioEvent>,
    /// Initial locks.
    pub locks: BTreeMap<String, LockStatus>,
    /// Steps to replay.
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Parse a scenario from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ConsoleError::file_open(path.to_path_buf(), e))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Replays a scenario against an in-memory store and a recording view.
#[derive(Debug)]
pub struct ScenarioReplay {
    manager: ReplayManager,
    settings: ConsoleSettings,
    visible_time_range: TimeRangeChannel,
    now: i64,
}

impl ScenarioReplay {
    /// Build the initial store and rows. `show_history` overrides the
    /// settings when given.
    pub fn new(scenario: &Scenario, show_history: Option<bool>) -> Result<Self> {
        let mut settings = scenario.settings.clone();
        if let Some(show_history) = show_history {
            settings.show_history_list = show_history;
        }

        let mut store = InMemoryEventStore::new();
        if let Some(limits) = scenario.time_limits {
            store.set_time_limits(limits);
        }
        for (hazard_type, type_settings) in &scenario.hazard_types {
            store.set_type_settings(hazard_type.clone(), type_settings.clone());
        }
        for scenario_event in &scenario.events {
            store.insert_event(scenario_event.event.clone());
            for at in &scenario_event.persisted_at {
                store.persist_event(&scenario_event.event.event_id, *at);
            }
        }
        for (identifier, status) in &scenario.locks {
            store.set_lock_status(identifier, status.clone());
        }
        store.set_filter(settings.filter.clone());
        store.drain_notifications();

        let mut manager = TabularEntityManager::with_settings(store, RecordingView::new(), &settings)?;
        manager.recreate_all_entities();
        tracing::info!("Replay starting with {} rows", manager.root_entities().len());

        Ok(Self {
            manager,
            settings,
            visible_time_range: TimeRangeChannel::new("visibleTimeRange"),
            now: scenario.now,
        })
    }

    /// Run every step, returning the view operations of each.
    pub fn run(&mut self, steps: &[ScenarioStep]) -> Result<Vec<Vec<ViewOperation>>> {
        steps.iter().map(|step| self.run_step(step)).collect()
    }

    /// Run one step and feed the resulting notifications to the manager.
    /// Returns the view operations the step caused.
    pub fn run_step(&mut self, step: &ScenarioStep) -> Result<Vec<ViewOperation>> {
        tracing::debug!("Step {}", step.name());
        self.manager.view_mut().take_operations();
        let mut notifications = Vec::new();

        match step {
            ScenarioStep::Add { event } => self.manager.store_mut().insert_event(event.clone()),
            ScenarioStep::Modify { event } => self
                .manager
                .store_mut()
                .update_event(event.clone(), Originator::Session),
            ScenarioStep::Remove { identifier } => self.manager.store_mut().remove_event(identifier),
            ScenarioStep::Persist { identifier, at } => {
                if !self.manager.store_mut().persist_event(identifier, *at) {
                    return Err(ConsoleError::missing_event(identifier));
                }
            },
            ScenarioStep::Lock { identifier, status } => self
                .manager
                .store_mut()
                .set_lock_status(identifier, status.clone()),
            ScenarioStep::Select { keys } => self
                .manager
                .store_mut()
                .set_selection(keys.iter().cloned().collect(), Originator::Session),
            ScenarioStep::Sort { sorts } => {
                notifications.push(ConsoleNotification::SortsChanged(sorts.clone()));
            },
            ScenarioStep::ShowHistory { show } => {
                notifications.push(ConsoleNotification::ShowHistoryChanged(*show));
            },
            ScenarioStep::Resize { column, width } => {
                let columns = self.manager.columns().with_column_width(column, *width);
                if self.settings.apply_console_columns(&columns) {
                    notifications.push(ConsoleNotification::ColumnsChanged(columns));
                }
            },
            ScenarioStep::Edit { rows } => {
                let edited = rows
                    .iter()
                    .map(|edit| self.edited_entity(edit))
                    .collect::<Result<Vec<_>>>()?;
                self.manager.handle_user_changes_to_entities(&edited)?;
            },
            ScenarioStep::Timers { timers } => {
                notifications.push(ConsoleNotification::CountdownTimersChanged(timers.clone()));
            },
            ScenarioStep::Filter { filter } => {
                self.settings.filter = filter.clone();
                self.manager.store_mut().set_filter(filter.clone());
            },
            ScenarioStep::Recreate => self.manager.recreate_all_entities(),
            ScenarioStep::VisibleTimeRange { ranges } => {
                self.visible_time_range.set_states(ranges)?;
            },
            ScenarioStep::Clock { now } => self.now = *now,
        }

        notifications.extend(self.manager.store_mut().drain_notifications());
        for notification in notifications {
            self.manager.handle_notification(notification)?;
        }
        Ok(self.manager.view_mut().take_operations())
    }

    /// Copy of the live entity for `edit` with the edit applied.
    fn edited_entity(&self, edit: &RowEdit) -> Result<TabularEntity> {
        let key = EntityKey {
            identifier: edit.identifier.clone(),
            history_index: edit.history_index,
        };
        let mut entity = self
            .manager
            .entity(&key)
            .map(|entity| entity.as_ref().clone())
            .ok_or_else(|| ConsoleError::missing_event(&edit.identifier))?;

        if let Some(time_range) = edit.time_range {
            entity.time_range = time_range;
        }
        if let Some(until_further_notice) = edit.until_further_notice {
            entity.end_time_until_further_notice = until_further_notice;
        }
        if let Some(checked) = edit.checked {
            entity.checked = checked;
        }
        if let Some(selected) = edit.selected {
            entity.selected = selected;
        }
        for child in &mut entity.children {
            let selected = child
                .history_index
                .and_then(|history_index| edit.selected_history.get(&history_index));
            if let Some(selected) = selected {
                let mut edited_child = child.as_ref().clone();
                edited_child.selected = *selected;
                *child = std::rc::Rc::new(edited_child);
            }
        }
        Ok(entity)
    }

    /// The manager being driven.
    pub fn manager(&self) -> &ReplayManager {
        &self.manager
    }

    /// Settings, including changes made during the replay.
    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    /// Visible time range of the ruler, if one was set.
    pub fn visible_time_range(&self) -> Option<TimeRange> {
        self.visible_time_range.state()
    }

    /// Current clock.
    pub fn now(&self) -> i64 {
        self.now
    }

    /// Identifiers of the rows in display order.
    pub fn row_identifiers(&self) -> Vec<&str> {
        self.manager.view().row_identifiers()
    }

    /// Selected versions in the store.
    pub fn selection(&self) -> Vec<EntityKey> {
        self.manager.store().selection().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "settings": {
            "sorts": [{"attributeIdentifier": "hazardType", "direction": "ascending", "priority": 1}]
        },
        "events": [
            {"eventId": "E1", "startTime": 100, "endTime": 200, "status": "ISSUED", "phenomenon": "FF", "significance": "W", "persistedAt": [50]},
            {"eventId": "E2", "startTime": 150, "endTime": 250, "phenomenon": "FL", "significance": "W"}
        ],
        "steps": [
            {"action": "add", "event": {"eventId": "E3", "startTime": 120, "endTime": 220, "phenomenon": "FF", "significance": "W"}},
            {"action": "edit", "rows": [{"identifier": "E2", "checked": true}]},
            {"action": "remove", "identifier": "E1"}
        ]
    }"#;

    #[test]
    fn replay_applies_steps_in_order() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        let mut replay = ScenarioReplay::new(&scenario, None).unwrap();
        assert_eq!(replay.row_identifiers(), vec!["E1", "E2"]);

        let operations = replay.run(&scenario.steps).unwrap();

        assert_eq!(
            operations[0],
            vec![ViewOperation::Insert {
                index: 1,
                identifier: "E3".to_string()
            }]
        );
        assert!(operations[1].is_empty());
        assert_eq!(operations[2], vec![ViewOperation::Remove { index: 0 }]);
        assert_eq!(replay.row_identifiers(), vec!["E3", "E2"]);
        assert!(replay.manager().store().is_event_checked("E2"));
    }

    #[test]
    fn initial_history_is_shown_on_request() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        let replay = ScenarioReplay::new(&scenario, Some(true)).unwrap();
        assert_eq!(replay.manager().root_entities()[0].children.len(), 1);
    }

    #[test]
    fn editing_an_unknown_event_is_an_error() {
        let scenario = Scenario::from_json_str(SCENARIO).unwrap();
        let mut replay = ScenarioReplay::new(&scenario, None).unwrap();
        let result = replay.run_step(&ScenarioStep::Edit {
            rows: vec![RowEdit {
                identifier: "E9".to_string(),
                ..RowEdit::default()
            }],
        });
        assert!(matches!(result, Err(ConsoleError::MissingEvent { .. })));
    }

    #[test]
    fn bulk_time_ranges_are_refused() {
        let scenario = Scenario::default();
        let mut replay = ScenarioReplay::new(&scenario, None).unwrap();
        let result = replay.run_step(&ScenarioStep::VisibleTimeRange {
            ranges: vec![TimeRange::new(0, 1), TimeRange::new(2, 3)],
        });
        assert!(matches!(result, Err(ConsoleError::UnsupportedBulkChange { .. })));
    }

    #[test]
    fn resizing_updates_settings_and_columns() {
        let scenario = Scenario::default();
        let mut replay = ScenarioReplay::new(&scenario, None).unwrap();
        replay
            .run_step(&ScenarioStep::Resize {
                column: "Headline".to_string(),
                width: 320,
            })
            .unwrap();
        assert_eq!(replay.settings().columns["Headline"].width, Some(320));
        assert_eq!(
            replay.manager().columns().definition("Headline").unwrap().width,
            Some(320)
        );
    }
}
