//! In-memory event store.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::{ChangeOutcome, EventFilter, EventStore, LockStatus, Originator, PropertyChange};
use crate::data::{
    CellValue, Color, EventStatus, HazardEvent, TimeRange, TimeResolution,
    UNTIL_FURTHER_NOTICE_ATTRIBUTE, UNTIL_FURTHER_NOTICE_TIME,
};
use crate::entity::EntityKey;
use crate::notification::{ConsoleNotification, ModificationKind};

/// Per hazard type display and editing rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HazardTypeSettings {
    /// Row color.
    pub color: Color,
    /// Edit granularity.
    pub time_resolution: TimeResolution,
    /// Whether the end time is picked from a list of durations.
    pub duration_choices: bool,
    /// Whether "until further notice" is permitted.
    pub allow_until_further_notice: bool,
    /// Duration restored when "until further notice" is switched off
    /// without a remembered end time.
    pub default_duration: i64,
}

impl Default for HazardTypeSettings {
    fn default() -> Self {
        Self {
            color: Color::rgb(190, 190, 190),
            time_resolution: TimeResolution::Minutes,
            duration_choices: false,
            allow_until_further_notice: false,
            default_duration: 3_600_000,
        }
    }
}

/// Event store that keeps everything in memory and queues a
/// [`ConsoleNotification`] for every change it accepts.
#[derive(Debug)]
pub struct InMemoryEventStore {
    /// Current versions in canonical order.
    events: Vec<HazardEvent>,
    /// Persisted versions per event, oldest first.
    histories: HashMap<String, Vec<HazardEvent>>,
    filter: EventFilter,
    locks: HashMap<String, LockStatus>,
    checked: HashSet<String>,
    selection: BTreeSet<EntityKey>,
    type_settings: HashMap<String, HazardTypeSettings>,
    default_type_settings: HazardTypeSettings,
    /// Outer limits for any start or end time.
    time_limits: TimeRange,
    /// End times remembered while an event runs until further notice.
    ends_before_until_further_notice: HashMap<String, i64>,
    notifications: Vec<ConsoleNotification>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            histories: HashMap::new(),
            filter: EventFilter::default(),
            locks: HashMap::new(),
            checked: HashSet::new(),
            selection: BTreeSet::new(),
            type_settings: HashMap::new(),
            default_type_settings: HazardTypeSettings::default(),
            time_limits: TimeRange::new(0, UNTIL_FURTHER_NOTICE_TIME - 1),
            ends_before_until_further_notice: HashMap::new(),
            notifications: Vec::new(),
        }
    }

    /// Take every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<ConsoleNotification> {
        std::mem::take(&mut self.notifications)
    }

    /// Current filter.
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Replace the filter.
    pub fn set_filter(&mut self, filter: EventFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.notifications.push(ConsoleNotification::FiltersChanged);
        }
    }

    /// Set the rules for one hazard type.
    pub fn set_type_settings(&mut self, hazard_type: impl Into<String>, settings: HazardTypeSettings) {
        self.type_settings.insert(hazard_type.into(), settings);
    }

    /// Restrict start and end times to the given limits.
    pub fn set_time_limits(&mut self, limits: TimeRange) {
        self.time_limits = limits;
    }

    /// Add an event, or update it if the identifier is already known.
    pub fn insert_event(&mut self, event: HazardEvent) {
        if self.position(&event.event_id).is_some() {
            self.update_event(event, Originator::Session);
            return;
        }
        let identifier = event.event_id.clone();
        self.events.push(event);
        self.notifications
            .push(ConsoleNotification::EventAdded { identifier });
    }

    /// Replace the current version of an event.
    pub fn update_event(&mut self, event: HazardEvent, originator: Originator) {
        let Some(position) = self.position(&event.event_id) else {
            self.insert_event(event);
            return;
        };
        let modifications = Self::modifications_between(&self.events[position], &event);
        if modifications.is_empty() {
            return;
        }
        let identifier = event.event_id.clone();
        self.events[position] = event;
        self.notifications.push(ConsoleNotification::EventModified {
            identifier,
            modifications,
            originator,
        });
    }

    /// Delete an event with its history, lock, checkbox and selection.
    pub fn remove_event(&mut self, identifier: &str) {
        let Some(position) = self.position(identifier) else {
            return;
        };
        self.events.remove(position);
        self.histories.remove(identifier);
        self.locks.remove(identifier);
        self.checked.remove(identifier);
        self.ends_before_until_further_notice.remove(identifier);
        self.selection.retain(|key| key.identifier != identifier);
        self.notifications.push(ConsoleNotification::EventRemoved {
            identifier: identifier.to_string(),
        });
    }

    /// Persist the current version of an event at `at`, appending it to the history.
    pub fn persist_event(&mut self, identifier: &str, at: i64) -> bool {
        let Some(position) = self.position(identifier) else {
            return false;
        };
        let current = &mut self.events[position];
        current.modified = false;
        let mut version = current.clone();
        version.insert_time = Some(at);
        self.histories
            .entry(identifier.to_string())
            .or_default()
            .push(version);
        self.notifications
            .push(ConsoleNotification::EventHistoryAppended {
                identifier: identifier.to_string(),
            });
        self.notifications.push(ConsoleNotification::EventModified {
            identifier: identifier.to_string(),
            modifications: vec![ModificationKind::Status],
            originator: Originator::Session,
        });
        true
    }

    /// Change the lock held on an event.
    pub fn set_lock_status(&mut self, identifier: &str, status: LockStatus) {
        if self.lock_status(identifier) == status {
            return;
        }
        match status {
            LockStatus::Unlocked => {
                self.locks.remove(identifier);
            },
            status => {
                self.locks.insert(identifier.to_string(), status);
            },
        }
        self.notifications
            .push(ConsoleNotification::LockStatusChanged {
                identifiers: vec![identifier.to_string()],
            });
    }

    fn position(&self, identifier: &str) -> Option<usize> {
        self.events
            .iter()
            .position(|event| event.event_id == identifier)
    }

    fn type_settings_for(&self, event: &HazardEvent) -> &HazardTypeSettings {
        event
            .hazard_type()
            .and_then(|hazard_type| self.type_settings.get(&hazard_type))
            .unwrap_or(&self.default_type_settings)
    }

    fn modifications_between(old: &HazardEvent, new: &HazardEvent) -> Vec<ModificationKind> {
        let mut modifications = Vec::new();
        if old.status != new.status || old.modified != new.modified {
            modifications.push(ModificationKind::Status);
        }
        if old.time_range() != new.time_range() {
            modifications.push(ModificationKind::TimeRange);
        }
        if old.hazard_type() != new.hazard_type() {
            modifications.push(ModificationKind::Type);
        }
        if old.attributes != new.attributes
            || old.display_event_id != new.display_event_id
            || old.site_id != new.site_id
            || old.workstation != new.workstation
            || old.user_name != new.user_name
            || old.creation_time != new.creation_time
        {
            modifications.push(ModificationKind::Attributes);
        }
        modifications
    }

    fn selection_changed(&mut self, keys: BTreeSet<EntityKey>, originator: Originator) {
        if !keys.is_empty() {
            self.notifications
                .push(ConsoleNotification::SelectionChanged { keys, originator });
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for InMemoryEventStore {
    fn events_for_current_settings(&self) -> Vec<HazardEvent> {
        self.events
            .iter()
            .filter(|event| self.filter.matches(event))
            .cloned()
            .collect()
    }

    fn matches_current_settings(&self, event: &HazardEvent) -> bool {
        self.filter.matches(event)
    }

    fn event_by_id(&self, identifier: &str) -> Option<HazardEvent> {
        self.position(identifier)
            .map(|position| self.events[position].clone())
    }

    fn event_history_by_id(&self, identifier: &str) -> Option<Vec<HazardEvent>> {
        self.histories.get(identifier).cloned()
    }

    fn historical_version_count(&self, identifier: &str) -> usize {
        self.histories.get(identifier).map_or(0, Vec::len)
    }

    fn change_event_property(
        &mut self,
        identifier: &str,
        change: PropertyChange,
        originator: Originator,
    ) -> ChangeOutcome {
        let Some(position) = self.position(identifier) else {
            return ChangeOutcome::Rejected;
        };
        if self.lock_status(identifier).is_locked_by_other() {
            tracing::debug!("Refusing change to {}: locked elsewhere", identifier);
            return ChangeOutcome::Rejected;
        }
        let event = &self.events[position];
        if event.status.is_finished() {
            return ChangeOutcome::Rejected;
        }

        let modifications = match change {
            PropertyChange::TimeRange(range) => {
                let end_limits = if event.is_until_further_notice() {
                    TimeRange::point(UNTIL_FURTHER_NOTICE_TIME)
                } else {
                    TimeRange::new(range.start, self.time_limits.end)
                };
                if !range.is_ordered()
                    || !self.start_time_boundaries(event).contains(range.start)
                    || !end_limits.contains(range.end)
                {
                    return ChangeOutcome::Rejected;
                }
                if range == event.time_range() {
                    return ChangeOutcome::Success;
                }
                let event = &mut self.events[position];
                event.start_time = range.start;
                event.end_time = range.end;
                vec![ModificationKind::TimeRange]
            },
            PropertyChange::UntilFurtherNotice(until_further_notice) => {
                if until_further_notice == event.is_until_further_notice() {
                    return ChangeOutcome::Success;
                }
                if until_further_notice
                    && (!self.allows_until_further_notice(event)
                        || event.status.is_ending_or_finished())
                {
                    return ChangeOutcome::Rejected;
                }
                let default_duration = self.type_settings_for(event).default_duration;
                let event = &mut self.events[position];
                if until_further_notice {
                    self.ends_before_until_further_notice
                        .insert(identifier.to_string(), event.end_time);
                    event.end_time = UNTIL_FURTHER_NOTICE_TIME;
                } else {
                    let fallback_end = event.start_time.saturating_add(default_duration);
                    event.end_time = self
                        .ends_before_until_further_notice
                        .remove(identifier)
                        .unwrap_or(fallback_end);
                }
                event.attributes.insert(
                    UNTIL_FURTHER_NOTICE_ATTRIBUTE.to_string(),
                    CellValue::Boolean(until_further_notice),
                );
                vec![ModificationKind::Attributes, ModificationKind::TimeRange]
            },
        };

        let event = &mut self.events[position];
        if event.status == EventStatus::Issued {
            event.modified = true;
        }
        self.notifications.push(ConsoleNotification::EventModified {
            identifier: identifier.to_string(),
            modifications,
            originator,
        });
        ChangeOutcome::Success
    }

    fn set_event_checked(&mut self, identifier: &str, checked: bool, originator: Originator) {
        let changed = if checked {
            self.checked.insert(identifier.to_string())
        } else {
            self.checked.remove(identifier)
        };
        if changed {
            self.notifications.push(ConsoleNotification::CheckedChanged {
                identifier: identifier.to_string(),
                originator,
            });
        }
    }

    fn is_event_checked(&self, identifier: &str) -> bool {
        self.checked.contains(identifier)
    }

    fn lock_status(&self, identifier: &str) -> LockStatus {
        self.locks.get(identifier).cloned().unwrap_or_default()
    }

    fn selection(&self) -> BTreeSet<EntityKey> {
        self.selection.clone()
    }

    fn is_selected(&self, key: &EntityKey) -> bool {
        self.selection.contains(key)
    }

    fn add_to_selection(&mut self, keys: &BTreeSet<EntityKey>, originator: Originator) {
        let added: BTreeSet<EntityKey> = keys
            .iter()
            .filter(|key| self.selection.insert((*key).clone()))
            .cloned()
            .collect();
        self.selection_changed(added, originator);
    }

    fn remove_from_selection(&mut self, keys: &BTreeSet<EntityKey>, originator: Originator) {
        let removed: BTreeSet<EntityKey> = keys
            .iter()
            .filter(|key| self.selection.remove(*key))
            .cloned()
            .collect();
        self.selection_changed(removed, originator);
    }

    fn set_selection(&mut self, keys: BTreeSet<EntityKey>, originator: Originator) {
        let flipped: BTreeSet<EntityKey> = self
            .selection
            .symmetric_difference(&keys)
            .cloned()
            .collect();
        self.selection = keys;
        self.selection_changed(flipped, originator);
    }

    fn has_duration_choices(&self, event: &HazardEvent) -> bool {
        self.type_settings_for(event).duration_choices
    }

    fn allows_until_further_notice(&self, event: &HazardEvent) -> bool {
        self.type_settings_for(event).allow_until_further_notice
    }

    fn start_time_boundaries(&self, event: &HazardEvent) -> TimeRange {
        match event.status {
            EventStatus::Potential | EventStatus::Pending | EventStatus::Proposed => {
                self.time_limits
            },
            _ => TimeRange::point(event.start_time),
        }
    }

    fn end_time_boundaries(&self, event: &HazardEvent) -> TimeRange {
        if event.is_until_further_notice() {
            TimeRange::point(UNTIL_FURTHER_NOTICE_TIME)
        } else if event.status.is_finished() {
            TimeRange::point(event.end_time)
        } else {
            TimeRange::new(event.start_time, self.time_limits.end)
        }
    }

    fn color_for(&self, event: &HazardEvent) -> Color {
        self.type_settings_for(event).color
    }

    fn time_resolution_for(&self, event: &HazardEvent) -> TimeResolution {
        self.type_settings_for(event).time_resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(event: HazardEvent) -> InMemoryEventStore {
        let mut store = InMemoryEventStore::new();
        store.insert_event(event);
        store.drain_notifications();
        store
    }

    #[test]
    fn time_range_change_is_refused_when_locked_elsewhere() {
        let mut store = store_with(HazardEvent::new("E1", 100, 200));
        store.set_lock_status(
            "E1",
            LockStatus::LockedByOther {
                workstation: "ws2".to_string(),
                user_name: "other".to_string(),
            },
        );

        let outcome = store.change_event_property(
            "E1",
            PropertyChange::TimeRange(TimeRange::new(120, 220)),
            Originator::Console,
        );

        assert_eq!(outcome, ChangeOutcome::Rejected);
        assert_eq!(store.event_by_id("E1").unwrap().time_range(), TimeRange::new(100, 200));
    }

    #[test]
    fn accepted_time_range_change_marks_issued_events_modified() {
        let mut store =
            store_with(HazardEvent::new("E1", 100, 200).with_status(EventStatus::Issued));

        let outcome = store.change_event_property(
            "E1",
            PropertyChange::TimeRange(TimeRange::new(100, 260)),
            Originator::Console,
        );

        assert_eq!(outcome, ChangeOutcome::Success);
        let event = store.event_by_id("E1").unwrap();
        assert_eq!(event.end_time, 260);
        assert!(event.modified);
        assert_eq!(
            store.drain_notifications(),
            vec![ConsoleNotification::EventModified {
                identifier: "E1".to_string(),
                modifications: vec![ModificationKind::TimeRange],
                originator: Originator::Console,
            }]
        );
    }

    #[test]
    fn issued_start_time_cannot_move() {
        let mut store =
            store_with(HazardEvent::new("E1", 100, 200).with_status(EventStatus::Issued));
        let outcome = store.change_event_property(
            "E1",
            PropertyChange::TimeRange(TimeRange::new(150, 200)),
            Originator::Console,
        );
        assert!(outcome.is_rejected());
    }

    #[test]
    fn until_further_notice_round_trips_end_time() {
        let mut store = store_with(HazardEvent::new("E1", 100, 200).with_type("FF", Some("W"), None));
        store.set_type_settings(
            "FF.W",
            HazardTypeSettings {
                allow_until_further_notice: true,
                ..HazardTypeSettings::default()
            },
        );

        let on = store.change_event_property(
            "E1",
            PropertyChange::UntilFurtherNotice(true),
            Originator::Console,
        );
        assert_eq!(on, ChangeOutcome::Success);
        assert_eq!(store.event_by_id("E1").unwrap().end_time, UNTIL_FURTHER_NOTICE_TIME);

        let off = store.change_event_property(
            "E1",
            PropertyChange::UntilFurtherNotice(false),
            Originator::Console,
        );
        assert_eq!(off, ChangeOutcome::Success);
        let event = store.event_by_id("E1").unwrap();
        assert_eq!(event.end_time, 200);
        assert!(!event.is_until_further_notice());
    }

    #[test]
    fn until_further_notice_refused_when_type_disallows_it() {
        let mut store = store_with(HazardEvent::new("E1", 100, 200));
        let outcome = store.change_event_property(
            "E1",
            PropertyChange::UntilFurtherNotice(true),
            Originator::Console,
        );
        assert!(outcome.is_rejected());
    }

    #[test]
    fn persisting_appends_history_oldest_first() {
        let mut store = store_with(HazardEvent::new("E1", 100, 200));
        assert!(store.persist_event("E1", 1_000));
        assert!(store.persist_event("E1", 2_000));

        let history = store.event_history_by_id("E1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].insert_time, Some(1_000));
        assert_eq!(history[1].insert_time, Some(2_000));
        assert_eq!(store.historical_version_count("E1"), 2);
    }

    #[test]
    fn set_selection_reports_flipped_keys() {
        let mut store = store_with(HazardEvent::new("E1", 100, 200));
        store.add_to_selection(
            &[EntityKey::current("E1")].into_iter().collect(),
            Originator::Session,
        );
        store.drain_notifications();

        store.set_selection(
            [EntityKey::historical("E1", 0)].into_iter().collect(),
            Originator::Console,
        );

        let expected: BTreeSet<EntityKey> = [EntityKey::current("E1"), EntityKey::historical("E1", 0)]
            .into_iter()
            .collect();
        assert_eq!(
            store.drain_notifications(),
            vec![ConsoleNotification::SelectionChanged {
                keys: expected,
                originator: Originator::Console,
            }]
        );
    }
}
