//! Routing of change notifications to manager operations.

use std::collections::{BTreeMap, BTreeSet};

use super::{ConsoleView, TabularEntityManager};
use crate::error::Result;
use crate::notification::ConsoleNotification;
use crate::store::EventStore;

impl<S: EventStore, V: ConsoleView> TabularEntityManager<S, V> {
    /// Apply one change notification. Notifications must be handed over in
    /// the order they were raised.
    ///
    /// Echoes of edits the console made itself are skipped. Only an invalid
    /// sort configuration produces an error.
    pub fn handle_notification(&mut self, notification: ConsoleNotification) -> Result<()> {
        if notification.is_own_echo() {
            tracing::debug!("Skipping echo of console change: {:?}", notification);
            return Ok(());
        }

        match notification {
            ConsoleNotification::EventAdded { identifier } => match self.store.event_by_id(&identifier) {
                Some(event) => self.add_entities_for_event(&event),
                None => tracing::warn!("Added event {} is not in the store", identifier),
            },
            ConsoleNotification::EventRemoved { identifier } => {
                self.remove_entities_for_event(&identifier);
            },
            ConsoleNotification::EventModified { identifier, .. } => {
                self.event_modified(&identifier);
            },
            ConsoleNotification::EventHistoryAppended { identifier } => {
                if let Some(event) = self.store.event_by_id(&identifier) {
                    self.update_child_entity_list_for_event(&event);
                }
            },
            ConsoleNotification::SelectionChanged { keys, .. } => {
                let mut historical_indices_for_identifiers: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
                for key in keys {
                    let indices = historical_indices_for_identifiers
                        .entry(key.identifier)
                        .or_default();
                    if let Some(history_index) = key.history_index {
                        indices.insert(history_index);
                    }
                }
                for (identifier, historical_indices) in historical_indices_for_identifiers {
                    if self.index_of(&identifier).is_none() {
                        continue;
                    }
                    if let Some(event) = self.store.event_by_id(&identifier) {
                        self.replace_entities_for_event(&event, &historical_indices);
                    }
                }
            },
            ConsoleNotification::CheckedChanged { identifier, .. } => {
                self.refresh_tracked(&identifier);
            },
            ConsoleNotification::LockStatusChanged { identifiers } => {
                for identifier in identifiers {
                    self.refresh_tracked(&identifier);
                }
            },
            ConsoleNotification::FiltersChanged => self.recreate_all_entities(),
            ConsoleNotification::ColumnsChanged(columns) => self.set_columns(columns),
            ConsoleNotification::SortsChanged(sorts) => self.set_sorts(sorts)?,
            ConsoleNotification::ShowHistoryChanged(show_history_list) => {
                self.set_show_history_list(show_history_list);
            },
            ConsoleNotification::CountdownTimersChanged(countdown_timers) => {
                self.set_active_countdown_timers(countdown_timers);
            },
        }
        Ok(())
    }

    /// Rebuild after a change to an event's current version, moving the row
    /// if its sort values changed.
    fn event_modified(&mut self, identifier: &str) {
        let Some(event) = self.store.event_by_id(identifier) else {
            self.remove_entities_for_event(identifier);
            return;
        };
        self.replace_root_entity_for_event(&event);
        if let Some(index) = self.index_of(identifier) {
            if self.is_out_of_order(index) {
                self.sort_hazard_events();
            }
        }
    }

    // Lock and checkbox changes never add rows, but may move one when the
    // table is sorted on the lock status.
    fn refresh_tracked(&mut self, identifier: &str) {
        if self.index_of(identifier).is_none() {
            return;
        }
        if let Some(event) = self.store.event_by_id(identifier) {
            self.replace_root_entity_for_event(&event);
        }
        if let Some(index) = self.index_of(identifier) {
            if self.is_out_of_order(index) {
                self.sort_hazard_events();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{event, manager_with};
    use super::super::ViewOperation;
    use crate::columns::{Column, ConsoleColumns, Sort, SortDirection, SortPriority};
    use crate::data::TimeRange;
    use crate::entity::EntityKey;
    use crate::notification::ModificationKind;
    use crate::store::{ChangeOutcome, EventStore, LockStatus, Originator, PropertyChange};

    fn drain(manager: &mut super::super::tests::TestManager) {
        for notification in manager.store_mut().drain_notifications() {
            manager.handle_notification(notification).unwrap();
        }
    }

    #[test]
    fn added_and_removed_events_follow_the_store() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        manager.store_mut().insert_event(event("B", 0.0));
        drain(&mut manager);
        assert_eq!(manager.index_of("B"), Some(0));

        manager.store_mut().remove_event("A");
        drain(&mut manager);
        assert_eq!(manager.index_of("A"), None);
        assert_eq!(manager.root_entities().len(), 1);
    }

    #[test]
    fn modified_sort_value_moves_the_row() {
        let mut manager = manager_with(&[event("A", 1.0), event("B", 2.0)]);
        let changed = event("A", 3.0);
        manager
            .store_mut()
            .update_event(changed, Originator::Session);
        drain(&mut manager);

        assert_eq!(manager.index_of("B"), Some(0));
        assert_eq!(manager.index_of("A"), Some(1));
        assert!(matches!(
            manager.view().operations().last(),
            Some(ViewOperation::SetAll { .. })
        ));
    }

    #[test]
    fn console_time_range_echo_is_skipped() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        let outcome = manager.store_mut().change_event_property(
            "A",
            PropertyChange::TimeRange(TimeRange::new(100, 300)),
            Originator::Console,
        );
        assert_eq!(outcome, ChangeOutcome::Success);
        drain(&mut manager);

        assert!(manager.view().operations().is_empty());
        assert_eq!(manager.root_entities()[0].time_range, TimeRange::new(100, 200));
    }

    #[test]
    fn session_time_range_change_is_applied() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        manager.store_mut().change_event_property(
            "A",
            PropertyChange::TimeRange(TimeRange::new(100, 300)),
            Originator::Session,
        );
        drain(&mut manager);

        assert_eq!(manager.root_entities()[0].time_range, TimeRange::new(100, 300));
        assert_eq!(
            manager.view().operations(),
            &[ViewOperation::Replace {
                index: 0,
                identifier: "A".to_string()
            }]
        );
    }

    #[test]
    fn status_changes_are_applied_even_from_the_console() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        manager.handle_notification(crate::notification::ConsoleNotification::EventModified {
            identifier: "A".to_string(),
            modifications: vec![ModificationKind::Status],
            originator: Originator::Console,
        })
        .unwrap();
        // Nothing changed in the store, so the rebuild is a no-op.
        assert!(manager.view().operations().is_empty());
    }

    #[test]
    fn lock_and_selection_changes_refresh_rows() {
        let mut manager = manager_with(&[event("A", 1.0), event("B", 2.0)]);
        manager
            .store_mut()
            .set_lock_status("B", LockStatus::LockedByMe);
        manager.store_mut().add_to_selection(
            &[EntityKey::current("A")].into_iter().collect(),
            Originator::Session,
        );
        drain(&mut manager);

        assert!(manager.root_entities()[0].selected);
        assert!(manager.root_entities()[1]
            .attribute("lockStatus")
            .is_some());
        assert_eq!(manager.view().operations().len(), 2);
    }

    #[test]
    fn lock_change_moves_row_sorted_on_lock_status() {
        let mut manager = manager_with(&[event("A", 1.0), event("B", 2.0)]);
        let mut columns = super::super::tests::columns();
        columns.insert("Lock".to_string(), Column::new("lockStatus", "string"));
        manager.set_columns(ConsoleColumns::from_columns(&columns, vec!["Lock".to_string()]));
        manager
            .set_sorts(vec![Sort::new(
                "lockStatus",
                SortDirection::Descending,
                SortPriority::Primary,
            )])
            .unwrap();
        // Both unlocked: tied, so reversed canonical order.
        assert_eq!(manager.index_of("B"), Some(0));

        manager
            .store_mut()
            .set_lock_status("A", LockStatus::LockedByMe);
        drain(&mut manager);

        let incremental: Vec<String> = manager
            .root_entities()
            .iter()
            .map(|root| root.identifier.clone())
            .collect();
        manager.sort_hazard_events();
        let resorted: Vec<String> = manager
            .root_entities()
            .iter()
            .map(|root| root.identifier.clone())
            .collect();
        assert_eq!(incremental, vec!["A", "B"]);
        assert_eq!(incremental, resorted);
    }

    #[test]
    fn selecting_a_historical_version_rebuilds_that_child() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        manager.store_mut().persist_event("A", 1_000);
        manager.store_mut().persist_event("A", 2_000);
        drain(&mut manager);
        manager.set_show_history_list(true);
        let before = manager.root_entities()[0].children.clone();

        manager.store_mut().add_to_selection(
            &[EntityKey::historical("A", 0)].into_iter().collect(),
            Originator::Session,
        );
        drain(&mut manager);

        let children = &manager.root_entities()[0].children;
        assert!(std::rc::Rc::ptr_eq(&children[0], &before[0]));
        assert!(children[1].selected);
        assert!(!before[1].selected);
    }

    #[test]
    fn filter_changes_recreate_rows() {
        let mut manager = manager_with(&[event("A", 1.0), event("B", 2.0)]);
        manager.store_mut().set_filter(crate::store::EventFilter {
            site_ids: Some(["OAX".to_string()].into_iter().collect()),
            ..Default::default()
        });
        drain(&mut manager);
        assert!(manager.root_entities().is_empty());
        assert!(manager.view().rows().is_empty());
    }
}
