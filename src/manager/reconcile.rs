//! Reconciliation of user edits made in the table.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use super::{ConsoleView, TabularEntityManager};
use crate::entity::{build_entity, EntityKey, TabularEntity};
use crate::error::{ConsoleError, Result};
use crate::store::{EventStore, Originator, PropertyChange};

/// Selection flips collected over one batch of edits.
#[derive(Debug, Default)]
struct SelectionDelta {
    became_selected: BTreeSet<EntityKey>,
    became_unselected: BTreeSet<EntityKey>,
}

impl SelectionDelta {
    fn record(&mut self, key: EntityKey, selected: bool) {
        if selected {
            self.became_selected.insert(key);
        } else {
            self.became_unselected.insert(key);
        }
    }

    fn apply<S: EventStore>(self, store: &mut S) {
        match (
            self.became_selected.is_empty(),
            self.became_unselected.is_empty(),
        ) {
            (false, false) => {
                let mut selection = store.selection();
                selection.extend(self.became_selected);
                for key in &self.became_unselected {
                    selection.remove(key);
                }
                store.set_selection(selection, Originator::Console);
            },
            (false, true) => store.add_to_selection(&self.became_selected, Originator::Console),
            (true, false) => store.remove_from_selection(&self.became_unselected, Originator::Console),
            (true, true) => {},
        }
    }
}

impl<S: EventStore, V: ConsoleView> TabularEntityManager<S, V> {
    /// Push user edits of root entities to the store.
    ///
    /// Each entity is compared with the live one for the same event and the
    /// differences are requested from the store. Events with a refused change
    /// get their authoritative entity pushed back to the view. Accepted edits
    /// are rebuilt from the store as well, and pushed when the result differs
    /// from what the user submitted.
    ///
    /// Historical entities are read-only: each one is logged and skipped, and
    /// the first is reported as [`ConsoleError::HistoricalEntityEdit`] once
    /// every other entity has been handled.
    pub fn handle_user_changes_to_entities(&mut self, changed_entities: &[TabularEntity]) -> Result<()> {
        let mut first_violation = None;
        let mut edited: Vec<&TabularEntity> = Vec::new();
        let mut refused: BTreeSet<String> = BTreeSet::new();
        let mut selection = SelectionDelta::default();
        let mut historical_indices_for_identifiers: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();

        for entity in changed_entities {
            if let Some(history_index) = entity.history_index {
                let error = ConsoleError::historical_entity_edit(&entity.identifier, history_index);
                tracing::error!("{}", error);
                first_violation.get_or_insert(error);
                continue;
            }
            let Some(previous) = self.entities_for_keys.get(&entity.key()).cloned() else {
                tracing::warn!("Ignoring edit to untracked event {}", entity.identifier);
                continue;
            };
            let identifier = entity.identifier.as_str();

            let mut rejected = false;
            if entity.end_time_until_further_notice != previous.end_time_until_further_notice {
                rejected |= self
                    .store
                    .change_event_property(
                        identifier,
                        PropertyChange::UntilFurtherNotice(entity.end_time_until_further_notice),
                        Originator::Console,
                    )
                    .is_rejected();
            }
            if entity.checked != previous.checked {
                self.store
                    .set_event_checked(identifier, entity.checked, Originator::Console);
            }
            if entity.time_range != previous.time_range {
                rejected |= self
                    .store
                    .change_event_property(
                        identifier,
                        PropertyChange::TimeRange(entity.time_range),
                        Originator::Console,
                    )
                    .is_rejected();
            }

            if entity.selected != previous.selected {
                selection.record(previous.key(), entity.selected);
            }
            // Histories only grow at the old end, so newest-first lists line up from the back.
            for (child, previous_child) in entity
                .children
                .iter()
                .rev()
                .zip(previous.children.iter().rev())
            {
                if child.selected == previous_child.selected {
                    continue;
                }
                selection.record(previous_child.key(), child.selected);
                if let Some(history_index) = previous_child.history_index {
                    historical_indices_for_identifiers
                        .entry(identifier.to_string())
                        .or_default()
                        .insert(history_index);
                }
            }

            if rejected {
                tracing::info!("Edit to {} was refused, restoring it", identifier);
                refused.insert(identifier.to_string());
            }
            edited.push(entity);
        }

        for identifier in &refused {
            self.resync(identifier);
        }
        selection.apply(&mut self.store);

        let mut submitted: BTreeMap<&str, &TabularEntity> = BTreeMap::new();
        for entity in edited {
            submitted.insert(entity.identifier.as_str(), entity);
        }
        for (identifier, entity) in submitted {
            let shown = if refused.contains(identifier) {
                None
            } else {
                Some(entity)
            };
            let historical_indices = historical_indices_for_identifiers
                .remove(identifier)
                .unwrap_or_default();
            self.reconcile_edited(identifier, shown, &historical_indices);
        }

        match first_violation {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Push the authoritative entity for an event whatever the view shows.
    fn resync(&mut self, identifier: &str) {
        let Some(event) = self.store.event_by_id(identifier) else {
            self.remove_entities_for_event(identifier);
            return;
        };
        let Some(index) = self.index_of(identifier) else {
            return;
        };
        let previous = Rc::clone(&self.root_entities[index]);
        let root = build_entity(
            &self.store,
            &event,
            None,
            Some(&previous),
            previous.children.clone(),
        );
        self.root_entities[index] = Rc::clone(&root);
        Self::register(&mut self.entities_for_keys, &root);
        self.events_for_identifiers
            .insert(identifier.to_string(), event);
        self.view.replace_element(index, root);
    }

    /// Rebuild an edited event and push it if it differs from `shown`, the
    /// entity the view currently displays. `None` means the view already
    /// displays the live entity.
    fn reconcile_edited(
        &mut self,
        identifier: &str,
        shown: Option<&TabularEntity>,
        historical_indices: &BTreeSet<usize>,
    ) {
        let Some(event) = self.store.event_by_id(identifier) else {
            self.remove_entities_for_event(identifier);
            return;
        };
        let Some(index) = self.index_of(identifier) else {
            return;
        };
        let rebuilt = self.rebuild_root(&event, historical_indices);
        let root = Rc::clone(&self.root_entities[index]);
        let stale = match shown {
            Some(shown) => *root != *shown,
            None => rebuilt.is_some(),
        };
        if !stale {
            return;
        }
        self.view.replace_element(index, root);
        if self.is_out_of_order(index) {
            self.sort_hazard_events();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{event, manager_with};
    use super::super::ViewOperation;
    use crate::data::{EventStatus, HazardEvent, TimeRange};
    use crate::entity::{EntityKey, TabularEntity};
    use crate::error::ConsoleError;
    use crate::store::{EventStore, LockStatus, Originator};

    fn edit(manager: &super::super::tests::TestManager, identifier: &str) -> TabularEntity {
        manager
            .entity(&EntityKey::current(identifier))
            .unwrap()
            .as_ref()
            .clone()
    }

    #[test]
    fn refused_time_range_edit_restores_authoritative_entity() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        manager.store_mut().set_lock_status(
            "A",
            LockStatus::LockedByOther {
                workstation: "ws2".to_string(),
                user_name: "other".to_string(),
            },
        );
        manager.store_mut().drain_notifications();

        let mut changed = edit(&manager, "A");
        changed.time_range = TimeRange::new(100, 900);
        manager
            .handle_user_changes_to_entities(&[changed])
            .unwrap();

        assert_eq!(
            manager.view().operations(),
            &[ViewOperation::Replace {
                index: 0,
                identifier: "A".to_string()
            }]
        );
        assert_eq!(manager.view().rows()[0].time_range, TimeRange::new(100, 200));
        assert_eq!(
            manager.store().event_by_id("A").unwrap().time_range(),
            TimeRange::new(100, 200)
        );
    }

    #[test]
    fn accepted_edit_on_issued_event_pushes_unsaved_row() {
        let issued = HazardEvent::new("A", 100, 200)
            .with_attribute("value", 1.0)
            .with_status(EventStatus::Issued);
        let mut manager = manager_with(&[issued]);

        let mut changed = edit(&manager, "A");
        changed.time_range = TimeRange::new(100, 400);
        manager
            .handle_user_changes_to_entities(&[changed])
            .unwrap();

        let row = &manager.view().rows()[0];
        assert_eq!(row.time_range, TimeRange::new(100, 400));
        assert!(row.unsaved);
        assert!(manager.store().event_by_id("A").unwrap().modified);
    }

    #[test]
    fn accepted_checkbox_edit_pushes_nothing() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        let mut changed = edit(&manager, "A");
        changed.checked = true;

        manager
            .handle_user_changes_to_entities(&[changed])
            .unwrap();

        assert!(manager.store().is_event_checked("A"));
        assert!(manager.view().operations().is_empty());
        assert!(manager.root_entities()[0].checked);
        for notification in manager.store_mut().drain_notifications() {
            assert!(notification.is_own_echo());
        }
    }

    #[test]
    fn historical_submission_fails_after_processing_the_rest() {
        let mut manager = manager_with(&[event("A", 1.0), event("B", 2.0)]);
        manager.store_mut().persist_event("B", 1_000);
        manager.set_show_history_list(true);

        let historical = (*manager.root_entities()[1].children[0]).clone();
        let mut changed = edit(&manager, "A");
        changed.checked = true;

        let result = manager.handle_user_changes_to_entities(&[historical, changed]);

        assert!(matches!(
            result,
            Err(ConsoleError::HistoricalEntityEdit { ref identifier, history_index: 0 }) if identifier == "B"
        ));
        assert!(manager.store().is_event_checked("A"));
    }

    #[test]
    fn mixed_selection_flips_are_batched() {
        let mut manager = manager_with(&[event("A", 1.0), event("B", 2.0)]);
        manager.store_mut().add_to_selection(
            &[EntityKey::current("B")].into_iter().collect(),
            Originator::Session,
        );
        for notification in manager.store_mut().drain_notifications() {
            manager.handle_notification(notification).unwrap();
        }

        let mut select = edit(&manager, "A");
        select.selected = true;
        let mut unselect = edit(&manager, "B");
        unselect.selected = false;
        manager
            .handle_user_changes_to_entities(&[select, unselect])
            .unwrap();

        assert_eq!(
            manager.store().selection(),
            [EntityKey::current("A")].into_iter().collect()
        );
        assert!(manager.root_entities()[0].selected);
        assert!(!manager.root_entities()[1].selected);
    }

    #[test]
    fn selecting_a_child_through_its_root() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        manager.store_mut().persist_event("A", 1_000);
        manager.store_mut().persist_event("A", 2_000);
        manager.set_show_history_list(true);
        let untouched = manager.root_entities()[0].children[0].clone();

        let mut changed = edit(&manager, "A");
        let mut oldest = (*changed.children[1]).clone();
        oldest.selected = true;
        changed.children[1] = std::rc::Rc::new(oldest);
        manager
            .handle_user_changes_to_entities(&[changed])
            .unwrap();

        assert!(manager
            .store()
            .is_selected(&EntityKey::historical("A", 0)));
        let children = &manager.root_entities()[0].children;
        assert!(children[1].selected);
        assert!(std::rc::Rc::ptr_eq(&children[0], &untouched));
    }

    #[test]
    fn refused_until_further_notice_is_rolled_back() {
        let mut manager = manager_with(&[event("A", 1.0)]);
        let mut changed = edit(&manager, "A");
        changed.end_time_until_further_notice = true;

        manager
            .handle_user_changes_to_entities(&[changed])
            .unwrap();

        assert!(!manager.view().rows()[0].end_time_until_further_notice);
        assert_eq!(manager.view().operations().len(), 1);
    }
}
