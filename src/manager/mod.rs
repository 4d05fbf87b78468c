//! Live, ordered projection of the event store onto table rows.
//!
//! [`TabularEntityManager`] owns every row entity. It learns about changes
//! through its public operations (usually driven by
//! [`TabularEntityManager::handle_notification`]), rebuilds only what changed,
//! keeps the root rows sorted and pushes the smallest matching operation to
//! its [`ConsoleView`]. User edits travel the other way through
//! [`TabularEntityManager::handle_user_changes_to_entities`].

mod channel;
mod dispatch;
mod engine;
mod reconcile;
mod view;

pub use channel::TimeRangeChannel;
pub use engine::SortEngine;
pub use view::{ConsoleView, RecordingView, ViewOperation};

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::columns::{normalize_sorts, ConsoleColumns, Sort, SortMetadata};
use crate::config::ConsoleSettings;
use crate::data::{CountdownTimer, HazardEvent};
use crate::entity::{build_entity, EntityKey, TabularEntity};
use crate::error::Result;
use crate::store::EventStore;

type EntityMap = HashMap<EntityKey, Rc<TabularEntity>>;

/// Keeps the console's rows in step with an [`EventStore`].
#[derive(Debug)]
pub struct TabularEntityManager<S, V> {
    store: S,
    view: V,
    /// Root rows in display order.
    root_entities: Vec<Rc<TabularEntity>>,
    indices_for_root_identifiers: HashMap<String, usize>,
    /// Every live entity, roots and historical children alike.
    entities_for_keys: EntityMap,
    events_for_identifiers: HashMap<String, HazardEvent>,
    show_history_list: bool,
    columns: ConsoleColumns,
    /// Ordered by priority.
    sorts: Vec<Sort>,
    sort_metadata: SortMetadata,
    countdown_timers: HashMap<String, CountdownTimer>,
}

impl<S: EventStore, V: ConsoleView> TabularEntityManager<S, V> {
    /// Create a manager with no columns, no sorts and history hidden.
    pub fn new(store: S, view: V) -> Self {
        Self {
            store,
            view,
            root_entities: Vec::new(),
            indices_for_root_identifiers: HashMap::new(),
            entities_for_keys: HashMap::new(),
            events_for_identifiers: HashMap::new(),
            show_history_list: false,
            columns: ConsoleColumns::default(),
            sorts: Vec::new(),
            sort_metadata: SortMetadata::default(),
            countdown_timers: HashMap::new(),
        }
    }

    /// Create a manager configured from console settings. No rows are built
    /// until [`Self::recreate_all_entities`] is called.
    pub fn with_settings(store: S, view: V, settings: &ConsoleSettings) -> Result<Self> {
        let mut manager = Self::new(store, view);
        let columns = settings.console_columns();
        manager.sorts = normalize_sorts(settings.sorts.clone())?;
        manager.sort_metadata = SortMetadata::from_columns(&columns);
        manager.columns = columns;
        manager.show_history_list = settings.show_history_list;
        Ok(manager)
    }

    /// Root rows in display order.
    pub fn root_entities(&self) -> &[Rc<TabularEntity>] {
        &self.root_entities
    }

    /// Row index of an event's root entity.
    pub fn index_of(&self, identifier: &str) -> Option<usize> {
        self.indices_for_root_identifiers.get(identifier).copied()
    }

    /// Live entity for one event version.
    pub fn entity(&self, key: &EntityKey) -> Option<&Rc<TabularEntity>> {
        self.entities_for_keys.get(key)
    }

    /// Event a root entity was last built from.
    pub fn event(&self, identifier: &str) -> Option<&HazardEvent> {
        self.events_for_identifiers.get(identifier)
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Backing store, for changes made outside the console. The manager only
    /// hears about them through its operations or notifications.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// View receiving row operations.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Mutable access to the view.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Whether historical versions are shown as child rows.
    pub fn show_history_list(&self) -> bool {
        self.show_history_list
    }

    /// Current column configuration.
    pub fn columns(&self) -> &ConsoleColumns {
        &self.columns
    }

    /// Active sorts, by priority.
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    /// Running countdown timers by event identifier.
    pub fn countdown_timers(&self) -> &HashMap<String, CountdownTimer> {
        &self.countdown_timers
    }

    /// Engine for the current sorts.
    pub fn sort_engine(&self) -> SortEngine<'_> {
        SortEngine::new(&self.sorts, &self.sort_metadata, &self.countdown_timers)
    }

    /// Add rows for an event that passes the filters and is not shown yet.
    pub fn add_entities_for_event(&mut self, event: &HazardEvent) {
        let identifier = &event.event_id;
        if !self.store.matches_current_settings(event) {
            tracing::debug!("Not adding {}: filtered out", identifier);
            return;
        }
        if self.indices_for_root_identifiers.contains_key(identifier) {
            return;
        }

        let children = if self.show_history_list {
            Self::historical_entities(&self.store, identifier, &self.entities_for_keys, |_| true)
        } else {
            Vec::new()
        };
        let root = build_entity(&self.store, event, None, None, children);
        let canonical_identifiers = self.store.event_ids_for_current_settings();
        let index = self
            .sort_engine()
            .insertion_index(&self.root_entities, &root, &canonical_identifiers);

        for existing in self.indices_for_root_identifiers.values_mut() {
            if *existing >= index {
                *existing += 1;
            }
        }
        self.indices_for_root_identifiers
            .insert(identifier.clone(), index);
        self.root_entities.insert(index, Rc::clone(&root));
        Self::register(&mut self.entities_for_keys, &root);
        self.events_for_identifiers
            .insert(identifier.clone(), event.clone());

        tracing::debug!("Inserted {} at {}", identifier, index);
        self.view.insert_element(index, root);
    }

    /// Rebuild an event's root row, keeping its historical children.
    ///
    /// The row stays at its index. When a sort value may have changed, callers
    /// must follow up with [`Self::sort_hazard_events`].
    pub fn replace_root_entity_for_event(&mut self, event: &HazardEvent) {
        self.replace_entities(event, &BTreeSet::new());
    }

    /// Rebuild an event's root row and the historical children at
    /// `historical_indices`, reusing every other child.
    pub fn replace_entities_for_event(&mut self, event: &HazardEvent, historical_indices: &BTreeSet<usize>) {
        if historical_indices.is_empty() || !self.show_history_list {
            self.replace_root_entity_for_event(event);
        } else {
            self.replace_entities(event, historical_indices);
        }
    }

    fn replace_entities(&mut self, event: &HazardEvent, historical_indices: &BTreeSet<usize>) {
        if !self
            .indices_for_root_identifiers
            .contains_key(&event.event_id)
        {
            self.add_entities_for_event(event);
            return;
        }
        if !self.store.matches_current_settings(event) {
            self.remove_entities_for_event(&event.event_id);
            return;
        }
        if let Some((index, root)) = self.rebuild_root(event, historical_indices) {
            tracing::debug!("Replaced {} at {}", event.event_id, index);
            self.view.replace_element(index, root);
        }
    }

    /// Remove an event's rows. Does nothing if the event has none.
    pub fn remove_entities_for_event(&mut self, identifier: &str) {
        let Some(index) = self.indices_for_root_identifiers.remove(identifier) else {
            return;
        };
        self.root_entities.remove(index);
        self.entities_for_keys
            .retain(|key, _| key.identifier != identifier);
        self.events_for_identifiers.remove(identifier);
        for existing in self.indices_for_root_identifiers.values_mut() {
            if *existing > index {
                *existing -= 1;
            }
        }

        tracing::debug!("Removed {} from {}", identifier, index);
        self.view.remove_element(index);
    }

    /// Pick up historical versions appended to an event since its children
    /// were built. Existing children are kept as they are.
    pub fn update_child_entity_list_for_event(&mut self, event: &HazardEvent) {
        if !self.show_history_list {
            return;
        }
        let Some(index) = self.index_of(&event.event_id) else {
            return;
        };
        let previous = Rc::clone(&self.root_entities[index]);
        let existing = previous.children.len();
        if self.store.historical_version_count(&event.event_id) <= existing {
            return;
        }

        let children = Self::historical_entities(
            &self.store,
            &event.event_id,
            &self.entities_for_keys,
            |history_index| history_index >= existing,
        );
        let root = build_entity(&self.store, event, None, Some(&previous), children);
        self.root_entities[index] = Rc::clone(&root);
        Self::register(&mut self.entities_for_keys, &root);
        self.events_for_identifiers
            .insert(event.event_id.clone(), event.clone());

        tracing::debug!(
            "{} now has {} historical versions",
            event.event_id,
            root.children.len()
        );
        self.view.replace_element(index, root);
    }

    /// Rebuild every row from the store, reusing entities whose contents did
    /// not change, and push them all at once.
    pub fn recreate_all_entities(&mut self) {
        let events = self.store.events_for_current_settings();
        let reuse = std::mem::take(&mut self.entities_for_keys);

        let mut roots: Vec<Rc<TabularEntity>> = events
            .iter()
            .map(|event| {
                let children = if self.show_history_list {
                    Self::historical_entities(&self.store, &event.event_id, &reuse, |_| true)
                } else {
                    Vec::new()
                };
                let previous = reuse.get(&EntityKey::current(event.event_id.as_str()));
                build_entity(&self.store, event, None, previous, children)
            })
            .collect();
        self.sort_engine().sort(&mut roots);

        self.root_entities = roots;
        for root in &self.root_entities {
            Self::register(&mut self.entities_for_keys, root);
        }
        self.events_for_identifiers = events
            .into_iter()
            .map(|event| (event.event_id.clone(), event))
            .collect();
        self.reindex();

        tracing::debug!("Recreated {} rows", self.root_entities.len());
        self.view.set_all(self.root_entities.clone());
    }

    /// Show or hide historical versions as child rows.
    pub fn set_show_history_list(&mut self, show_history_list: bool) {
        if self.show_history_list == show_history_list {
            return;
        }
        self.show_history_list = show_history_list;
        if !show_history_list {
            self.entities_for_keys
                .retain(|key, _| key.history_index.is_none());
        }

        let roots: Vec<Rc<TabularEntity>> = self
            .root_entities
            .iter()
            .map(|previous| {
                let Some(event) = self.events_for_identifiers.get(&previous.identifier) else {
                    return Rc::clone(previous);
                };
                let children = if show_history_list {
                    Self::historical_entities(
                        &self.store,
                        &previous.identifier,
                        &self.entities_for_keys,
                        |_| true,
                    )
                } else {
                    Vec::new()
                };
                build_entity(&self.store, event, None, Some(previous), children)
            })
            .collect();
        self.root_entities = roots;
        for root in &self.root_entities {
            Self::register(&mut self.entities_for_keys, root);
        }

        tracing::debug!("History rows {}", if show_history_list { "shown" } else { "hidden" });
        self.view.set_all(self.root_entities.clone());
    }

    /// Re-sort the root rows from canonical order. Does nothing without sorts.
    pub fn sort_hazard_events(&mut self) {
        if self.sorts.is_empty() {
            return;
        }
        let canonical_identifiers = self.store.event_ids_for_current_settings();
        let positions: HashMap<&str, usize> = canonical_identifiers
            .iter()
            .enumerate()
            .map(|(position, identifier)| (identifier.as_str(), position))
            .collect();

        let mut roots = self.root_entities.clone();
        roots.sort_by_key(|root| {
            positions
                .get(root.identifier.as_str())
                .copied()
                .unwrap_or(usize::MAX)
        });
        self.sort_engine().sort(&mut roots);
        self.root_entities = roots;
        self.reindex();

        tracing::debug!("Sorted {} rows", self.root_entities.len());
        self.view.set_all(self.root_entities.clone());
    }

    /// Replace the running countdown timers, re-sorting if a sort depends on them.
    pub fn set_active_countdown_timers(&mut self, countdown_timers: HashMap<String, CountdownTimer>) {
        self.countdown_timers = countdown_timers;
        let sorted_by_countdown = self
            .sorts
            .iter()
            .any(|sort| self.sort_metadata.is_countdown(&sort.attribute_identifier));
        if sorted_by_countdown {
            self.sort_hazard_events();
        }
    }

    /// Replace the active sorts and re-sort.
    pub fn set_sorts(&mut self, sorts: Vec<Sort>) -> Result<()> {
        let sorts = normalize_sorts(sorts)?;
        if sorts == self.sorts {
            return Ok(());
        }
        self.sorts = sorts;
        self.sort_hazard_events();
        Ok(())
    }

    /// Replace the column configuration and re-sort with the new comparators.
    pub fn set_columns(&mut self, columns: ConsoleColumns) {
        if columns == self.columns {
            return;
        }
        self.sort_metadata = SortMetadata::from_columns(&columns);
        self.columns = columns;
        self.sort_hazard_events();
    }

    /// Whether a root row no longer sits between its neighbours.
    fn is_out_of_order(&self, index: usize) -> bool {
        let engine = self.sort_engine();
        let entity = &self.root_entities[index];
        let after_previous = index
            .checked_sub(1)
            .and_then(|previous| self.root_entities.get(previous))
            .is_some_and(|previous| engine.compare(previous, entity) == Ordering::Greater);
        let before_next = self
            .root_entities
            .get(index + 1)
            .is_some_and(|next| engine.compare(entity, next) == Ordering::Greater);
        after_previous || before_next
    }

    /// Rebuild a tracked root in place. Returns the new root and its index
    /// only when it differs from the one it replaces.
    fn rebuild_root(
        &mut self,
        event: &HazardEvent,
        historical_indices: &BTreeSet<usize>,
    ) -> Option<(usize, Rc<TabularEntity>)> {
        let index = self.index_of(&event.event_id)?;
        let previous = Rc::clone(&self.root_entities[index]);
        let children = if self.show_history_list && !historical_indices.is_empty() {
            Self::historical_entities(
                &self.store,
                &event.event_id,
                &self.entities_for_keys,
                |history_index| historical_indices.contains(&history_index),
            )
        } else {
            previous.children.clone()
        };
        self.events_for_identifiers
            .insert(event.event_id.clone(), event.clone());

        let root = build_entity(&self.store, event, None, Some(&previous), children);
        if Rc::ptr_eq(&root, &previous) {
            return None;
        }
        self.root_entities[index] = Rc::clone(&root);
        Self::register(&mut self.entities_for_keys, &root);
        Some((index, root))
    }

    /// Historical entities of an event, newest first. Versions for which
    /// `rebuild` is false reuse their live entity when there is one.
    fn historical_entities(
        store: &S,
        identifier: &str,
        reuse: &EntityMap,
        rebuild: impl Fn(usize) -> bool,
    ) -> Vec<Rc<TabularEntity>> {
        let history = store.event_history_by_id(identifier).unwrap_or_default();
        let mut children: Vec<Rc<TabularEntity>> = history
            .iter()
            .enumerate()
            .map(|(history_index, version)| {
                let previous = reuse.get(&EntityKey::historical(identifier, history_index));
                match previous {
                    Some(previous) if !rebuild(history_index) => Rc::clone(previous),
                    previous => build_entity(store, version, Some(history_index), previous, Vec::new()),
                }
            })
            .collect();
        children.reverse();
        children
    }

    fn register(entities_for_keys: &mut EntityMap, root: &Rc<TabularEntity>) {
        for child in &root.children {
            entities_for_keys.insert(child.key(), Rc::clone(child));
        }
        entities_for_keys.insert(root.key(), Rc::clone(root));
    }

    fn reindex(&mut self) {
        self.indices_for_root_identifiers = self
            .root_entities
            .iter()
            .enumerate()
            .map(|(index, root)| (root.identifier.clone(), index))
            .collect();
    }
}
