//! Copy-on-write construction of entities.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::{EntityKey, EntityProperty, PropertySource, TabularEntity};
use crate::data::{CellValue, EventStatus, HazardEvent, TimeRange};
use crate::store::{EventStore, LockStatus};

#[derive(Debug)]
enum Draft {
    /// Still identical to the previous entity.
    Shared(Rc<TabularEntity>),
    /// Copied on the first differing field; later fields write straight into it.
    Owned(TabularEntity),
}

/// Builds an entity on top of a previous one, copying it at most once.
///
/// Each field is compared on its own. The first field that differs forces a
/// shallow copy of the previous entity and every later assignment goes to that
/// copy. If no field differs, [`EntityBuilder::finish`] hands back the previous
/// `Rc` itself, so callers can detect "nothing visible changed" with
/// [`Rc::ptr_eq`].
pub struct EntityBuilder {
    draft: Draft,
}

impl EntityBuilder {
    /// Start from `previous`, or from a blank entity when there is none.
    pub fn new(previous: Option<&Rc<TabularEntity>>, identifier: &str, history_index: Option<usize>) -> Self {
        let draft = match previous {
            Some(previous) => Draft::Shared(Rc::clone(previous)),
            None => Draft::Owned(TabularEntity::empty(identifier, history_index)),
        };
        Self { draft }
    }

    /// Whether the previous entity has been copied.
    pub fn is_copied(&self) -> bool {
        matches!(self.draft, Draft::Owned(_))
    }

    /// Assign one field, copying the previous entity if the value differs.
    pub fn set<T, R, W>(&mut self, value: T, read: R, write: W)
    where
        T: PartialEq,
        R: Fn(&TabularEntity) -> &T,
        W: FnOnce(&mut TabularEntity) -> &mut T,
    {
        let copy = match &mut self.draft {
            Draft::Owned(entity) => {
                *write(entity) = value;
                return;
            },
            Draft::Shared(shared) => {
                if *read(&**shared) == value {
                    return;
                }
                let mut copy = (**shared).clone();
                *write(&mut copy) = value;
                copy
            },
        };
        self.draft = Draft::Owned(copy);
    }

    /// The finished entity; the previous `Rc` when nothing differed.
    pub fn finish(self) -> Rc<TabularEntity> {
        match self.draft {
            Draft::Shared(shared) => shared,
            Draft::Owned(entity) => Rc::new(entity),
        }
    }
}

impl std::fmt::Debug for EntityBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBuilder")
            .field("copied", &self.is_copied())
            .finish()
    }
}

/// Build the entity for one version of `event`.
///
/// `history_index` is `None` for the current version. When `previous` is given
/// and every derived field matches it, `previous` itself is returned.
pub fn build_entity<S: EventStore + ?Sized>(
    store: &S,
    event: &HazardEvent,
    history_index: Option<usize>,
    previous: Option<&Rc<TabularEntity>>,
    children: Vec<Rc<TabularEntity>>,
) -> Rc<TabularEntity> {
    let historical = history_index.is_some();
    let mut builder = EntityBuilder::new(previous, &event.event_id, history_index);

    builder.set(event.event_id.clone(), |e| &e.identifier, |e| &mut e.identifier);
    builder.set(history_index, |e| &e.history_index, |e| &mut e.history_index);
    builder.set(
        if historical { event.insert_time } else { None },
        |e| &e.persisted_timestamp,
        |e| &mut e.persisted_timestamp,
    );

    let unsaved = !historical
        && ((event.status == EventStatus::Issued && event.modified)
            || event.status == EventStatus::Ending);
    builder.set(unsaved, |e| &e.unsaved, |e| &mut e.unsaved);

    builder.set(event.time_range(), |e| &e.time_range, |e| &mut e.time_range);
    builder.set(
        event.is_until_further_notice(),
        |e| &e.end_time_until_further_notice,
        |e| &mut e.end_time_until_further_notice,
    );
    builder.set(
        store.has_duration_choices(event),
        |e| &e.time_range_interval_locked,
        |e| &mut e.time_range_interval_locked,
    );

    // Historical time ranges cannot be edited.
    let (lower, upper) = if historical {
        (
            TimeRange::point(event.start_time),
            TimeRange::point(event.end_time),
        )
    } else {
        (
            store.start_time_boundaries(event),
            store.end_time_boundaries(event),
        )
    };
    builder.set(lower, |e| &e.lower_time_boundaries, |e| &mut e.lower_time_boundaries);
    builder.set(upper, |e| &e.upper_time_boundaries, |e| &mut e.upper_time_boundaries);

    builder.set(
        store.time_resolution_for(event),
        |e| &e.time_resolution,
        |e| &mut e.time_resolution,
    );
    builder.set(
        !historical
            && !event.status.is_ending_or_finished()
            && store.allows_until_further_notice(event),
        |e| &e.allow_until_further_notice,
        |e| &mut e.allow_until_further_notice,
    );
    builder.set(store.color_for(event), |e| &e.color, |e| &mut e.color);

    let key = EntityKey {
        identifier: event.event_id.clone(),
        history_index,
    };
    builder.set(store.is_selected(&key), |e| &e.selected, |e| &mut e.selected);
    builder.set(
        !historical && store.is_event_checked(&event.event_id),
        |e| &e.checked,
        |e| &mut e.checked,
    );

    let lock_status = if historical {
        LockStatus::Unlocked
    } else {
        store.lock_status(&event.event_id)
    };
    builder.set(
        attributes_for(event, &lock_status, historical),
        |e| &e.attributes,
        |e| &mut e.attributes,
    );
    builder.set(children, |e| &e.children, |e| &mut e.children);

    builder.finish()
}

fn attributes_for(
    event: &HazardEvent,
    lock_status: &LockStatus,
    historical: bool,
) -> BTreeMap<String, CellValue> {
    let mut attributes = event.attributes.clone();
    let source = PropertySource { event, lock_status };
    for property in EntityProperty::ALL {
        let value = if historical && property.is_current_only() {
            None
        } else {
            property.fetch(&source)
        };
        match value {
            Some(value) => {
                attributes.insert(property.identifier().to_string(), value);
            },
            None => {
                attributes.remove(property.identifier());
            },
        }
    }
    attributes
}
