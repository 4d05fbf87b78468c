//! Multi-key ordering of root entities.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::columns::{Sort, SortKey, SortMetadata};
use crate::data::CountdownTimer;
use crate::entity::TabularEntity;

/// Orders entities by the active sort keys.
///
/// Ties left by every key are kept in canonical (store) order, or in reverse
/// canonical order when the directions of the active keys add up to an odd
/// number. That way flipping the direction of a single key visibly flips
/// groups of equal rows too.
#[derive(Debug, Clone, Copy)]
pub struct SortEngine<'a> {
    sorts: &'a [Sort],
    metadata: &'a SortMetadata,
    countdown_timers: &'a HashMap<String, CountdownTimer>,
}

impl<'a> SortEngine<'a> {
    /// Create an engine over priority-ordered sorts.
    pub fn new(
        sorts: &'a [Sort],
        metadata: &'a SortMetadata,
        countdown_timers: &'a HashMap<String, CountdownTimer>,
    ) -> Self {
        Self {
            sorts,
            metadata,
            countdown_timers,
        }
    }

    /// Compare two entities key by key, stopping at the first difference.
    /// Keys on columns without a comparator are skipped.
    pub fn compare(&self, a: &TabularEntity, b: &TabularEntity) -> Ordering {
        for sort in self.sorts {
            let identifier = sort.attribute_identifier.as_str();
            let ordering = match self.metadata.sort_key(identifier) {
                Some(SortKey::Cell(comparator)) => {
                    comparator.compare(a.attribute(identifier), b.attribute(identifier))
                },
                Some(SortKey::Countdown) => self.compare_countdowns(a, b),
                None => continue,
            };
            let ordering = sort.direction.apply(ordering);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    // An event without a running timer sorts as if its expiration were null.
    fn compare_countdowns(&self, a: &TabularEntity, b: &TabularEntity) -> Ordering {
        let expiration = |entity: &TabularEntity| {
            self.countdown_timers
                .get(&entity.identifier)
                .map(|timer| timer.expire_time)
        };
        match (expiration(a), expiration(b)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(&b),
        }
    }

    /// Whether tied runs are kept in reverse canonical order.
    pub fn is_reversing(&self) -> bool {
        self.sorts
            .iter()
            .map(|sort| sort.direction.ordinal())
            .sum::<usize>()
            % 2
            == 1
    }

    /// Sort entities that are currently in canonical order.
    pub fn sort(&self, entities: &mut [Rc<TabularEntity>]) {
        entities.sort_by(|a, b| self.compare(a, b));
        if !self.is_reversing() {
            return;
        }
        let mut start = 0;
        while start < entities.len() {
            let mut end = start + 1;
            while end < entities.len()
                && self.compare(&entities[start], &entities[end]) == Ordering::Equal
            {
                end += 1;
            }
            entities[start..end].reverse();
            start = end;
        }
    }

    /// Index at which `entity` belongs in `sorted`, so that inserting it there
    /// gives the same order as sorting everything from scratch.
    ///
    /// `canonical_identifiers` is the store's order of event identifiers and
    /// decides where the entity goes within a run of rows it ties with.
    pub fn insertion_index(
        &self,
        sorted: &[Rc<TabularEntity>],
        entity: &TabularEntity,
        canonical_identifiers: &[String],
    ) -> usize {
        let run_start = sorted.partition_point(|existing| self.compare(existing, entity) == Ordering::Less);
        let run_end = sorted.partition_point(|existing| self.compare(existing, entity) != Ordering::Greater);
        if run_start == run_end {
            return run_start;
        }

        // The tied row that follows the new one most closely in canonical order.
        let tied: HashSet<&str> = sorted[run_start..run_end]
            .iter()
            .map(|existing| existing.identifier.as_str())
            .collect();
        let successor = canonical_identifiers
            .iter()
            .skip_while(|identifier| **identifier != entity.identifier)
            .skip(1)
            .find(|identifier| tied.contains(identifier.as_str()));
        let successor_index = successor.and_then(|identifier| {
            sorted[run_start..run_end]
                .iter()
                .position(|existing| existing.identifier == *identifier)
                .map(|offset| run_start + offset)
        });

        match (successor_index, self.is_reversing()) {
            (Some(index), false) => index,
            (Some(index), true) => index + 1,
            (None, false) => run_end,
            (None, true) => run_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{Column, ConsoleColumns, SortDirection, SortPriority};
    use crate::data::CellValue;
    use std::collections::BTreeMap;

    fn metadata() -> SortMetadata {
        let columns: BTreeMap<String, Column> = [
            ("Value".to_string(), Column::new("value", "number")),
            ("Type".to_string(), Column::new("hazardType", "string")),
            ("Expires".to_string(), Column::new("expiration", "countdown")),
        ]
        .into_iter()
        .collect();
        SortMetadata::from_columns(&ConsoleColumns::from_columns(&columns, Vec::new()))
    }

    fn entity(identifier: &str, value: f64) -> Rc<TabularEntity> {
        let mut entity = TabularEntity::empty(identifier, None);
        entity
            .attributes
            .insert("value".to_string(), CellValue::Number(value));
        Rc::new(entity)
    }

    fn ids(entities: &[Rc<TabularEntity>]) -> Vec<&str> {
        entities
            .iter()
            .map(|entity| entity.identifier.as_str())
            .collect()
    }

    fn by_value(direction: SortDirection) -> Vec<Sort> {
        vec![Sort::new("value", direction, SortPriority::Primary)]
    }

    /// Sort a canonical list from scratch.
    fn full_sort(engine: &SortEngine<'_>, canonical: &[Rc<TabularEntity>]) -> Vec<Rc<TabularEntity>> {
        let mut sorted = canonical.to_vec();
        engine.sort(&mut sorted);
        sorted
    }

    #[test]
    fn reversing_follows_direction_parity() {
        let metadata = metadata();
        let timers = HashMap::new();
        let descending = by_value(SortDirection::Descending);
        assert!(SortEngine::new(&descending, &metadata, &timers).is_reversing());

        let both = vec![
            Sort::new("value", SortDirection::Descending, SortPriority::Primary),
            Sort::new("hazardType", SortDirection::Descending, SortPriority::Secondary),
        ];
        assert!(!SortEngine::new(&both, &metadata, &timers).is_reversing());
        assert!(!SortEngine::new(&[], &metadata, &timers).is_reversing());
    }

    #[test]
    fn descending_flips_tied_runs_only() {
        let metadata = metadata();
        let timers = HashMap::new();
        let canonical = vec![
            entity("A", 1.0),
            entity("B", 2.0),
            entity("C", 1.0),
            entity("D", 2.0),
        ];

        let ascending = by_value(SortDirection::Ascending);
        let sorted = full_sort(&SortEngine::new(&ascending, &metadata, &timers), &canonical);
        assert_eq!(ids(&sorted), vec!["A", "C", "B", "D"]);

        let descending = by_value(SortDirection::Descending);
        let sorted = full_sort(&SortEngine::new(&descending, &metadata, &timers), &canonical);
        assert_eq!(ids(&sorted), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn strictly_between_lands_between() {
        let metadata = metadata();
        let timers = HashMap::new();
        let sorts = by_value(SortDirection::Ascending);
        let engine = SortEngine::new(&sorts, &metadata, &timers);
        let sorted = vec![entity("A", 1.0), entity("B", 3.0)];
        let canonical = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        assert_eq!(engine.insertion_index(&sorted, &entity("C", 2.0), &canonical), 1);
        assert_eq!(engine.insertion_index(&sorted, &entity("C", 0.0), &canonical), 0);
        assert_eq!(engine.insertion_index(&sorted, &entity("C", 9.0), &canonical), 2);
    }

    #[test]
    fn tied_insertion_matches_full_sort() {
        let metadata = metadata();
        let timers = HashMap::new();
        let all = vec![
            entity("A", 1.0),
            entity("B", 1.0),
            entity("C", 1.0),
            entity("D", 1.0),
            entity("E", 5.0),
        ];
        let canonical: Vec<String> = all.iter().map(|entity| entity.identifier.clone()).collect();

        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            let sorts = by_value(direction);
            let engine = SortEngine::new(&sorts, &metadata, &timers);
            let expected = full_sort(&engine, &all);
            for left_out in 0..all.len() {
                let rest: Vec<_> = all
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| *index != left_out)
                    .map(|(_, entity)| Rc::clone(entity))
                    .collect();
                let mut sorted = full_sort(&engine, &rest);
                let index = engine.insertion_index(&sorted, &all[left_out], &canonical);
                sorted.insert(index, Rc::clone(&all[left_out]));
                assert_eq!(
                    ids(&sorted),
                    ids(&expected),
                    "{:?} inserting {}",
                    direction,
                    all[left_out].identifier
                );
            }
        }
    }

    #[test]
    fn missing_countdown_timers_sort_first() {
        let metadata = metadata();
        let timers: HashMap<String, CountdownTimer> = [
            ("A".to_string(), CountdownTimer::new(500)),
            ("C".to_string(), CountdownTimer::new(100)),
        ]
        .into_iter()
        .collect();
        let sorts = vec![Sort::new("expiration", SortDirection::Ascending, SortPriority::Primary)];
        let engine = SortEngine::new(&sorts, &metadata, &timers);

        let sorted = full_sort(
            &engine,
            &[entity("A", 0.0), entity("B", 0.0), entity("C", 0.0)],
        );
        assert_eq!(ids(&sorted), vec!["B", "C", "A"]);
    }

    #[test]
    fn unsortable_keys_fall_through_to_the_next_key() {
        let metadata = metadata();
        let timers = HashMap::new();
        let sorts = vec![
            Sort::new("unknown", SortDirection::Descending, SortPriority::Primary),
            Sort::new("value", SortDirection::Ascending, SortPriority::Secondary),
        ];
        let engine = SortEngine::new(&sorts, &metadata, &timers);
        assert_eq!(
            engine.compare(&entity("A", 1.0), &entity("B", 2.0)),
            Ordering::Less
        );
    }
}
