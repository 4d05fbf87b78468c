//! Push interface to the table widget.

use std::fmt;
use std::rc::Rc;

use crate::entity::TabularEntity;

/// Receives row operations from the manager, which is its only writer.
pub trait ConsoleView {
    /// Insert a root row.
    fn insert_element(&mut self, index: usize, entity: Rc<TabularEntity>);

    /// Replace a root row.
    fn replace_element(&mut self, index: usize, entity: Rc<TabularEntity>);

    /// Remove a root row.
    fn remove_element(&mut self, index: usize);

    /// Replace every root row.
    fn set_all(&mut self, entities: Vec<Rc<TabularEntity>>);
}

/// One operation pushed to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOperation {
    /// Row inserted.
    Insert {
        /// Row index.
        index: usize,
        /// Event identifier.
        identifier: String,
    },
    /// Row replaced.
    Replace {
        /// Row index.
        index: usize,
        /// Event identifier.
        identifier: String,
    },
    /// Row removed.
    Remove {
        /// Row index.
        index: usize,
    },
    /// All rows replaced.
    SetAll {
        /// Event identifiers in row order.
        identifiers: Vec<String>,
    },
}

impl fmt::Display for ViewOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { index, identifier } => write!(f, "insert {} at {}", identifier, index),
            Self::Replace { index, identifier } => write!(f, "replace {} at {}", identifier, index),
            Self::Remove { index } => write!(f, "remove at {}", index),
            Self::SetAll { identifiers } => write!(f, "set all [{}]", identifiers.join(", ")),
        }
    }
}

/// View that mirrors the rows it is given and logs every operation.
#[derive(Debug, Default)]
pub struct RecordingView {
    rows: Vec<Rc<TabularEntity>>,
    operations: Vec<ViewOperation>,
}

impl RecordingView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows as last pushed.
    pub fn rows(&self) -> &[Rc<TabularEntity>] {
        &self.rows
    }

    /// Identifiers of the rows, in order.
    pub fn row_identifiers(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.identifier.as_str())
            .collect()
    }

    /// Every operation received so far.
    pub fn operations(&self) -> &[ViewOperation] {
        &self.operations
    }

    /// Take the operation log, leaving it empty.
    pub fn take_operations(&mut self) -> Vec<ViewOperation> {
        std::mem::take(&mut self.operations)
    }
}

impl ConsoleView for RecordingView {
    fn insert_element(&mut self, index: usize, entity: Rc<TabularEntity>) {
        self.operations.push(ViewOperation::Insert {
            index,
            identifier: entity.identifier.clone(),
        });
        self.rows.insert(index, entity);
    }

    fn replace_element(&mut self, index: usize, entity: Rc<TabularEntity>) {
        self.operations.push(ViewOperation::Replace {
            index,
            identifier: entity.identifier.clone(),
        });
        if let Some(row) = self.rows.get_mut(index) {
            *row = entity;
        }
    }

    fn remove_element(&mut self, index: usize) {
        self.operations.push(ViewOperation::Remove { index });
        if index < self.rows.len() {
            self.rows.remove(index);
        }
    }

    fn set_all(&mut self, entities: Vec<Rc<TabularEntity>>) {
        self.operations.push(ViewOperation::SetAll {
            identifiers: entities
                .iter()
                .map(|entity| entity.identifier.clone())
                .collect(),
        });
        self.rows = entities;
    }
}
