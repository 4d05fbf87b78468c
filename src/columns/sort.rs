//! Sort keys and per-column comparators.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use super::ConsoleColumns;
use crate::data::CellValue;
use crate::error::{ConsoleError, Result};

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Position in declaration order: 0 for ascending, 1 for descending.
    pub fn ordinal(self) -> usize {
        match self {
            Self::Ascending => 0,
            Self::Descending => 1,
        }
    }

    /// The opposite direction.
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Orient an ascending comparison result.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Evaluation order of a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SortPriority {
    /// Evaluated first.
    Primary,
    /// Breaks ties left by the primary key.
    Secondary,
}

impl TryFrom<u8> for SortPriority {
    type Error = ConsoleError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Primary),
            2 => Ok(Self::Secondary),
            other => Err(ConsoleError::InvalidSortConfiguration(format!(
                "priority must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl From<SortPriority> for u8 {
    fn from(priority: SortPriority) -> Self {
        match priority {
            SortPriority::Primary => 1,
            SortPriority::Secondary => 2,
        }
    }
}

/// One active sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
    /// Column identifier to sort on.
    pub attribute_identifier: String,
    /// Direction.
    #[serde(default)]
    pub direction: SortDirection,
    /// Evaluation order.
    pub priority: SortPriority,
}

impl Sort {
    /// Create a sort key.
    pub fn new(
        attribute_identifier: impl Into<String>,
        direction: SortDirection,
        priority: SortPriority,
    ) -> Self {
        Self {
            attribute_identifier: attribute_identifier.into(),
            direction,
            priority,
        }
    }
}

/// Check a sort list and order it by priority.
pub fn normalize_sorts(mut sorts: Vec<Sort>) -> Result<Vec<Sort>> {
    if sorts.len() > 2 {
        return Err(ConsoleError::InvalidSortConfiguration(format!(
            "at most two sort keys are allowed, got {}",
            sorts.len()
        )));
    }
    sorts.sort_by_key(|sort| sort.priority);
    if sorts.len() == 2 && sorts[0].priority == sorts[1].priority {
        return Err(ConsoleError::InvalidSortConfiguration(
            "sort keys must have distinct priorities".to_string(),
        ));
    }
    Ok(sorts)
}

/// Declared type of a column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Text.
    String,
    /// Epoch milliseconds.
    Date,
    /// Number.
    Number,
    /// Flag.
    Boolean,
    /// Live countdown; sorted by timer expiration.
    Countdown,
}

impl FromStr for CellType {
    type Err = String;

    fn from_str(tag: &str) -> std::result::Result<Self, Self::Err> {
        match tag {
            "string" => Ok(Self::String),
            "date" => Ok(Self::Date),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "countdown" => Ok(Self::Countdown),
            other => Err(other.to_string()),
        }
    }
}

/// Natural-order comparison of cell values; absent or mistyped values sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellComparator {
    /// Lexicographic.
    Text,
    /// Chronological.
    Date,
    /// Numeric.
    Number,
    /// `false` before `true`.
    Boolean,
}

impl CellComparator {
    /// Comparator for a cell type; `None` for countdown columns.
    pub fn for_type(cell_type: CellType) -> Option<Self> {
        match cell_type {
            CellType::String => Some(Self::Text),
            CellType::Date => Some(Self::Date),
            CellType::Number => Some(Self::Number),
            CellType::Boolean => Some(Self::Boolean),
            CellType::Countdown => None,
        }
    }

    /// Compare two cells in ascending order.
    pub fn compare(self, a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
        match self {
            Self::Text => nulls_first(
                a.and_then(CellValue::as_text),
                b.and_then(CellValue::as_text),
                |a, b| a.cmp(b),
            ),
            Self::Date => nulls_first(
                a.and_then(CellValue::as_date),
                b.and_then(CellValue::as_date),
                |a, b| a.cmp(&b),
            ),
            Self::Number => nulls_first(
                a.and_then(CellValue::as_number),
                b.and_then(CellValue::as_number),
                |a, b| a.total_cmp(&b),
            ),
            Self::Boolean => nulls_first(
                a.and_then(CellValue::as_boolean),
                b.and_then(CellValue::as_boolean),
                |a, b| a.cmp(&b),
            ),
        }
    }
}

/// Order two optional values with `None` first.
pub(crate) fn nulls_first<T>(a: Option<T>, b: Option<T>, compare: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare(a, b),
    }
}

/// How a sort key is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Compare cell values.
    Cell(CellComparator),
    /// Compare countdown timer expirations.
    Countdown,
}

/// Comparators and cell types by column identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortMetadata {
    /// `None` marks a countdown column.
    comparators_for_identifiers: HashMap<String, Option<CellComparator>>,
    types_for_identifiers: HashMap<String, CellType>,
}

impl SortMetadata {
    /// Derive comparators from column definitions. Columns with an
    /// unrecognized type are logged and left unsortable.
    pub fn from_columns(columns: &ConsoleColumns) -> Self {
        let mut metadata = Self::default();
        for definition in columns.definitions_for_names().values() {
            let cell_type = match definition.cell_type.parse::<CellType>() {
                Ok(cell_type) => cell_type,
                Err(tag) => {
                    let error = ConsoleError::unrecognized_column_type(&definition.identifier, tag);
                    tracing::error!("{}", error);
                    continue;
                },
            };
            metadata
                .comparators_for_identifiers
                .insert(definition.identifier.clone(), CellComparator::for_type(cell_type));
            metadata
                .types_for_identifiers
                .insert(definition.identifier.clone(), cell_type);
        }
        metadata
    }

    /// How to evaluate a sort on `identifier`; `None` if the column is unsortable.
    pub fn sort_key(&self, identifier: &str) -> Option<SortKey> {
        self.comparators_for_identifiers
            .get(identifier)
            .map(|comparator| match comparator {
                Some(comparator) => SortKey::Cell(*comparator),
                None => SortKey::Countdown,
            })
    }

    /// Declared type of a column.
    pub fn cell_type(&self, identifier: &str) -> Option<CellType> {
        self.types_for_identifiers.get(identifier).copied()
    }

    /// Whether `identifier` is a countdown column.
    pub fn is_countdown(&self, identifier: &str) -> bool {
        self.cell_type(identifier) == Some(CellType::Countdown)
    }
}
