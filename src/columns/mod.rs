//! Column and sort metadata.
//!
//! [`ConsoleColumns`] is the console's own, immutable picture of the table
//! columns. The settings layer keeps its own [`Column`] records; console-side
//! changes such as a resized column flow back through
//! [`ConsoleColumns::modified_columns_for_names`].

mod sort;

pub use sort::{
    normalize_sorts, CellComparator, CellType, Sort, SortDirection, SortKey, SortMetadata,
    SortPriority,
};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Column record as kept by the settings layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Attribute identifier whose values fill the column.
    pub field_name: String,
    /// Cell type tag: `string`, `date`, `number`, `boolean` or `countdown`.
    #[serde(rename = "type")]
    pub cell_type: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Attribute identifier supplying hover text.
    #[serde(default)]
    pub hint_text_field_name: Option<String>,
    /// Text shown for empty cells.
    #[serde(default)]
    pub display_empty_as: Option<String>,
}

impl Column {
    /// Create a column record.
    pub fn new(field_name: impl Into<String>, cell_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            cell_type: cell_type.into(),
            width: None,
            hint_text_field_name: None,
            display_empty_as: None,
        }
    }

    /// Builder-style helper setting the width.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Builder-style helper setting the empty-cell text.
    pub fn with_display_empty_as(mut self, text: impl Into<String>) -> Self {
        self.display_empty_as = Some(text.into());
        self
    }
}

/// The console's definition of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    /// Attribute identifier whose values fill the column.
    pub identifier: String,
    /// Cell type tag.
    #[serde(rename = "type")]
    pub cell_type: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Attribute identifier supplying hover text.
    #[serde(default)]
    pub hint_text_identifier: Option<String>,
    /// Text shown for empty cells.
    #[serde(default)]
    pub display_empty_as: Option<String>,
}

impl From<&Column> for ColumnDefinition {
    fn from(column: &Column) -> Self {
        Self {
            identifier: column.field_name.clone(),
            cell_type: column.cell_type.clone(),
            width: column.width,
            hint_text_identifier: column.hint_text_field_name.clone(),
            display_empty_as: column.display_empty_as.clone(),
        }
    }
}

impl ColumnDefinition {
    /// Whether `column` already agrees with every field this definition overrides.
    fn matches(&self, column: &Column) -> bool {
        self.identifier == column.field_name
            && self.cell_type == column.cell_type
            && self.width == column.width
            && self.hint_text_identifier == column.hint_text_field_name
            && self.display_empty_as == column.display_empty_as
    }

    fn to_column(&self) -> Column {
        Column {
            field_name: self.identifier.clone(),
            cell_type: self.cell_type.clone(),
            width: self.width,
            hint_text_field_name: self.hint_text_identifier.clone(),
            display_empty_as: self.display_empty_as.clone(),
        }
    }
}

/// Column definitions by column name, plus the visible column order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleColumns {
    definitions_for_names: BTreeMap<String, ColumnDefinition>,
    visible_column_names: Vec<String>,
}

impl ConsoleColumns {
    /// Create a column set.
    pub fn new(
        definitions_for_names: BTreeMap<String, ColumnDefinition>,
        visible_column_names: Vec<String>,
    ) -> Self {
        Self {
            definitions_for_names,
            visible_column_names,
        }
    }

    /// Build the console's column set from settings records.
    pub fn from_columns(columns_for_names: &BTreeMap<String, Column>, visible_column_names: Vec<String>) -> Self {
        let definitions_for_names = columns_for_names
            .iter()
            .map(|(name, column)| (name.clone(), ColumnDefinition::from(column)))
            .collect();
        Self::new(definitions_for_names, visible_column_names)
    }

    /// Definitions by column name.
    pub fn definitions_for_names(&self) -> &BTreeMap<String, ColumnDefinition> {
        &self.definitions_for_names
    }

    /// Visible column names, in display order.
    pub fn visible_column_names(&self) -> &[String] {
        &self.visible_column_names
    }

    /// Definition of one column.
    pub fn definition(&self, name: &str) -> Option<&ColumnDefinition> {
        self.definitions_for_names.get(name)
    }

    /// Visible columns with their definitions, in display order. Names without
    /// a definition are skipped.
    pub fn visible_definitions(&self) -> impl Iterator<Item = (&str, &ColumnDefinition)> + '_ {
        self.visible_column_names.iter().filter_map(|name| {
            self.definitions_for_names
                .get(name)
                .map(|definition| (name.as_str(), definition))
        })
    }

    /// Copy of this column set with one column resized.
    pub fn with_column_width(&self, name: &str, width: u32) -> Self {
        let mut columns = self.clone();
        if let Some(definition) = columns.definitions_for_names.get_mut(name) {
            definition.width = Some(width);
        }
        columns
    }

    /// Apply this column set's definitions to settings column records.
    ///
    /// A record that already agrees with its definition, or that has no
    /// definition here, comes back borrowed, so callers can tell with
    /// [`Cow::Borrowed`] that nothing changed for it.
    pub fn modified_columns_for_names<'a>(
        &self,
        columns_for_names: &'a BTreeMap<String, Column>,
    ) -> BTreeMap<String, Cow<'a, Column>> {
        columns_for_names
            .iter()
            .map(|(name, column)| {
                let column = match self.definitions_for_names.get(name) {
                    Some(definition) if !definition.matches(column) => {
                        Cow::Owned(definition.to_column())
                    },
                    _ => Cow::Borrowed(column),
                };
                (name.clone(), column)
            })
            .collect()
    }
}
