//! Console settings.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::columns::{Column, ConsoleColumns, Sort, SortDirection, SortPriority};
use crate::error::{ConsoleError, Result};
use crate::store::EventFilter;

/// Settings the console is configured from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleSettings {
    /// Column records by column name.
    pub columns: BTreeMap<String, Column>,
    /// Names of the visible columns, in display order.
    pub visible_columns: Vec<String>,
    /// Active sorts.
    pub sorts: Vec<Sort>,
    /// Which events are shown.
    pub filter: EventFilter,
    /// Whether historical versions are shown as child rows.
    pub show_history_list: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        let columns = [
            ("Event ID", Column::new("eventId", "string").with_width(80)),
            ("Lock Status", Column::new("lockStatus", "string").with_width(120)),
            ("Hazard Type", Column::new("hazardType", "string").with_width(80)),
            ("Status", Column::new("status", "string").with_width(80)),
            ("Start Time", Column::new("startTime", "date").with_width(130)),
            ("End Time", Column::new("endTime", "date").with_width(130)),
            ("Time Remaining", Column::new("timeRemaining", "countdown").with_width(100)),
            ("Headline", Column::new("headline", "string").with_display_empty_as("(none)")),
            ("Creation Time", Column::new("creationTime", "date").with_width(130)),
            ("Site ID", Column::new("siteID", "string").with_width(60)),
        ];
        let visible_columns = [
            "Event ID",
            "Hazard Type",
            "Status",
            "Start Time",
            "End Time",
            "Time Remaining",
            "Lock Status",
            "Headline",
        ];
        Self {
            columns: columns
                .into_iter()
                .map(|(name, column)| (name.to_string(), column))
                .collect(),
            visible_columns: visible_columns.iter().map(|name| name.to_string()).collect(),
            sorts: vec![Sort::new("startTime", SortDirection::Ascending, SortPriority::Primary)],
            filter: EventFilter::default(),
            show_history_list: false,
        }
    }
}

impl ConsoleSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ConsoleError::file_open(path.to_path_buf(), e))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// The console's view of the configured columns.
    pub fn console_columns(&self) -> ConsoleColumns {
        ConsoleColumns::from_columns(&self.columns, self.visible_columns.clone())
    }

    /// Take over column changes made in the console, such as a resized
    /// column. Returns whether any setting changed.
    pub fn apply_console_columns(&mut self, console_columns: &ConsoleColumns) -> bool {
        let modified: Vec<(String, Column)> = console_columns
            .modified_columns_for_names(&self.columns)
            .into_iter()
            .filter_map(|(name, column)| match column {
                Cow::Owned(column) => Some((name, column)),
                Cow::Borrowed(_) => None,
            })
            .collect();
        let visible_changed = console_columns.visible_column_names() != self.visible_columns.as_slice();

        let changed = !modified.is_empty() || visible_changed;
        for (name, column) in modified {
            tracing::debug!("Column {} changed in the console", name);
            self.columns.insert(name, column);
        }
        if visible_changed {
            self.visible_columns = console_columns.visible_column_names().to_vec();
        }
        changed
    }
}
