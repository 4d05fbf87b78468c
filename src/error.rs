//! Error types for the hazard console.
//!
//! This module provides a unified error handling approach using `thiserror`.
//! Backing-store rejections are not errors; they are reported as
//! [`ChangeOutcome::Rejected`](crate::store::ChangeOutcome) and absorbed by re-syncing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hazard console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Errors that can occur in the hazard console.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A historical (read-only) row was submitted as a user edit.
    #[error("Historical entity submitted as a user edit: {identifier} (history index {history_index})")]
    HistoricalEntityEdit {
        /// Event identifier of the offending entity.
        identifier: String,
        /// History index of the offending entity.
        history_index: usize,
    },

    /// A column declares a cell type the sort engine does not know.
    #[error("Unrecognized type \"{type_tag}\" for column {column}")]
    UnrecognizedColumnType {
        /// Column identifier.
        column: String,
        /// The offending type tag.
        type_tag: String,
    },

    /// The sort list is not usable.
    #[error("Invalid sort configuration: {0}")]
    InvalidSortConfiguration(String),

    /// Several values were pushed at once into a channel that holds a single value.
    #[error("Unsupported bulk change on single-value channel: {channel}")]
    UnsupportedBulkChange {
        /// Name of the channel.
        channel: String,
    },

    /// An event identifier could not be resolved.
    #[error("Event not found: {identifier}")]
    MissingEvent {
        /// The unresolved identifier.
        identifier: String,
    },

    /// Failed to open a settings or scenario file.
    #[error("Failed to open file: {path}")]
    FileOpen {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON in a settings or scenario file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Create a HistoricalEntityEdit error.
    pub fn historical_entity_edit(identifier: impl Into<String>, history_index: usize) -> Self {
        Self::HistoricalEntityEdit {
            identifier: identifier.into(),
            history_index,
        }
    }

    /// Create an UnrecognizedColumnType error.
    pub fn unrecognized_column_type(column: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self::UnrecognizedColumnType {
            column: column.into(),
            type_tag: type_tag.into(),
        }
    }

    /// Create an UnsupportedBulkChange error.
    pub fn unsupported_bulk_change(channel: impl Into<String>) -> Self {
        Self::UnsupportedBulkChange {
            channel: channel.into(),
        }
    }

    /// Create a MissingEvent error.
    pub fn missing_event(identifier: impl Into<String>) -> Self {
        Self::MissingEvent {
            identifier: identifier.into(),
        }
    }

    /// Create a FileOpen error.
    pub fn file_open(path: PathBuf, source: std::io::Error) -> Self {
        Self::FileOpen { path, source }
    }
}
