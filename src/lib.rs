//! Hazard Console - the row engine behind a hazard event console.
//!
//! The console shows hazard events as a sortable table whose rows can be
//! expanded into the events' persisted versions. This crate keeps that table
//! in step with a backing event store: it builds immutable row entities,
//! orders them, pushes minimal insert/replace/remove operations to a view,
//! and reconciles user edits back into the store.
//!
//! # Features
//!
//! - Copy-on-write row entities that are reused when nothing visible changed
//! - Up to two sort keys, with tied rows flipping along with the sort direction
//! - Historical versions as child rows
//! - User edits checked by the store, with refused edits rolled back
//! - A scripted replay and text table for the command line
//!
//! # Example
//!
//! ```ignore
//! use hazard_console::config::ConsoleSettings;
//! use hazard_console::data::HazardEvent;
//! use hazard_console::manager::{RecordingView, TabularEntityManager};
//! use hazard_console::store::InMemoryEventStore;
//!
//! let mut store = InMemoryEventStore::new();
//! store.insert_event(HazardEvent::new("E1", 100, 200));
//!
//! let settings = ConsoleSettings::default();
//! let mut manager = TabularEntityManager::with_settings(store, RecordingView::new(), &settings)?;
//! manager.recreate_all_entities();
//! println!("{} rows", manager.root_entities().len());
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod columns;
pub mod config;
pub mod data;
pub mod entity;
pub mod error;
pub mod manager;
pub mod notification;
pub mod scenario;
pub mod store;
pub mod ui;

pub use error::{ConsoleError, Result};
