//! Plain-text rendering of the console table.

mod formatters;
mod table;

pub use formatters::{format_cell, format_countdown, format_date, format_number};
pub use table::render_table;
