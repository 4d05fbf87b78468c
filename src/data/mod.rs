//! Hazard event data.
//!
//! This module holds the records owned by the backing store: hazard events,
//! their time ranges and statuses, the cell values carried in attribute maps,
//! and the countdown timers driven from outside the console.

mod event;
mod timer;
mod value;

pub use event::{
    Color, EventStatus, HazardEvent, TimeRange, TimeResolution, HEADLINE_ATTRIBUTE,
    UNTIL_FURTHER_NOTICE_ATTRIBUTE, UNTIL_FURTHER_NOTICE_TIME,
};
pub use timer::CountdownTimer;
pub use value::CellValue;
