//! Shared formatting utilities for table cells.

use chrono::{DateTime, Utc};

use crate::columns::CellType;
use crate::data::{CellValue, UNTIL_FURTHER_NOTICE_TIME};

/// Format epoch milliseconds as a UTC date and time.
pub fn format_date(millis: i64) -> String {
    if millis == UNTIL_FURTHER_NOTICE_TIME {
        return "Until Further Notice".to_string();
    }
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(date) => date.format("%Y-%m-%d %H:%MZ").to_string(),
        None => millis.to_string(),
    }
}

/// Format the time left on a countdown.
/// Examples: 2h 05m, 04:30, expired
pub fn format_countdown(remaining_millis: i64) -> String {
    if remaining_millis <= 0 {
        return "expired".to_string();
    }
    let seconds = remaining_millis / 1_000;
    if seconds >= 3_600 {
        format!("{}h {:02}m", seconds / 3_600, (seconds % 3_600) / 60)
    } else {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }
}

/// Format a number, dropping the fraction of whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format a cell for its column type. Empty cells show `display_empty_as`.
pub fn format_cell(value: Option<&CellValue>, cell_type: Option<CellType>, display_empty_as: Option<&str>) -> String {
    let text = match (value, cell_type) {
        (None, _) => None,
        (Some(value), Some(CellType::Date)) => value
            .as_date()
            .map(format_date)
            .or_else(|| value.as_text().map(str::to_string)),
        (Some(CellValue::Text(text)), _) => Some(text.clone()),
        (Some(CellValue::Number(number)), _) => Some(format_number(*number)),
        (Some(CellValue::Boolean(flag)), _) => Some(if *flag { "yes" } else { "no" }.to_string()),
        (Some(CellValue::Date(millis)), _) => Some(format_date(*millis)),
    };
    match text {
        Some(text) if !text.is_empty() => text,
        _ => display_empty_as.unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_are_utc() {
        assert_eq!(format_date(0), "1970-01-01 00:00Z");
        assert_eq!(format_date(UNTIL_FURTHER_NOTICE_TIME), "Until Further Notice");
    }

    #[test]
    fn countdowns() {
        assert_eq!(format_countdown(0), "expired");
        assert_eq!(format_countdown(270_000), "04:30");
        assert_eq!(format_countdown(7_500_000), "2h 05m");
    }

    #[test]
    fn cells_follow_column_type() {
        let date = CellValue::Number(60_000.0);
        assert_eq!(format_cell(Some(&date), Some(CellType::Date), None), "1970-01-01 00:01Z");
        assert_eq!(format_cell(Some(&date), Some(CellType::Number), None), "60000");
        assert_eq!(format_cell(None, Some(CellType::String), Some("-")), "-");
        assert_eq!(
            format_cell(Some(&CellValue::Text(String::new())), None, Some("(none)")),
            "(none)"
        );
    }
}
