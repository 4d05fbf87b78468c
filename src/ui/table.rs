//! Text table of the console rows.

use std::collections::HashMap;
use std::rc::Rc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::formatters::{format_cell, format_countdown};
use crate::columns::{CellType, ColumnDefinition, ConsoleColumns};
use crate::data::CountdownTimer;
use crate::entity::TabularEntity;

/// Widest a column may get, in terminal cells.
const MAX_COLUMN_WIDTH: usize = 40;

/// Render root rows, and their historical children when present, as a table
/// of the visible columns. Countdown cells show the time left at `now`.
pub fn render_table(
    rows: &[Rc<TabularEntity>],
    columns: &ConsoleColumns,
    countdown_timers: &HashMap<String, CountdownTimer>,
    now: i64,
) -> String {
    let visible: Vec<(&str, &ColumnDefinition)> = columns.visible_definitions().collect();

    let mut lines: Vec<(String, Vec<String>)> = Vec::new();
    for row in rows {
        lines.push((flags(row), cells(row, &visible, countdown_timers, now)));
        for (position, child) in row.children.iter().enumerate() {
            let connector = if position + 1 == row.children.len() {
                "└── "
            } else {
                "├── "
            };
            let mut child_cells = cells(child, &visible, countdown_timers, now);
            if let Some(first) = child_cells.first_mut() {
                *first = format!("{}{}", connector, first);
            }
            lines.push((flags(child), child_cells));
        }
    }

    let mut widths: Vec<usize> = visible
        .iter()
        .map(|(name, _)| name.width().min(MAX_COLUMN_WIDTH))
        .collect();
    for (_, cells) in &lines {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.width()).min(MAX_COLUMN_WIDTH);
        }
    }

    let mut text = String::new();
    let header: Vec<String> = visible.iter().map(|(name, _)| name.to_string()).collect();
    text.push_str(&format_line("   ", &header, &widths));
    let rule_width = widths.iter().sum::<usize>() + 2 * widths.len() + 3;
    text.push_str(&"─".repeat(rule_width));
    text.push('\n');
    for (flags, cells) in &lines {
        text.push_str(&format_line(flags, cells, &widths));
    }
    text
}

/// Three marker cells: checked, selected, unsaved.
fn flags(entity: &TabularEntity) -> String {
    let mut flags = String::with_capacity(3);
    flags.push(if entity.checked { 'x' } else { ' ' });
    flags.push(if entity.selected { '*' } else { ' ' });
    flags.push(if entity.unsaved { '!' } else { ' ' });
    flags
}

fn cells(
    entity: &TabularEntity,
    visible: &[(&str, &ColumnDefinition)],
    countdown_timers: &HashMap<String, CountdownTimer>,
    now: i64,
) -> Vec<String> {
    visible
        .iter()
        .map(|(_, definition)| {
            let cell_type = definition.cell_type.parse::<CellType>().ok();
            let empty = definition.display_empty_as.as_deref();
            if cell_type == Some(CellType::Countdown) {
                // Historical versions have no running timer.
                return match countdown_timers.get(&entity.identifier) {
                    Some(timer) if !entity.is_historical() => format_countdown(timer.remaining_millis(now)),
                    _ => empty.unwrap_or_default().to_string(),
                };
            }
            format_cell(entity.attribute(&definition.identifier), cell_type, empty)
        })
        .collect()
}

fn format_line(flags: &str, cells: &[String], widths: &[usize]) -> String {
    let mut line = flags.to_string();
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str("  ");
        line.push_str(&pad(cell, *width));
    }
    let trimmed = line.trim_end().len();
    line.truncate(trimmed);
    line.push('\n');
    line
}

/// Pad or truncate to exactly `width` terminal cells.
fn pad(text: &str, width: usize) -> String {
    if text.width() <= width {
        return format!("{}{}", text, " ".repeat(width - text.width()));
    }
    let mut result = String::new();
    let mut used = 0;
    for c in text.chars() {
        let char_width = c.width().unwrap_or(0);
        if used + char_width + 1 > width {
            break;
        }
        result.push(c);
        used += char_width;
    }
    result.push('…');
    used += 1;
    result.push_str(&" ".repeat(width.saturating_sub(used)));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::Column;
    use crate::data::CellValue;
    use std::collections::BTreeMap;

    fn entity(identifier: &str, history_index: Option<usize>) -> TabularEntity {
        let mut entity = TabularEntity::empty(identifier, history_index);
        entity
            .attributes
            .insert("eventId".to_string(), CellValue::Text(identifier.to_string()));
        entity
    }

    fn columns() -> ConsoleColumns {
        let columns: BTreeMap<String, Column> = [
            ("Event ID".to_string(), Column::new("eventId", "string")),
            ("Remaining".to_string(), Column::new("timeRemaining", "countdown")),
        ]
        .into_iter()
        .collect();
        ConsoleColumns::from_columns(&columns, vec!["Event ID".to_string(), "Remaining".to_string()])
    }

    #[test]
    fn history_rows_use_tree_connectors() {
        let mut root = entity("E1", None);
        root.children = vec![
            Rc::new(entity("E1", Some(1))),
            Rc::new(entity("E1", Some(0))),
        ];
        let text = render_table(&[Rc::new(root)], &columns(), &HashMap::new(), 0);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].contains("Event ID"));
        assert!(lines[2].contains("E1"));
        assert!(lines[3].contains("├── E1"));
        assert!(lines[4].contains("└── E1"));
    }

    #[test]
    fn countdowns_only_on_current_rows() {
        let mut root = entity("E1", None);
        root.selected = true;
        root.children = vec![Rc::new(entity("E1", Some(0)))];
        let timers: HashMap<String, CountdownTimer> =
            [("E1".to_string(), CountdownTimer::new(90_000))].into_iter().collect();

        let text = render_table(&[Rc::new(root)], &columns(), &timers, 0);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[2].starts_with(" * "));
        assert!(lines[2].ends_with("01:30"));
        assert!(!lines[3].contains("01:30"));
    }

    #[test]
    fn long_cells_are_truncated_to_width() {
        assert_eq!(pad("abcdef", 4), "abc…");
        assert_eq!(pad("ab", 4), "ab  ");
    }
}
