//! Cell values stored in attribute maps.

use serde::{Deserialize, Serialize};

/// A single serializable table cell value.
///
/// Values deserialize untagged: JSON booleans become [`CellValue::Boolean`],
/// numbers become [`CellValue::Number`] and strings become [`CellValue::Text`].
/// [`CellValue::Date`] is only produced by derived entity properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Boolean flag.
    Boolean(bool),
    /// Numeric value.
    Number(f64),
    /// Free text.
    Text(String),
    /// Epoch milliseconds.
    Date(i64),
}

impl CellValue {
    /// Text view of the value, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric view of the value. Dates count as numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Date(millis) => Some(*millis as f64),
            _ => None,
        }
    }

    /// Date view of the value. Whole numbers are accepted as epoch milliseconds.
    pub fn as_date(&self) -> Option<i64> {
        match self {
            Self::Date(millis) => Some(*millis),
            Self::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_json_maps_to_variants() {
        let values: Vec<CellValue> = serde_json::from_str(r#"[true, 3.5, 12, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::Boolean(true),
                CellValue::Number(3.5),
                CellValue::Number(12.0),
                CellValue::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn whole_numbers_read_as_dates() {
        assert_eq!(CellValue::Number(1500.0).as_date(), Some(1500));
        assert_eq!(CellValue::Number(1.5).as_date(), None);
        assert_eq!(CellValue::Date(7).as_number(), Some(7.0));
    }
}
