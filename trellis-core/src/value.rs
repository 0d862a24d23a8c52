use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Bin, EMPTY_LABEL};

/// Giá trị đã phân giải của một trục (hoặc thuộc tính gốc của sự kiện).
///
/// Serde untagged: `null` là [`Value::Empty`], chuỗi RFC 3339 thành ngày,
/// chuỗi khác thành text, mảng thành list, object thành map theo thuốc.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Empty,
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
    Bin(Bin),
    List(Vec<Value>),
    PerDrug(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty | Value::Bin(Bin::Empty))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// Chuyển giá trị nguồn có thể vắng mặt; vắng mặt thành [`Value::Empty`].
    pub fn from_option<T: Into<Value>>(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Empty)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Value::Empty
        } else {
            Value::Number(value)
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<Bin> for Value {
    fn from(value: Bin) -> Self {
        Value::Bin(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str(EMPTY_LABEL),
            Value::Number(value) => f.write_str(&format_numeric(*value)),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::Text(value) => f.write_str(value),
            Value::Bin(bin) => write!(f, "{bin}"),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(Value::to_string).collect();
                f.write_str(&rendered.join(", "))
            }
            Value::PerDrug(map) => {
                let rendered: Vec<String> = map
                    .iter()
                    .map(|(drug, value)| format!("{drug}--{value}"))
                    .collect();
                f.write_str(&rendered.join(", "))
            }
        }
    }
}

/// Số nguyên bỏ phần thập phân, số một chữ số thập phân giữ đúng một chữ số.
pub fn format_numeric(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else if (value * 10.0).fract().abs() < f64::EPSILON {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_json_maps_onto_variants() {
        let parsed: BTreeMap<String, Value> = serde_json::from_str(
            r#"{"grade": 2, "note": null, "term": "Nausea",
                "onset": "2024-01-05T00:00:00Z",
                "dose": {"Drug A": 100}, "cycles": [1, 2]}"#,
        )
        .unwrap();

        assert_eq!(parsed["grade"], Value::Number(2.0));
        assert_eq!(parsed["note"], Value::Empty);
        assert_eq!(parsed["term"], Value::Text("Nausea".to_string()));
        assert!(parsed["onset"].as_date().is_some());
        assert!(matches!(parsed["dose"], Value::PerDrug(_)));
        assert_eq!(
            parsed["cycles"],
            Value::List(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn renders_numbers_compactly() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(0.125).to_string(), "0.125");
        assert_eq!(Value::Empty.to_string(), "(Empty)");
    }

    #[test]
    fn nan_becomes_empty() {
        assert_eq!(Value::from(f64::NAN), Value::Empty);
        assert_eq!(Value::from_option::<f64>(None), Value::Empty);
    }
}
