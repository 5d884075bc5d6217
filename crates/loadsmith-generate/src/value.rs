use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// One generated column value, bound as an insert parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl GeneratedValue {
    /// Convert a JSON scalar from the workload file. Lists and maps are not
    /// column values and yield `None`.
    pub fn from_scalar(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(GeneratedValue::Null),
            Value::Bool(value) => Some(GeneratedValue::Bool(*value)),
            Value::Number(number) => number
                .as_i64()
                .map(GeneratedValue::Int)
                .or_else(|| number.as_f64().map(GeneratedValue::Float)),
            Value::String(value) => Some(GeneratedValue::Text(value.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    /// Text form used for CSV files and log lines.
    pub fn to_csv(&self) -> String {
        match self {
            GeneratedValue::Null => String::new(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Text(value) => value.clone(),
            GeneratedValue::Uuid(value) => value.to_string(),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}
