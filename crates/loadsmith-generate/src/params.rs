use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use loadsmith_core::ConfigError;

use crate::value::GeneratedValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Integral JSON number.
    Int,
    /// Any JSON number.
    Number,
    String,
    /// `YYYY-MM-DD` string.
    Date,
    /// RFC 3339 or `YYYY-MM-DD[T ]HH:MM:SS` string.
    Timestamp,
    /// Any non-list, non-map value.
    Scalar,
    /// Non-empty list of scalars.
    List,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind }
    }
}

/// Positional parameters that passed arity and type checks.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    generator: &'a str,
    values: &'a [Value],
}

/// Check the exact arity and the type of every positional parameter.
pub fn validate_params<'a>(
    generator: &'a str,
    values: &'a [Value],
    specs: &[ParamSpec],
) -> Result<Params<'a>, ConfigError> {
    if values.len() != specs.len() {
        return Err(ConfigError::InvalidParameterCount {
            generator: generator.to_string(),
            expected: specs.len(),
            actual: values.len(),
        });
    }

    let params = Params { generator, values };
    for (index, (spec, value)) in specs.iter().zip(values).enumerate() {
        if !kind_matches(spec.kind, value) {
            return Err(params.invalid(
                index,
                format!("'{}' must be {}", spec.name, describe(spec.kind)),
            ));
        }
    }

    Ok(params)
}

impl<'a> Params<'a> {
    pub fn generator(&self) -> &'a str {
        self.generator
    }

    pub fn int(&self, index: usize) -> Result<i64, ConfigError> {
        self.get(index)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.invalid(index, "expected an integer"))
    }

    /// Integer parameter that must not be negative.
    pub fn non_negative(&self, index: usize) -> Result<usize, ConfigError> {
        let value = self.int(index)?;
        usize::try_from(value).map_err(|_| self.invalid(index, "must be >= 0"))
    }

    pub fn number(&self, index: usize) -> Result<f64, ConfigError> {
        self.get(index)
            .and_then(Value::as_f64)
            .ok_or_else(|| self.invalid(index, "expected a number"))
    }

    pub fn string(&self, index: usize) -> Result<&'a str, ConfigError> {
        self.get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| self.invalid(index, "expected a string"))
    }

    pub fn date(&self, index: usize) -> Result<NaiveDate, ConfigError> {
        parse_date_value(self.string(index)?)
            .ok_or_else(|| self.invalid(index, "expected a YYYY-MM-DD date"))
    }

    pub fn timestamp(&self, index: usize) -> Result<NaiveDateTime, ConfigError> {
        parse_timestamp_value(self.string(index)?)
            .ok_or_else(|| self.invalid(index, "expected a timestamp"))
    }

    pub fn scalar(&self, index: usize) -> Result<GeneratedValue, ConfigError> {
        self.get(index)
            .and_then(GeneratedValue::from_scalar)
            .ok_or_else(|| self.invalid(index, "expected a scalar"))
    }

    pub fn list(&self, index: usize) -> Result<Vec<GeneratedValue>, ConfigError> {
        let items = self
            .get(index)
            .and_then(Value::as_array)
            .ok_or_else(|| self.invalid(index, "expected a list"))?;
        items
            .iter()
            .map(|item| {
                GeneratedValue::from_scalar(item)
                    .ok_or_else(|| self.invalid(index, "list items must be scalars"))
            })
            .collect()
    }

    /// Build an `InvalidParameterType` error for the parameter at `index`.
    pub fn invalid(&self, index: usize, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidParameterType {
            generator: self.generator.to_string(),
            index,
            reason: reason.into(),
        }
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        self.values.get(index)
    }
}

fn kind_matches(kind: ParamKind, value: &Value) -> bool {
    match kind {
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Number => value.is_number(),
        ParamKind::String => value.is_string(),
        ParamKind::Date => value.as_str().and_then(parse_date_value).is_some(),
        ParamKind::Timestamp => value.as_str().and_then(parse_timestamp_value).is_some(),
        ParamKind::Scalar => !value.is_array() && !value.is_object(),
        ParamKind::List => value.as_array().is_some_and(|items| {
            !items.is_empty() && items.iter().all(|item| !item.is_array() && !item.is_object())
        }),
    }
}

fn describe(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Int => "an integer",
        ParamKind::Number => "a number",
        ParamKind::String => "a string",
        ParamKind::Date => "a YYYY-MM-DD date",
        ParamKind::Timestamp => "a timestamp",
        ParamKind::Scalar => "a scalar",
        ParamKind::List => "a non-empty list of scalars",
    }
}

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_timestamp_value(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RANGE: &[ParamSpec] = &[
        ParamSpec::new("min", ParamKind::Int),
        ParamSpec::new("max", ParamKind::Int),
    ];

    #[test]
    fn arity_is_exact() {
        let values = vec![json!(1)];
        let err = validate_params("RandomInt", &values, RANGE).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameterCount {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn float_is_not_an_int() {
        let values = vec![json!(1), json!(2.5)];
        let err = validate_params("RandomInt", &values, RANGE).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameterType { index: 1, .. }
        ));
    }

    #[test]
    fn list_rejects_nested_lists() {
        let specs = [ParamSpec::new("values", ParamKind::List)];
        assert!(validate_params("OneOf", &[json!([1, "a"])], &specs).is_ok());
        assert!(validate_params("OneOf", &[json!([[1]])], &specs).is_err());
        assert!(validate_params("OneOf", &[json!([])], &specs).is_err());
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive_forms() {
        assert!(parse_timestamp_value("2024-01-01T10:00:00Z").is_some());
        assert!(parse_timestamp_value("2024-01-01 10:00:00").is_some());
        assert!(parse_timestamp_value("yesterday").is_none());
    }
}
