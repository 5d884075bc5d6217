use thiserror::Error;

/// Configuration errors. All of them are raised before any database work
/// starts and none of them is ever retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The declarative load variant was selected with no load rules.
    #[error("load rules are empty")]
    EmptyRuleSet,
    /// A column names a generator the registry does not know.
    #[error("unknown generator '{name}'")]
    UnknownGenerator { name: String },
    /// A generator received the wrong number of positional parameters.
    #[error("{generator}: expected {expected} parameter(s), got {actual}")]
    InvalidParameterCount {
        generator: String,
        expected: usize,
        actual: usize,
    },
    /// A positional parameter has the wrong type or an out-of-range value.
    #[error("{generator}: invalid parameter #{index}: {reason}")]
    InvalidParameterType {
        generator: String,
        index: usize,
        reason: String,
    },
    /// The workload names a user routine set that is not registered.
    #[error("unknown workload '{0}'")]
    UnknownWorkload(String),
    /// The workload file violates a structural rule.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The workload file could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results returned by Loadsmith crates.
pub type Result<T> = std::result::Result<T, ConfigError>;
