//! Core contracts for Loadsmith.
//!
//! This crate defines the declarative workload file (load rules, column
//! specs, run settings), its parsing and validation, and the configuration
//! error type shared by the generator and loader crates.

pub mod config;
pub mod error;
pub mod rules;
pub mod validation;

pub use config::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DECLARATIVE_WORKLOAD, WorkloadConfig,
};
pub use error::{ConfigError, Result};
pub use rules::{ColumnSpec, LoadRule};
pub use validation::validate_config;
