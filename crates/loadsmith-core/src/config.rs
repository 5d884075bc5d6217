use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};
use crate::rules::LoadRule;

/// Batch size used when the workload file does not set one.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Retry ceiling per call site when the workload file does not set one.
pub const DEFAULT_MAX_RETRIES: u32 = 10;
/// Workload name used when the file does not select a user routine set.
pub const DECLARATIVE_WORKLOAD: &str = "declarative";

/// Parsed workload file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadConfig {
    /// User routine set providing create/load/after-load hooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
    /// DDL statements executed in order during the create phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Vec<String>>,
    /// Tables to fill with generated rows.
    #[serde(default)]
    pub load_rules: Vec<LoadRule>,
    /// Rows per flushed insert batch, shared by every loader unit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retry ceiling for each call site.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base seed for deterministic generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Free-form parameters consumed by user workloads.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            workload: None,
            create: None,
            load_rules: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            seed: None,
            properties: Map::new(),
        }
    }
}

impl WorkloadConfig {
    /// Read a workload file, picking the decoder from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::Parse(format!(
                "unsupported workload file extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Name of the routine set driving the create and load phases.
    pub fn workload_name(&self) -> &str {
        self.workload.as_deref().unwrap_or(DECLARATIVE_WORKLOAD)
    }

    /// DDL list for the create phase, if the file provides one.
    pub fn create_statements(&self) -> Option<&[String]> {
        self.create.as_deref()
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(Value::as_str)
    }

    pub fn property_u64(&self, key: &str) -> Option<u64> {
        self.property(key).and_then(Value::as_u64)
    }

    pub fn property_bool(&self, key: &str) -> Option<bool> {
        self.property(key).and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config = WorkloadConfig::from_json_str(r#"{"loadRules": []}"#).unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.workload_name(), DECLARATIVE_WORKLOAD);
        assert!(config.create_statements().is_none());
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = WorkloadConfig::from_path(Path::new("workload.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_) | ConfigError::Parse(_)));
    }
}
