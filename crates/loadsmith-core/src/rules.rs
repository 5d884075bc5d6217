use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declarative description of one target table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoadRule {
    /// Table name. With `count` this is the prefix of the replicated tables.
    pub table: String,
    /// Number of rows to insert into each physical table.
    pub rows: u64,
    /// Replicate the table `count` times as `<table>1 .. <table>count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Columns in insertion order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl LoadRule {
    /// Physical table names produced by this rule, in creation order.
    pub fn table_names(&self) -> Vec<String> {
        match self.count {
            Some(count) => (1..=count).map(|i| format!("{}{i}", self.table)).collect(),
            None => vec![self.table.clone()],
        }
    }
}

/// Declarative description of one column and its value generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    pub name: String,
    /// Generator name, resolved against the generator registry.
    pub util: String,
    /// Replicate the column `count` times as `<name>1 .. <name>count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Positional generator parameters (scalars or nested lists).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<serde_json::Value>,
}

impl ColumnSpec {
    /// Physical column names produced by this spec, in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        match self.count {
            Some(count) => (1..=count).map(|i| format!("{}{i}", self.name)).collect(),
            None => vec![self.name.clone()],
        }
    }
}
