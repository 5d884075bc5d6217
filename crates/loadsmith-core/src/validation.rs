use std::collections::BTreeSet;

use crate::config::WorkloadConfig;
use crate::error::{ConfigError, Result};

/// Validate structural consistency of a workload file.
///
/// This checks:
/// - batch size and retry ceiling are positive
/// - table and column names are non-empty and `count` is never zero
/// - physical table names are unique after replication
/// - physical column names are unique within a table
///
/// An empty `loadRules` list is left to the rule compiler, which only
/// requires rules when the declarative load variant is selected.
pub fn validate_config(config: &WorkloadConfig) -> Result<()> {
    if config.batch_size == 0 {
        return Err(invalid("batchSize must be >= 1"));
    }
    if config.max_retries == 0 {
        return Err(invalid("maxRetries must be >= 1"));
    }
    if let Some(create) = config.create_statements()
        && create.iter().any(|ddl| ddl.trim().is_empty())
    {
        return Err(invalid("create contains an empty statement"));
    }

    let mut tables = BTreeSet::new();
    for (rule_index, rule) in config.load_rules.iter().enumerate() {
        if rule.table.trim().is_empty() {
            return Err(invalid(format!("loadRules[{rule_index}]: table name is empty")));
        }
        if rule.count == Some(0) {
            return Err(invalid(format!(
                "loadRules[{rule_index}] ({}): count must be >= 1",
                rule.table
            )));
        }
        if rule.columns.is_empty() {
            return Err(invalid(format!(
                "loadRules[{rule_index}] ({}): at least one column is required",
                rule.table
            )));
        }

        for table in rule.table_names() {
            if !tables.insert(table.clone()) {
                return Err(invalid(format!("duplicate table name: {table}")));
            }
        }

        let mut columns = BTreeSet::new();
        for column in &rule.columns {
            if column.name.trim().is_empty() {
                return Err(invalid(format!("{}: column name is empty", rule.table)));
            }
            if column.count == Some(0) {
                return Err(invalid(format!(
                    "{}.{}: count must be >= 1",
                    rule.table, column.name
                )));
            }
            for name in column.column_names() {
                if !columns.insert(name.clone()) {
                    return Err(invalid(format!(
                        "duplicate column name: {}.{name}",
                        rule.table
                    )));
                }
            }
        }
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidConfig(message.into())
}
