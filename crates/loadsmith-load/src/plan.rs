use tracing::{debug, info};

use loadsmith_core::{ConfigError, LoadRule};
use loadsmith_generate::{GeneratedValue, GeneratorRegistry, ValueGenerator};

/// Executable plan for one physical table.
///
/// Column names, generator instances and insert placeholders correspond one
/// to one, in declaration order.
pub struct LoadPlan {
    table_name: String,
    row_count: u64,
    column_names: Vec<String>,
    generators: Vec<Box<dyn ValueGenerator>>,
    insert_statement: String,
}

impl std::fmt::Debug for LoadPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadPlan")
            .field("table_name", &self.table_name)
            .field("row_count", &self.row_count)
            .field("column_names", &self.column_names)
            .field("generators", &self.generator_ids())
            .field("insert_statement", &self.insert_statement)
            .finish()
    }
}

impl LoadPlan {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn insert_statement(&self) -> &str {
        &self.insert_statement
    }

    pub fn generator_ids(&self) -> Vec<&'static str> {
        self.generators.iter().map(|generator| generator.id()).collect()
    }

    /// Invoke every generator once, in column order.
    pub fn next_row(&mut self) -> Vec<GeneratedValue> {
        self.generators
            .iter_mut()
            .map(|generator| generator.next_value())
            .collect()
    }
}

/// `INSERT INTO <table> (<c1>,<c2>,...) VALUES (?,?,...)`
pub fn insert_statement(table: &str, columns: &[String]) -> String {
    let placeholders = vec!["?"; columns.len()].join(",");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(",")
    )
}

/// Compile load rules into one plan per physical table.
///
/// Table and column replication are expanded here. With `seed` set, every
/// generator instance gets a seed derived from the seed and its physical
/// table and column names; otherwise instances are seeded from entropy.
pub fn compile_rules(
    rules: &[LoadRule],
    registry: &GeneratorRegistry,
    seed: Option<u64>,
) -> Result<Vec<LoadPlan>, ConfigError> {
    if rules.is_empty() {
        return Err(ConfigError::EmptyRuleSet);
    }

    let mut plans = Vec::new();
    for rule in rules {
        for table_name in rule.table_names() {
            plans.push(compile_table(rule, table_name, registry, seed)?);
        }
    }

    info!(
        rules = rules.len(),
        tables = plans.len(),
        "load rules compiled"
    );
    Ok(plans)
}

fn compile_table(
    rule: &LoadRule,
    table_name: String,
    registry: &GeneratorRegistry,
    seed: Option<u64>,
) -> Result<LoadPlan, ConfigError> {
    let mut column_names = Vec::new();
    let mut generators = Vec::new();

    for column in &rule.columns {
        for column_name in column.column_names() {
            let instance_seed = match seed {
                Some(seed) => hash_seed(seed, &format!("{table_name}.{column_name}")),
                None => rand::random(),
            };
            generators.push(registry.build(&column.util, &column.params, instance_seed)?);
            column_names.push(column_name);
        }
    }

    let insert_statement = insert_statement(&table_name, &column_names);
    debug!(table = %table_name, sql = %insert_statement, "table plan built");

    Ok(LoadPlan {
        table_name,
        row_count: rule.rows,
        column_names,
        generators,
        insert_statement,
    })
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_statement_matches_column_order() {
        let columns = vec!["b".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(
            insert_statement("t", &columns),
            "INSERT INTO t (b,a,c) VALUES (?,?,?)"
        );
    }

    #[test]
    fn seeds_differ_per_column() {
        assert_ne!(hash_seed(1, "t.c1"), hash_seed(1, "t.c2"));
        assert_eq!(hash_seed(1, "t.c1"), hash_seed(1, "t.c1"));
    }
}
