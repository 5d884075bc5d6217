use serde_json::json;

use loadsmith_core::{ColumnSpec, ConfigError, LoadRule};
use loadsmith_generate::{GeneratedValue, GeneratorRegistry};
use loadsmith_load::{LoadPlan, compile_rules};

fn column(name: &str, util: &str, count: Option<u32>, params: Vec<serde_json::Value>) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        util: util.to_string(),
        count,
        params,
    }
}

fn orders_rule() -> LoadRule {
    LoadRule {
        table: "orders".to_string(),
        rows: 4,
        count: Some(3),
        columns: vec![
            column("id", "PrimaryIntGen", None, vec![json!(1), json!(1000)]),
            column("note", "RandomAString", Some(2), vec![json!(4), json!(8)]),
            column("amount", "RandomFloat", None, vec![json!(0), json!(10), json!(2)]),
        ],
    }
}

fn shape(plans: &[LoadPlan]) -> Vec<(String, Vec<String>, String)> {
    plans
        .iter()
        .map(|plan| {
            (
                plan.table_name().to_string(),
                plan.column_names().to_vec(),
                plan.insert_statement().to_string(),
            )
        })
        .collect()
}

#[test]
fn table_replication_plans_distinct_tables() {
    let registry = GeneratorRegistry::new();
    let plans = compile_rules(&[orders_rule()], &registry, Some(1)).expect("rules compile");

    let names: Vec<&str> = plans.iter().map(|plan| plan.table_name()).collect();
    assert_eq!(names, vec!["orders1", "orders2", "orders3"]);
    for plan in &plans {
        assert_eq!(plan.row_count(), 4);
        assert_eq!(plan.column_names(), ["id", "note1", "note2", "amount"]);
    }
}

#[test]
fn column_order_matches_declaration() {
    let registry = GeneratorRegistry::new();
    let plans = compile_rules(&[orders_rule()], &registry, Some(1)).expect("rules compile");

    let plan = &plans[0];
    assert_eq!(
        plan.insert_statement(),
        "INSERT INTO orders1 (id,note1,note2,amount) VALUES (?,?,?,?)"
    );
    assert_eq!(
        plan.generator_ids(),
        vec!["PrimaryIntGen", "RandomAString", "RandomAString", "RandomFloat"]
    );
}

#[test]
fn rows_bind_values_in_column_order() {
    let registry = GeneratorRegistry::new();
    let mut plans = compile_rules(&[orders_rule()], &registry, Some(1)).expect("rules compile");

    let row = plans[0].next_row();
    assert_eq!(row.len(), 4);
    assert_eq!(row[0], GeneratedValue::Int(1));
    assert!(matches!(&row[1], GeneratedValue::Text(text) if (4..=8).contains(&text.len())));
    assert!(matches!(&row[2], GeneratedValue::Text(_)));
    assert!(matches!(row[3], GeneratedValue::Float(value) if (0.0..=10.0).contains(&value)));
    assert_eq!(plans[0].next_row()[0], GeneratedValue::Int(2));
}

#[test]
fn replicated_columns_get_independent_generators() {
    let registry = GeneratorRegistry::new();
    let mut plans = compile_rules(&[orders_rule()], &registry, Some(9)).expect("rules compile");

    let rows: Vec<Vec<GeneratedValue>> = (0..20).map(|_| plans[0].next_row()).collect();
    assert!(rows.iter().any(|row| row[1] != row[2]));
}

#[test]
fn compilation_is_idempotent() {
    let registry = GeneratorRegistry::new();
    let rules = vec![orders_rule()];
    let first = compile_rules(&rules, &registry, None).expect("rules compile");
    let second = compile_rules(&rules, &registry, None).expect("rules compile");
    assert_eq!(shape(&first), shape(&second));
}

#[test]
fn seeded_compilation_is_reproducible() {
    let registry = GeneratorRegistry::new();
    let rules = vec![orders_rule()];
    let mut first = compile_rules(&rules, &registry, Some(42)).expect("rules compile");
    let mut second = compile_rules(&rules, &registry, Some(42)).expect("rules compile");
    for _ in 0..10 {
        assert_eq!(first[1].next_row(), second[1].next_row());
    }
}

#[test]
fn empty_rule_set_is_rejected() {
    let registry = GeneratorRegistry::new();
    assert!(matches!(
        compile_rules(&[], &registry, None),
        Err(ConfigError::EmptyRuleSet)
    ));
}

#[test]
fn bad_parameters_fail_compilation() {
    let registry = GeneratorRegistry::new();
    let mut rule = orders_rule();
    rule.columns[0].params = vec![json!(1)];
    assert!(matches!(
        compile_rules(&[rule], &registry, None),
        Err(ConfigError::InvalidParameterCount { .. })
    ));
}
