use chrono::NaiveDate;
use serde_json::{Value, json};

use loadsmith_core::ConfigError;
use loadsmith_generate::{GeneratedValue, GeneratorRegistry};

fn sample(name: &str, params: Vec<Value>, rows: usize) -> Vec<GeneratedValue> {
    let registry = GeneratorRegistry::new();
    let mut generator = registry.build(name, &params, 42).expect("generator builds");
    (0..rows).map(|_| generator.next_value()).collect()
}

#[test]
fn unknown_generator_is_a_config_error() {
    let registry = GeneratorRegistry::new();
    let result = registry.build("NoSuchUtil", &[], 1);
    assert!(matches!(
        result,
        Err(ConfigError::UnknownGenerator { ref name }) if name == "NoSuchUtil"
    ));
}

#[test]
fn arity_is_checked_at_construction() {
    let registry = GeneratorRegistry::new();
    let result = registry.validate("RandomNormalFloat", &[json!(1.0)]);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidParameterCount {
            expected: 2,
            actual: 1,
            ..
        })
    ));
    assert!(registry.validate("RandomBoolean", &[json!(true)]).is_err());
}

#[test]
fn parameter_types_are_checked_at_construction() {
    let registry = GeneratorRegistry::new();
    let result = registry.validate("RandomInt", &[json!("1"), json!(5)]);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidParameterType { index: 0, .. })
    ));
    let inverted = registry.validate("RandomInt", &[json!(9), json!(1)]);
    assert!(matches!(
        inverted,
        Err(ConfigError::InvalidParameterType { index: 1, .. })
    ));
    assert!(registry.validate("RandomNormalFloat", &[json!(0), json!(-1)]).is_err());
    assert!(registry.validate("RandomDate", &[json!("2024-13-01"), json!("2024-12-01")]).is_err());
}

#[test]
fn float_bounds_must_span_a_finite_range() {
    let registry = GeneratorRegistry::new();
    let result = registry.validate("RandomFloat", &[json!(-1e308), json!(1e308), json!(2)]);
    assert!(matches!(
        result,
        Err(ConfigError::InvalidParameterType { index: 1, .. })
    ));
    assert!(registry.validate("RandomFloat", &[json!(-1e300), json!(1e300), json!(2)]).is_ok());
}

#[test]
fn normal_deviation_must_be_non_negative() {
    let registry = GeneratorRegistry::new();
    for deviation in [json!(-1), json!(-0.5)] {
        let result = registry.validate("RandomNormalFloat", &[json!(0), deviation]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameterType { index: 1, .. })
        ));
    }
    assert!(registry.validate("RandomNormalFloat", &[json!(10), json!(0)]).is_ok());
    let values = sample("RandomNormalFloat", vec![json!(10), json!(0)], 3);
    assert_eq!(values, vec![GeneratedValue::Float(10.0); 3]);
}

#[test]
fn constant_repeats_its_value() {
    let values = sample("Constant", vec![json!(7)], 3);
    assert_eq!(values, vec![GeneratedValue::Int(7); 3]);
    let values = sample("Constant", vec![json!("x")], 2);
    assert_eq!(values, vec![GeneratedValue::Text("x".to_string()); 2]);
}

#[test]
fn primary_int_gen_counts_and_wraps() {
    let values = sample("PrimaryIntGen", vec![json!(1), json!(3)], 5);
    let ints: Vec<i64> = values.iter().filter_map(GeneratedValue::as_i64).collect();
    assert_eq!(ints, vec![1, 2, 3, 1, 2]);
}

#[test]
fn random_int_stays_in_bounds() {
    for value in sample("RandomInt", vec![json!(-5), json!(5)], 500) {
        let value = value.as_i64().expect("int value");
        assert!((-5..=5).contains(&value));
    }
}

#[test]
fn random_float_respects_bounds_and_decimals() {
    for value in sample("RandomFloat", vec![json!(1), json!(2), json!(2)], 200) {
        let value = value.as_f64().expect("float value");
        assert!((1.0..=2.0).contains(&value));
        assert!(((value * 100.0).round() - value * 100.0).abs() < 1e-6);
    }
}

#[test]
fn normal_float_centers_on_mean() {
    let values = sample("RandomNormalFloat", vec![json!(100), json!(1)], 2000);
    let mean = values.iter().filter_map(GeneratedValue::as_f64).sum::<f64>() / 2000.0;
    assert!((mean - 100.0).abs() < 0.5, "mean {mean}");
}

#[test]
fn strings_respect_length_and_charset() {
    for value in sample("RandomAString", vec![json!(3), json!(6)], 100) {
        let text = value.as_str().expect("text").to_string();
        assert!((3..=6).contains(&text.len()));
        assert!(text.chars().all(|ch| ch.is_ascii_alphabetic()));
    }
    for value in sample("RandomNString", vec![json!(4), json!(4)], 50) {
        let text = value.as_str().expect("text").to_string();
        assert_eq!(text.len(), 4);
        assert!(text.chars().all(|ch| ch.is_ascii_digit()));
    }
}

#[test]
fn one_of_only_yields_listed_values() {
    let allowed = [
        GeneratedValue::Text("open".to_string()),
        GeneratedValue::Text("close".to_string()),
    ];
    for value in sample("OneOf", vec![json!(["open", "close"])], 100) {
        assert!(allowed.contains(&value));
    }
}

#[test]
fn dates_stay_in_range() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    for value in sample("RandomDate", vec![json!("2024-01-01"), json!("2024-01-31")], 100) {
        let GeneratedValue::Date(date) = value else {
            panic!("expected a date");
        };
        assert!(date >= start && date <= end);
    }
}

#[test]
fn uuids_are_version_four() {
    for value in sample("RandomUUID", Vec::new(), 10) {
        let GeneratedValue::Uuid(uuid) = value else {
            panic!("expected a uuid");
        };
        assert_eq!(uuid.get_version_num(), 4);
    }
}

#[test]
fn same_seed_same_sequence() {
    let first = sample("RandomInt", vec![json!(0), json!(1_000_000)], 20);
    let second = sample("RandomInt", vec![json!(0), json!(1_000_000)], 20);
    assert_eq!(first, second);
}
