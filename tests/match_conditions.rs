//! Match Condition Tests
//!
//! Match conditions end to end through compiled schemas:
//! - Each condition key and its message
//! - Fixed evaluation order, first failure wins
//! - Pattern literals and raw matcher functions
//! - Malformed conditions fail at compile time

use serde_json::json;
use shapeguard::{
    Conditions, ConfigError, MatchError, Matcher, Pattern, RuleSpec, Schema, SchemaDef,
    SchemaError, TypeTag, Value,
};

// =============================================================================
// Helper Functions
// =============================================================================

/// Validates `{field: value}` against `{field: {type, match}}` and returns
/// the field's message, if any.
fn field_error(type_name: &str, condition: serde_json::Value, value: serde_json::Value) -> Option<String> {
    let schema = Schema::from_json(&json!({
        "field": { "type": type_name, "match": condition }
    }))
    .unwrap();

    let mut record = serde_json::Map::new();
    if !value.is_null() {
        record.insert("field".to_string(), value);
    }
    match schema.validate(&Value::from(serde_json::Value::Object(record))) {
        Ok(()) => None,
        Err(SchemaError::Validation(err)) => err
            .errors()
            .get("field")
            .and_then(|tree| tree.message())
            .map(str::to_string),
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

// =============================================================================
// Condition Table
// =============================================================================

#[test]
fn test_condition_table() {
    let cases: Vec<(serde_json::Value, serde_json::Value, Option<&str>)> = vec![
        (json!("/pattern/"), json!(""), Some("Must match expression /pattern/")),
        (json!("/pattern/"), json!("pattern"), None),
        (json!({ "lt": "b" }), json!("c"), Some("Must be less than b")),
        (json!({ "lt": "b" }), json!("a"), None),
        (json!({ "gt": "b" }), json!("a"), Some("Must be greater than b")),
        (json!({ "gt": "b" }), json!("c"), None),
        (json!({ "min": 2 }), json!("a"), Some("Must be greater than 2 chars in length")),
        (json!({ "min": 2 }), json!("ab"), None),
        (json!({ "max": 2 }), json!("abc"), Some("Must be less than 2 chars in length")),
        (json!({ "max": 2 }), json!("ab"), None),
        (json!({ "length": 2 }), json!("a"), Some("Must be 2 chars in length")),
        (json!({ "length": 2 }), json!("abc"), Some("Must be 2 chars in length")),
        (json!({ "length": 2 }), json!("ab"), None),
        (
            json!({ "in": ["a", "b"] }),
            json!(""),
            Some("Must match one of the following values: 'a', 'b'"),
        ),
        (json!({ "in": ["a", "b"] }), json!("a"), None),
        (json!({ "in": ["a", "b"] }), json!("b"), None),
        (json!({ "notIn": ["a", "b"] }), json!(""), None),
        (
            json!({ "notIn": ["a", "b"] }),
            json!("a"),
            Some("Must not match any of the following values: 'a', 'b'"),
        ),
        (
            json!({ "notIn": ["a", "b"] }),
            json!("b"),
            Some("Must not match any of the following values: 'a', 'b'"),
        ),
        (json!({ "exists": true }), json!(null), Some("Must exist")),
        (json!({ "exists": true }), json!(""), None),
        (json!({ "exists": false }), json!(null), None),
        (json!({ "not": "root" }), json!("root"), Some("Must not equal root")),
        (json!({ "not": "root" }), json!("admin"), None),
    ];

    for (condition, value, expected) in cases {
        let actual = field_error("String", condition.clone(), value.clone());
        assert_eq!(
            actual.as_deref(),
            expected,
            "condition {} against {}",
            condition,
            value
        );
    }
}

#[test]
fn test_numeric_bounds_render_without_decimals() {
    assert_eq!(
        field_error("Number", json!({ "lt": 10 }), json!(10)).as_deref(),
        Some("Must be less than 10")
    );
    assert_eq!(
        field_error("Number", json!({ "gt": 0.5 }), json!(0.25)).as_deref(),
        Some("Must be greater than 0.5")
    );
    assert_eq!(field_error("Number", json!({ "gt": 0.5 }), json!(1)), None);
}

/// `{min: 2, max: 1}` reports whichever check fails first in order.
#[test]
fn test_first_failing_condition_wins() {
    let condition = json!({ "min": 2, "max": 1 });
    assert_eq!(
        field_error("String", condition.clone(), json!("abc")).as_deref(),
        Some("Must be less than 1 chars in length")
    );
    assert_eq!(
        field_error("String", condition, json!("a")).as_deref(),
        Some("Must be greater than 2 chars in length")
    );
}

/// Key order in the JSON object does not change evaluation order.
#[test]
fn test_order_is_fixed_not_declared() {
    let condition = json!({ "notIn": ["x"], "exists": true });
    assert_eq!(field_error("String", condition, json!(null)).as_deref(), Some("Must exist"));
}

#[test]
fn test_length_counts_array_elements() {
    assert_eq!(
        field_error("Array", json!({ "min": 2 }), json!([1])).as_deref(),
        Some("Must be greater than 2 chars in length")
    );
    assert_eq!(field_error("Array", json!({ "min": 2 }), json!([1, 2])), None);
}

#[test]
fn test_pattern_flags() {
    assert_eq!(field_error("String", json!("/^abc$/i"), json!("ABC")), None);
    assert_eq!(
        field_error("String", json!("/^abc$/"), json!("ABC")).as_deref(),
        Some("Must match expression /^abc$/")
    );
}

// =============================================================================
// Programmatic Rules
// =============================================================================

#[test]
fn test_programmatic_conditions_and_patterns() {
    let def = SchemaDef::new()
        .field(
            "code",
            RuleSpec::new(TypeTag::STRING).with_pattern(Pattern::new("^[A-Z]{3}$").unwrap()),
        )
        .field(
            "role",
            RuleSpec::new(TypeTag::STRING)
                .with_conditions(Conditions::new().exists(true).in_(["admin", "user"])),
        );
    let schema = Schema::compile(def).unwrap();

    assert!(schema
        .validate(&Value::from(json!({ "code": "ABC", "role": "user" })))
        .is_ok());

    let err = schema
        .validate(&Value::from(json!({ "code": "abc" })))
        .unwrap_err();
    assert_eq!(
        err.errors().unwrap().to_json(),
        json!({
            "code": "Must match expression /^[A-Z]{3}$/",
            "role": "Must exist",
        })
    );
}

#[test]
fn test_sync_matcher_function() {
    let rule = RuleSpec::new(TypeTag::STRING).with_matcher(Matcher::sync_fn(|value, _| {
        match value.and_then(Value::as_str) {
            Some(s) if s.contains(' ') => Err(MatchError::rejected("test err")),
            _ => Ok(()),
        }
    }));
    let schema = Schema::compile(SchemaDef::new().field("field", rule)).unwrap();

    assert!(schema.validate(&Value::from(json!({ "field": "" }))).is_ok());
    let err = schema
        .validate(&Value::from(json!({ "field": "a b" })))
        .unwrap_err();
    assert_eq!(err.errors().unwrap().to_json(), json!({ "field": "test err" }));
}

// =============================================================================
// Malformed Conditions
// =============================================================================

#[test]
fn test_malformed_match_rejected_at_compile_time() {
    let bad_matches = [
        json!(null),
        json!(1),
        json!("s"),
        json!([]),
        json!({ "exists": 1 }),
        json!({ "lt": [] }),
        json!({ "max": "3" }),
        json!({ "notIn": {} }),
        json!({ "unknown": true }),
        json!("/[/"),
    ];
    for bad in bad_matches {
        let err = Schema::from_json(&json!({ "field": { "type": "String", "match": bad } }))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidMatch(_)),
            "match {} gave {:?}",
            bad,
            err
        );
    }
}

#[test]
fn test_type_tag_must_be_identifier() {
    let err = Schema::from_json(&json!({ "field": { "type": "no such", "match": {} } })).unwrap_err();
    assert_eq!(err, ConfigError::InvalidTypeTag("no such".into()));
}
