//! Async Validation Tests
//!
//! - Async leaves run through `validate_async` and are awaited
//! - Sibling results aggregate in declaration order whatever the
//!   completion order
//! - The sync API refuses schemas with async leaves
//! - Matcher faults abort the call with a config error

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use shapeguard::{
    ConfigError, MatchError, Matcher, RuleDef, RuleSpec, Schema, SchemaDef, SchemaError, TypeTag,
    ValidateOptions, Value,
};

// =============================================================================
// Helper Functions
// =============================================================================

/// A string rule whose matcher sleeps `delay_ms`, then rejects `bad`.
fn slow_rule(delay_ms: u64, bad: &'static str) -> RuleSpec {
    RuleSpec::new(TypeTag::STRING).with_matcher(Matcher::async_fn(move |value, _| async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        if value.as_ref().and_then(Value::as_str) == Some(bad) {
            Err(MatchError::rejected(format!("{} is taken", bad)))
        } else {
            Ok(())
        }
    }))
}

fn errors_of(result: Result<(), SchemaError>) -> serde_json::Value {
    match result {
        Ok(()) => serde_json::Value::Null,
        Err(SchemaError::Validation(err)) => err.to_json(),
        Err(other) => panic!("unexpected error: {:?}", other),
    }
}

// =============================================================================
// Async Leaf Tests
// =============================================================================

#[tokio::test]
async fn test_async_leaf_error_lands_in_tree() {
    let schema = Schema::compile(SchemaDef::new().field("field", slow_rule(10, ""))).unwrap();
    assert!(schema.is_async());

    let record = Value::from(json!({ "field": "" }));
    let result = schema.validate_async(&record, &ValidateOptions::default()).await;
    assert_eq!(errors_of(result), json!({ "field": " is taken" }));
}

#[tokio::test]
async fn test_aggregation_ignores_completion_order() {
    // first key finishes last, last key finishes first
    let def = SchemaDef::new()
        .field("a", slow_rule(40, "x"))
        .field("b", slow_rule(20, "x"))
        .field("c", slow_rule(1, "x"));
    let schema = Schema::compile(def).unwrap();

    let record = Value::from(json!({ "a": "x", "b": "ok", "c": "x" }));
    let err = schema
        .validate_async(&record, &ValidateOptions::default())
        .await
        .unwrap_err();

    let flat = err.errors().unwrap().flatten();
    let paths: Vec<&str> = flat.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["a", "c"]);
}

#[tokio::test]
async fn test_siblings_run_concurrently() {
    let def = SchemaDef::new().field("items", RuleDef::array(slow_rule(50, "")));
    let schema = Schema::compile(def).unwrap();
    let record = Value::from(json!({ "items": ["a", "b", "c", "d", "e", "f"] }));

    let started = Instant::now();
    schema
        .validate_async(&record, &ValidateOptions::default())
        .await
        .unwrap();

    // six sequential sleeps would take 300ms
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[tokio::test]
async fn test_array_of_async_leaves_aligned_by_index() {
    let def = SchemaDef::new().field("names", RuleDef::array(slow_rule(5, "root")));
    let schema = Schema::compile(def).unwrap();
    let record = Value::from(json!({ "names": ["ada", "root", "bob"] }));

    let result = schema.validate_async(&record, &ValidateOptions::default()).await;
    assert_eq!(errors_of(result), json!({ "names": [null, "root is taken"] }));
}

#[tokio::test]
async fn test_async_matcher_receives_context() {
    let rule = RuleSpec::new(TypeTag::NUMBER).with_matcher(Matcher::async_fn(|value, ctx| async move {
        let limit = match ctx.get("limit") {
            Some(Value::Number(n)) => *n,
            _ => return Err(MatchError::faulted("missing limit")),
        };
        match value {
            Some(Value::Number(n)) if n > limit => Err(MatchError::rejected("Over the limit")),
            _ => Ok(()),
        }
    }));
    let schema = Schema::compile(SchemaDef::new().field("qty", rule)).unwrap();
    let options = ValidateOptions::new().with_context(Value::from(json!({ "limit": 10 })));

    let ok = Value::from(json!({ "qty": 3 }));
    assert!(schema.validate_async(&ok, &options).await.is_ok());

    let over = Value::from(json!({ "qty": 30 }));
    let result = schema.validate_async(&over, &options).await;
    assert_eq!(errors_of(result), json!({ "qty": "Over the limit" }));
}

#[tokio::test]
async fn test_sync_schema_through_async_api() {
    let schema = Schema::from_json(&json!({ "a": "String" })).unwrap();
    assert!(!schema.is_async());

    let record = Value::from(json!({ "a": 1 }));
    let result = schema.validate_async(&record, &ValidateOptions::default()).await;
    assert_eq!(errors_of(result), json!({ "a": "Must be an instance of String" }));
    assert_eq!(schema.metrics().async_validations, 1);
}

#[tokio::test]
async fn test_partial_paths_skip_unlisted_async_leaves() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let counted = RuleSpec::new(TypeTag::STRING).with_matcher(Matcher::async_fn(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        async { Err(MatchError::rejected("always fails")) }
    }));
    let def = SchemaDef::new()
        .exclusive(true)
        .field("a", slow_rule(1, "x"))
        .field("b", RuleDef::object([("c", counted)]));
    let schema = Schema::compile(def).unwrap();
    let options = ValidateOptions::new().with_paths(["a"]);

    let record = Value::from(json!({ "a": "x", "b": { "c": "y" }, "junk": 1 }));
    let result = schema.validate_async(&record, &options).await;
    assert_eq!(errors_of(result), json!({ "junk": "junk is not an allowed path" }));

    let record = Value::from(json!({ "a": "x", "b": { "c": "y" } }));
    let result = schema.validate_async(&record, &options).await;
    assert_eq!(errors_of(result), json!({ "a": "x is taken" }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Refusal Tests
// =============================================================================

#[test]
fn test_sync_api_refuses_async_schema() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let rule = RuleSpec::new(TypeTag::STRING).with_matcher(Matcher::async_fn(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    }));
    let schema = Schema::compile(SchemaDef::new().field("field", rule)).unwrap();

    let err = schema.validate(&Value::from(json!({ "field": "" }))).unwrap_err();
    assert_eq!(err, SchemaError::Config(ConfigError::AsyncRequiresAwait));
    assert!(err.is_config());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(schema.last_error(), Some(err));
}

#[tokio::test]
async fn test_async_rejects_non_object_record() {
    let schema = Schema::compile(SchemaDef::new().field("f", slow_rule(1, ""))).unwrap();
    let err = schema
        .validate_async(&Value::from("nope"), &ValidateOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, SchemaError::NotAnObject);
}

#[tokio::test]
async fn test_fault_waits_for_siblings() {
    let finished = Arc::new(AtomicUsize::new(0));
    let done = Arc::clone(&finished);
    let slow = RuleSpec::new(TypeTag::STRING).with_matcher(Matcher::async_fn(move |_, _| {
        let done = Arc::clone(&done);
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }));
    let broken = RuleSpec::new(TypeTag::STRING).with_matcher(Matcher::async_fn(|_, _| async {
        Err(MatchError::faulted("lookup failed"))
    }));

    let schema = Schema::compile(SchemaDef::new().field("bad", broken).field("slow", slow)).unwrap();
    let err = schema
        .validate_async(&Value::from(json!({ "bad": "x", "slow": "y" })), &ValidateOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SchemaError::Config(ConfigError::MatcherFault {
            path: "bad".into(),
            message: "lookup failed".into(),
        })
    );
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}
