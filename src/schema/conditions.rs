//! Match-condition compiler
//!
//! A condition object is a conjunction of checks evaluated in a fixed
//! order: `exists`, `not`, `lt`, `gt`, `min`, `max`, `length`, `in`,
//! `notIn`. The first failing check decides the message.
//!
//! Malformed conditions are rejected while building, never while
//! validating. A compiled condition is a [`Matcher`].

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Map;

use super::errors::{ConfigError, MatchError};
use crate::value::{format_number, Pattern, Value};

/// Condition keys accepted in a JSON `match` object.
pub const CONDITION_KEYS: [&str; 9] =
    ["exists", "not", "lt", "gt", "min", "max", "length", "in", "notIn"];

/// Synchronous matcher: `(value, context)`.
pub type SyncMatchFn = dyn Fn(Option<&Value>, &Value) -> Result<(), MatchError> + Send + Sync;

/// Asynchronous matcher: owns its inputs so the future is `'static`.
pub type AsyncMatchFn =
    dyn Fn(Option<Value>, Arc<Value>) -> BoxFuture<'static, Result<(), MatchError>> + Send + Sync;

/// A compiled match condition.
#[derive(Clone)]
pub enum Matcher {
    Sync(Arc<SyncMatchFn>),
    Async(Arc<AsyncMatchFn>),
}

impl Matcher {
    /// Wraps a synchronous function.
    pub fn sync_fn<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> Result<(), MatchError> + Send + Sync + 'static,
    {
        Matcher::Sync(Arc::new(f))
    }

    /// Wraps a function returning a future.
    pub fn async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Option<Value>, Arc<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), MatchError>> + Send + 'static,
    {
        Matcher::Async(Arc::new(move |value, ctx| f(value, ctx).boxed()))
    }

    /// Matcher requiring the value's string form to match `pattern`.
    /// Absent and null values never match.
    pub fn pattern(pattern: Pattern) -> Self {
        Matcher::sync_fn(move |value, _| match value {
            Some(v) if !v.is_null() && pattern.is_match(&v.to_string()) => Ok(()),
            _ => Err(MatchError::rejected(format!("Must match expression {}", pattern))),
        })
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Matcher::Async(_))
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Sync(_) => write!(f, "Matcher::Sync"),
            Matcher::Async(_) => write!(f, "Matcher::Async"),
        }
    }
}

/// Bound for `lt` / `gt`: a number or a string.
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    Number(f64),
    Text(String),
}

impl Threshold {
    fn as_value(&self) -> Value {
        match self {
            Threshold::Number(n) => Value::Number(*n),
            Threshold::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Number(n) => write!(f, "{}", format_number(*n)),
            Threshold::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Threshold {
    fn from(n: f64) -> Self {
        Threshold::Number(n)
    }
}

impl From<i64> for Threshold {
    fn from(n: i64) -> Self {
        Threshold::Number(n as f64)
    }
}

impl From<i32> for Threshold {
    fn from(n: i32) -> Self {
        Threshold::Number(n as f64)
    }
}

impl From<&str> for Threshold {
    fn from(s: &str) -> Self {
        Threshold::Text(s.to_string())
    }
}

impl From<String> for Threshold {
    fn from(s: String) -> Self {
        Threshold::Text(s)
    }
}

/// A declarative condition object.
///
/// ```ignore
/// let cond = Conditions::new().exists(true).min(2).max(10);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    exists: bool,
    not: Option<Value>,
    lt: Option<Threshold>,
    gt: Option<Threshold>,
    min: Option<f64>,
    max: Option<f64>,
    length: Option<f64>,
    one_of: Option<Vec<Value>>,
    none_of: Option<Vec<Value>>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `exists: true` requires the key to be present. `false` adds no check.
    pub fn exists(mut self, exists: bool) -> Self {
        self.exists = exists;
        self
    }

    pub fn not(mut self, value: impl Into<Value>) -> Self {
        self.not = Some(value.into());
        self
    }

    pub fn lt(mut self, bound: impl Into<Threshold>) -> Self {
        self.lt = Some(bound.into());
        self
    }

    pub fn gt(mut self, bound: impl Into<Threshold>) -> Self {
        self.gt = Some(bound.into());
        self
    }

    pub fn min(mut self, n: impl Into<f64>) -> Self {
        self.min = Some(n.into());
        self
    }

    pub fn max(mut self, n: impl Into<f64>) -> Self {
        self.max = Some(n.into());
        self
    }

    pub fn length(mut self, n: impl Into<f64>) -> Self {
        self.length = Some(n.into());
        self
    }

    /// `in`: the value must deep-equal one of `values`.
    pub fn in_<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// `notIn`: the value must deep-equal none of `values`.
    pub fn not_in<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.none_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Parses a JSON condition object.
    ///
    /// # Errors
    ///
    /// `InvalidMatch` for unknown keys or values of the wrong kind.
    pub fn from_json(map: &Map<String, serde_json::Value>) -> Result<Self, ConfigError> {
        use serde_json::Value as Json;

        let mut cond = Conditions::new();
        for (key, value) in map {
            match key.as_str() {
                "exists" => {
                    cond.exists = value.as_bool().ok_or_else(|| kind_error(key, "a boolean"))?;
                }
                "not" => cond.not = Some(Value::from(value)),
                "lt" | "gt" => {
                    let bound = match value {
                        Json::Number(n) => Threshold::Number(n.as_f64().unwrap_or_default()),
                        Json::String(s) => Threshold::Text(s.clone()),
                        _ => return Err(kind_error(key, "a number or string")),
                    };
                    if key == "lt" {
                        cond.lt = Some(bound);
                    } else {
                        cond.gt = Some(bound);
                    }
                }
                "min" | "max" | "length" => {
                    let n = value.as_f64().ok_or_else(|| kind_error(key, "a number"))?;
                    match key.as_str() {
                        "min" => cond.min = Some(n),
                        "max" => cond.max = Some(n),
                        _ => cond.length = Some(n),
                    }
                }
                "in" | "notIn" => {
                    let items: Vec<Value> = value
                        .as_array()
                        .ok_or_else(|| kind_error(key, "an array"))?
                        .iter()
                        .map(Value::from)
                        .collect();
                    if key == "in" {
                        cond.one_of = Some(items);
                    } else {
                        cond.none_of = Some(items);
                    }
                }
                other => {
                    return Err(ConfigError::InvalidMatch(format!(
                        "unknown condition '{}', expected one of {}",
                        other,
                        CONDITION_KEYS.join(", ")
                    )))
                }
            }
        }
        Ok(cond)
    }

    /// Returns true if no check is configured.
    pub fn is_empty(&self) -> bool {
        *self == Conditions::default()
    }

    /// Runs every configured check in order, returning the first failure.
    pub fn check(&self, value: Option<&Value>) -> Result<(), MatchError> {
        if self.exists && value.is_none() {
            return Err(MatchError::rejected("Must exist"));
        }

        if let Some(not) = &self.not {
            if value == Some(not) {
                return Err(MatchError::rejected(format!("Must not equal {}", not)));
            }
        }

        if let Some(bound) = &self.lt {
            if compares(value, bound, |o| o != Ordering::Less) {
                return Err(MatchError::rejected(format!("Must be less than {}", bound)));
            }
        }

        if let Some(bound) = &self.gt {
            if compares(value, bound, |o| o != Ordering::Greater) {
                return Err(MatchError::rejected(format!("Must be greater than {}", bound)));
            }
        }

        if let Some(min) = self.min {
            if fails_length(value, |len| len < min) {
                return Err(MatchError::rejected(format!(
                    "Must be greater than {} chars in length",
                    format_number(min)
                )));
            }
        }

        if let Some(max) = self.max {
            if fails_length(value, |len| len > max) {
                return Err(MatchError::rejected(format!(
                    "Must be less than {} chars in length",
                    format_number(max)
                )));
            }
        }

        if let Some(length) = self.length {
            if fails_length(value, |len| len != length) {
                return Err(MatchError::rejected(format!(
                    "Must be {} chars in length",
                    format_number(length)
                )));
            }
        }

        if let Some(values) = &self.one_of {
            if !values.iter().any(|v| Some(v) == value) {
                return Err(MatchError::rejected(format!(
                    "Must match one of the following values: {}",
                    quote_list(values)
                )));
            }
        }

        if let Some(values) = &self.none_of {
            if values.iter().any(|v| Some(v) == value) {
                return Err(MatchError::rejected(format!(
                    "Must not match any of the following values: {}",
                    quote_list(values)
                )));
            }
        }

        Ok(())
    }

    /// Compiles into a synchronous matcher.
    pub fn into_matcher(self) -> Matcher {
        Matcher::sync_fn(move |value, _| self.check(value))
    }
}

fn kind_error(key: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidMatch(format!("match.{} must be {}", key, expected))
}

/// True when the value is comparable with `bound` and `fails` holds for
/// the ordering. Incomparable values pass.
fn compares(value: Option<&Value>, bound: &Threshold, fails: impl Fn(Ordering) -> bool) -> bool {
    value
        .and_then(|v| v.compare(&bound.as_value()))
        .map_or(false, fails)
}

/// Absent and null always fail; values without a length pass.
fn fails_length(value: Option<&Value>, fails: impl Fn(f64) -> bool) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(v) => v.length().map_or(false, |len| fails(len as f64)),
    }
}

fn quote_list(values: &[Value]) -> String {
    let joined = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("', '");
    format!("'{}'", joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(cond: &Conditions, value: Option<&Value>) -> Option<String> {
        cond.check(value).err().map(|e| e.message().to_string())
    }

    #[test]
    fn test_exists() {
        let cond = Conditions::new().exists(true);
        assert_eq!(message(&cond, None).as_deref(), Some("Must exist"));
        assert!(cond.check(Some(&Value::Null)).is_ok());

        assert!(Conditions::new().exists(false).check(None).is_ok());
    }

    #[test]
    fn test_not() {
        let cond = Conditions::new().not("admin");
        assert_eq!(
            message(&cond, Some(&Value::from("admin"))).as_deref(),
            Some("Must not equal admin")
        );
        assert!(cond.check(Some(&Value::from("user"))).is_ok());
        assert!(cond.check(None).is_ok());
    }

    #[test]
    fn test_lt_gt_numbers_and_strings() {
        let lt = Conditions::new().lt(10);
        assert!(lt.check(Some(&Value::from(9))).is_ok());
        assert_eq!(
            message(&lt, Some(&Value::from(10))).as_deref(),
            Some("Must be less than 10")
        );

        let gt = Conditions::new().gt("m");
        assert!(gt.check(Some(&Value::from("z"))).is_ok());
        assert_eq!(
            message(&gt, Some(&Value::from("a"))).as_deref(),
            Some("Must be greater than m")
        );
    }

    #[test]
    fn test_incomparable_values_pass_bounds() {
        let cond = Conditions::new().lt(1).gt(5);
        assert!(cond.check(None).is_ok());
        assert!(cond.check(Some(&Value::Null)).is_ok());
        assert!(cond.check(Some(&Value::from("text"))).is_ok());
    }

    #[test]
    fn test_length_checks() {
        let cond = Conditions::new().min(2).max(4);
        assert!(cond.check(Some(&Value::from("abc"))).is_ok());
        assert_eq!(
            message(&cond, Some(&Value::from("a"))).as_deref(),
            Some("Must be greater than 2 chars in length")
        );
        assert_eq!(
            message(&cond, Some(&Value::from("abcde"))).as_deref(),
            Some("Must be less than 4 chars in length")
        );
        assert_eq!(
            message(&cond, None).as_deref(),
            Some("Must be greater than 2 chars in length")
        );
        // no length: passes
        assert!(cond.check(Some(&Value::from(7))).is_ok());

        let exact = Conditions::new().length(2);
        assert!(exact.check(Some(&Value::from(vec![Value::Null, Value::Null]))).is_ok());
        assert_eq!(
            message(&exact, Some(&Value::Null)).as_deref(),
            Some("Must be 2 chars in length")
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let cond = Conditions::new().min(2).max(1);
        assert_eq!(
            message(&cond, Some(&Value::from("abc"))).as_deref(),
            Some("Must be less than 1 chars in length")
        );
        assert_eq!(
            message(&cond, Some(&Value::from("a"))).as_deref(),
            Some("Must be greater than 2 chars in length")
        );
    }

    #[test]
    fn test_in_and_not_in() {
        let cond = Conditions::new().in_(["a", "b"]);
        assert!(cond.check(Some(&Value::from("b"))).is_ok());
        assert_eq!(
            message(&cond, Some(&Value::from("c"))).as_deref(),
            Some("Must match one of the following values: 'a', 'b'")
        );
        assert!(cond.check(None).is_err());

        let cond = Conditions::new().not_in([1, 2]);
        assert!(cond.check(Some(&Value::from(3))).is_ok());
        assert_eq!(
            message(&cond, Some(&Value::from(2))).as_deref(),
            Some("Must not match any of the following values: '1', '2'")
        );
        assert!(cond.check(None).is_ok());
    }

    #[test]
    fn test_from_json() {
        let map = json!({"exists": true, "length": 3, "notIn": ["abc"]});
        let cond = Conditions::from_json(map.as_object().unwrap()).unwrap();
        assert_eq!(cond, Conditions::new().exists(true).length(3).not_in(["abc"]));
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let cases = [
            (json!({"exists": "yes"}), "match.exists must be a boolean"),
            (json!({"lt": true}), "match.lt must be a number or string"),
            (json!({"min": "2"}), "match.min must be a number"),
            (json!({"in": "a"}), "match.in must be an array"),
        ];
        for (json, expected) in cases {
            let err = Conditions::from_json(json.as_object().unwrap()).unwrap_err();
            assert_eq!(err, ConfigError::InvalidMatch(expected.to_string()));
        }

        let err = Conditions::from_json(json!({"between": 1}).as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("unknown condition 'between'"));
    }

    #[test]
    fn test_pattern_matcher() {
        let matcher = Matcher::pattern(Pattern::new("^[a-z]+$").unwrap());
        let Matcher::Sync(f) = matcher else {
            panic!("pattern matcher must be sync");
        };
        assert!(f(Some(&Value::from("abc")), &Value::Null).is_ok());
        assert_eq!(
            f(Some(&Value::from("ABC")), &Value::Null),
            Err(MatchError::rejected("Must match expression /^[a-z]+$/"))
        );
        assert!(f(None, &Value::Null).is_err());
        assert!(f(Some(&Value::Null), &Value::Null).is_err());
    }

    #[test]
    fn test_async_fn_is_async() {
        let matcher = Matcher::async_fn(|_, _| async { Ok(()) });
        assert!(matcher.is_async());
        assert!(!Conditions::new().into_matcher().is_async());
    }
}
