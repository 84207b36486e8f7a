//! Leaf rules
//!
//! A rule is a type tag plus an optional compiled matcher. Type tags are
//! resolved against a registry when a value is checked, so a rule may be
//! built before its type is registered.

use std::sync::Arc;

use serde_json::Map;

use super::conditions::{Conditions, Matcher};
use super::errors::{ConfigError, MatchError};
use crate::types::{self, TypeRegistry, TypeTag};
use crate::value::{Pattern, Value};

/// Uncompiled match condition of a rule.
#[derive(Debug, Clone)]
pub enum MatchSpec {
    Pattern(Pattern),
    Conditions(Conditions),
    Function(Matcher),
}

impl MatchSpec {
    /// Parses the `match` member of a JSON rule: a condition object or a
    /// `/source/flags` literal.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ConfigError> {
        match json {
            serde_json::Value::Object(map) => Ok(MatchSpec::Conditions(Conditions::from_json(map)?)),
            serde_json::Value::String(literal) => match Pattern::parse_literal(literal) {
                Some(Ok(pattern)) => Ok(MatchSpec::Pattern(pattern)),
                Some(Err(err)) => Err(ConfigError::InvalidMatch(format!(
                    "invalid expression {}: {}",
                    literal, err
                ))),
                None => Err(not_a_match(json)),
            },
            _ => Err(not_a_match(json)),
        }
    }

    /// Compiles into a matcher.
    pub fn compile(self) -> Matcher {
        match self {
            MatchSpec::Pattern(pattern) => Matcher::pattern(pattern),
            MatchSpec::Conditions(conditions) => conditions.into_matcher(),
            MatchSpec::Function(matcher) => matcher,
        }
    }
}

fn not_a_match(json: &serde_json::Value) -> ConfigError {
    ConfigError::InvalidMatch(format!(
        "match must be a condition object or /expression/ literal, got {}",
        json
    ))
}

/// Declarative form of a rule.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub type_tag: TypeTag,
    pub matcher: Option<MatchSpec>,
}

impl RuleSpec {
    pub fn new(type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            matcher: None,
        }
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.matcher = Some(MatchSpec::Pattern(pattern));
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.matcher = Some(MatchSpec::Conditions(conditions));
        self
    }

    pub fn with_matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = Some(MatchSpec::Function(matcher));
        self
    }

    /// Returns true if `map` has the rule shape: only `type` and `match`
    /// keys, with a string `type`.
    pub fn is_rule_shape(map: &Map<String, serde_json::Value>) -> bool {
        !map.is_empty()
            && map.keys().all(|k| k == "type" || k == "match")
            && map.get("type").map_or(false, serde_json::Value::is_string)
    }

    /// Parses a `{ "type": ..., "match": ... }` object.
    pub fn from_json(path: &str, map: &Map<String, serde_json::Value>) -> Result<Self, ConfigError> {
        let tag = map
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ConfigError::invalid_rule(path, "rule.type must be a type name"))?;
        let mut spec = RuleSpec::new(TypeTag::new(tag)?);
        if let Some(json) = map.get("match") {
            spec.matcher = Some(MatchSpec::from_json(json)?);
        }
        Ok(spec)
    }
}

impl From<TypeTag> for RuleSpec {
    fn from(tag: TypeTag) -> Self {
        RuleSpec::new(tag)
    }
}

/// A compiled leaf validator.
#[derive(Debug, Clone)]
pub struct Rule {
    type_tag: TypeTag,
    matcher: Option<Matcher>,
}

impl Rule {
    pub fn new(spec: RuleSpec) -> Self {
        Self {
            type_tag: spec.type_tag,
            matcher: spec.matcher.map(MatchSpec::compile),
        }
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn matcher(&self) -> Option<&Matcher> {
        self.matcher.as_ref()
    }

    /// True iff the matcher must be awaited.
    pub fn is_async(&self) -> bool {
        self.matcher.as_ref().map_or(false, Matcher::is_async)
    }

    /// Checks `value` against the process-wide registry with no context.
    pub fn validate(&self, value: Option<&Value>) -> Result<(), MatchError> {
        self.validate_in(value, &Value::Null, &types::global())
    }

    /// Checks `value` synchronously.
    ///
    /// An async rule cannot be checked this way and reports a fault.
    pub fn validate_in(
        &self,
        value: Option<&Value>,
        ctx: &Value,
        registry: &TypeRegistry,
    ) -> Result<(), MatchError> {
        self.check_type(value, registry)?;
        match &self.matcher {
            None => Ok(()),
            Some(Matcher::Sync(f)) => f(value, ctx),
            Some(Matcher::Async(_)) => Err(MatchError::faulted(
                "async matcher requires validate_async",
            )),
        }
    }

    /// Checks `value`, awaiting an async matcher.
    pub async fn validate_async(
        &self,
        value: Option<&Value>,
        ctx: Arc<Value>,
        registry: &TypeRegistry,
    ) -> Result<(), MatchError> {
        self.check_type(value, registry)?;
        match &self.matcher {
            None => Ok(()),
            Some(Matcher::Sync(f)) => f(value, &*ctx),
            Some(Matcher::Async(f)) => f(value.cloned(), ctx).await,
        }
    }

    /// Absent and null values skip the type check.
    fn check_type(&self, value: Option<&Value>, registry: &TypeRegistry) -> Result<(), MatchError> {
        let value = match value {
            None | Some(Value::Null) => return Ok(()),
            Some(v) => v,
        };
        let descriptor = registry
            .get_type(&self.type_tag)
            .ok_or_else(|| MatchError::rejected("Rule is of unsupported type"))?;
        if !descriptor.matches(value) {
            return Err(MatchError::rejected(format!(
                "Must be an instance of {}",
                descriptor.name()
            )));
        }
        Ok(())
    }
}

impl From<TypeTag> for Rule {
    fn from(tag: TypeTag) -> Self {
        Rule::new(RuleSpec::new(tag))
    }
}

impl From<RuleSpec> for Rule {
    fn from(spec: RuleSpec) -> Self {
        Rule::new(spec)
    }
}
