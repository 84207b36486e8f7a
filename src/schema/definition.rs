//! Rule definitions
//!
//! The uncompiled rule tree, built in code or parsed from JSON:
//!
//! - `"String"`: a leaf with a type tag
//! - `{ "type": "String", "match": {...} }`: a leaf with a match condition
//! - `{ "name": ..., "tags": ... }`: an object node
//! - `[ ... ]`: an array node with exactly one element schema
//!
//! Top-level `$inclusive`, `$exclusive` and `$script` (alias `$strict`)
//! set schema-wide options and are removed before compilation.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::errors::ConfigError;
use super::rule::{Rule, RuleSpec};
use crate::config::DEFAULT_MAX_DEFINITION_DEPTH;
use crate::types::TypeTag;

/// One node of an uncompiled rule tree.
#[derive(Debug, Clone)]
pub enum RuleDef {
    Leaf(RuleSpec),
    Rule(Rule),
    Object(Vec<(String, RuleDef)>),
    /// Must hold exactly one element schema to compile.
    Array(Vec<RuleDef>),
}

impl RuleDef {
    /// Object node from `(key, definition)` pairs, in declaration order.
    pub fn object<K, D, I>(entries: I) -> Self
    where
        K: Into<String>,
        D: Into<RuleDef>,
        I: IntoIterator<Item = (K, D)>,
    {
        RuleDef::Object(
            entries
                .into_iter()
                .map(|(k, d)| (k.into(), d.into()))
                .collect(),
        )
    }

    /// Array node validating every element against `element`.
    pub fn array(element: impl Into<RuleDef>) -> Self {
        RuleDef::Array(vec![element.into()])
    }

    /// Parses a JSON definition node at `path`, `depth` levels deep.
    pub fn from_json(
        path: &str,
        json: &serde_json::Value,
        depth: usize,
        max_depth: usize,
    ) -> Result<Self, ConfigError> {
        use serde_json::Value as Json;

        match json {
            Json::String(tag) => Ok(RuleDef::Leaf(RuleSpec::new(TypeTag::new(tag.as_str())?))),
            Json::Object(map) if RuleSpec::is_rule_shape(map) => {
                Ok(RuleDef::Leaf(RuleSpec::from_json(path, map)?))
            }
            Json::Object(map) => {
                check_depth(depth, max_depth)?;
                let mut entries = Vec::with_capacity(map.len());
                for (key, child) in map {
                    let child_path = join_path(path, key);
                    entries.push((
                        key.clone(),
                        RuleDef::from_json(&child_path, child, depth + 1, max_depth)?,
                    ));
                }
                Ok(RuleDef::Object(entries))
            }
            Json::Array(items) if items.len() == 1 => {
                check_depth(depth, max_depth)?;
                let element = RuleDef::from_json(&join_path(path, "0"), &items[0], depth + 1, max_depth)?;
                Ok(RuleDef::Array(vec![element]))
            }
            Json::Array(items) => Err(ConfigError::invalid_rule(
                path,
                format!("array rules must hold exactly one element schema, found {}", items.len()),
            )),
            other => Err(ConfigError::invalid_rule(
                path,
                format!(
                    "each rule must be a type name, rule object, object or array, got {}",
                    other
                ),
            )),
        }
    }
}

pub(crate) fn check_depth(depth: usize, max_depth: usize) -> Result<(), ConfigError> {
    if depth > max_depth {
        return Err(ConfigError::TooDeep(max_depth));
    }
    Ok(())
}

pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

impl From<TypeTag> for RuleDef {
    fn from(tag: TypeTag) -> Self {
        RuleDef::Leaf(RuleSpec::new(tag))
    }
}

impl From<RuleSpec> for RuleDef {
    fn from(spec: RuleSpec) -> Self {
        RuleDef::Leaf(spec)
    }
}

impl From<Rule> for RuleDef {
    fn from(rule: Rule) -> Self {
        RuleDef::Rule(rule)
    }
}

/// Schema-wide key-set enforcement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Every rule key must be present in the record.
    pub inclusive: bool,
    /// Every record key must be declared by a rule.
    pub exclusive: bool,
}

impl SchemaOptions {
    /// Both inclusive and exclusive.
    pub fn strict() -> Self {
        Self {
            inclusive: true,
            exclusive: true,
        }
    }
}

/// A root rule definition plus its options.
#[derive(Debug, Clone, Default)]
pub struct SchemaDef {
    pub options: SchemaOptions,
    pub fields: Vec<(String, RuleDef)>,
}

impl SchemaDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root field.
    pub fn field(mut self, name: impl Into<String>, def: impl Into<RuleDef>) -> Self {
        self.fields.push((name.into(), def.into()));
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.options.inclusive = inclusive;
        self
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.options.exclusive = exclusive;
        self
    }

    pub fn strict(mut self) -> Self {
        self.options = SchemaOptions::strict();
        self
    }

    /// Parses a JSON definition with the default depth limit.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ConfigError> {
        Self::from_json_with_depth(json, DEFAULT_MAX_DEFINITION_DEPTH)
    }

    /// Parses a JSON definition, rejecting nesting beyond `max_depth`.
    pub fn from_json_with_depth(
        json: &serde_json::Value,
        max_depth: usize,
    ) -> Result<Self, ConfigError> {
        let map = json
            .as_object()
            .ok_or_else(|| ConfigError::invalid_rule("", "rules must be an object"))?;

        let options = extract_options(map)?;
        let mut fields = Vec::with_capacity(map.len());
        for (key, child) in map {
            if is_directive(key) {
                continue;
            }
            fields.push((key.clone(), RuleDef::from_json(key, child, 1, max_depth)?));
        }
        Ok(Self { options, fields })
    }
}

const DIRECTIVES: [&str; 4] = ["$inclusive", "$exclusive", "$script", "$strict"];

fn is_directive(key: &str) -> bool {
    DIRECTIVES.contains(&key)
}

fn extract_options(map: &Map<String, serde_json::Value>) -> Result<SchemaOptions, ConfigError> {
    let mut options = SchemaOptions::default();
    for directive in DIRECTIVES {
        let Some(value) = map.get(directive) else {
            continue;
        };
        let enabled = value
            .as_bool()
            .ok_or_else(|| ConfigError::InvalidDirective(directive.to_string()))?;
        if !enabled {
            continue;
        }
        match directive {
            "$inclusive" => options.inclusive = true,
            "$exclusive" => options.exclusive = true,
            _ => options = SchemaOptions::strict(),
        }
    }
    Ok(options)
}
