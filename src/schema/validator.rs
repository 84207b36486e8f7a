//! Schema compilation and record validation
//!
//! Validation semantics:
//! - The record must be an object
//! - Leaves check type (skipped for absent/null) then match
//! - Array nodes require an array; each element is checked positionally
//! - Object nodes require an object; each rule key is checked, absent keys
//!   pass `None` down
//! - Exclusive: undeclared record keys fail the node, nothing else is
//!   reported for it
//! - Inclusive: absent rule keys fail the node, nothing else is reported
//!   for it (exclusive runs first)
//!
//! Partial validation: only leaves whose full path is listed run. Every
//! node is still visited, so shape checks and key gates always apply.
//!
//! The compiled tree is never mutated. A validation only overwrites
//! `last_error` and bumps counters.

use std::sync::{Arc, Mutex};

use futures_util::future::{join_all, BoxFuture, FutureExt};

use super::definition::{check_depth, join_path, RuleDef, SchemaDef, SchemaOptions};
use super::errors::{ConfigError, MatchError, SchemaError, SchemaResult, ValidationError};
use super::report::ErrorTree;
use super::rule::Rule;
use crate::config::EngineConfig;
use crate::observability::{log_event, Event, MetricsRegistry, MetricsSnapshot, ObservationScope};
use crate::types::{self, TypeRegistry};
use crate::value::Value;

const ARRAY_MISMATCH: &str = "Must be an instance of Array";
const OBJECT_MISMATCH: &str = "Must be an instance of Object";

/// A compiled rule tree.
#[derive(Debug, Clone)]
pub enum RuleNode {
    Leaf(Rule),
    Object(Vec<(String, RuleNode)>),
    Array(Box<RuleNode>),
}

impl RuleNode {
    fn compile(def: RuleDef, path: &str, depth: usize, max_depth: usize) -> Result<Self, ConfigError> {
        match def {
            RuleDef::Leaf(spec) => Ok(RuleNode::Leaf(Rule::new(spec))),
            RuleDef::Rule(rule) => Ok(RuleNode::Leaf(rule)),
            RuleDef::Object(entries) => {
                check_depth(depth, max_depth)?;
                let fields = entries
                    .into_iter()
                    .map(|(key, child)| {
                        let child = RuleNode::compile(child, &join_path(path, &key), depth + 1, max_depth)?;
                        Ok((key, child))
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                Ok(RuleNode::Object(fields))
            }
            RuleDef::Array(items) => {
                let [element]: [RuleDef; 1] = items.try_into().map_err(|items: Vec<RuleDef>| {
                    ConfigError::invalid_rule(
                        path,
                        format!(
                            "array rules must hold exactly one element schema, found {}",
                            items.len()
                        ),
                    )
                })?;
                check_depth(depth, max_depth)?;
                let element = RuleNode::compile(element, &join_path(path, "0"), depth + 1, max_depth)?;
                Ok(RuleNode::Array(Box::new(element)))
            }
        }
    }

    /// True if any reachable leaf is async.
    pub fn is_async(&self) -> bool {
        match self {
            RuleNode::Leaf(rule) => rule.is_async(),
            RuleNode::Object(fields) => fields.iter().any(|(_, child)| child.is_async()),
            RuleNode::Array(element) => element.is_async(),
        }
    }

    /// Number of leaf rules in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            RuleNode::Leaf(_) => 1,
            RuleNode::Object(fields) => fields.iter().map(|(_, child)| child.leaf_count()).sum(),
            RuleNode::Array(element) => element.leaf_count(),
        }
    }
}

/// Per-call options for [`Schema::validate_with`] and
/// [`Schema::validate_async`].
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Full dot-joined leaf paths to run; `None` runs every leaf.
    pub paths: Option<Vec<String>>,
    /// Object handed to every matcher.
    pub context: Option<Value>,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// A compiled schema.
///
/// Immutable after compilation and safe to share across threads.
#[derive(Debug)]
pub struct Schema {
    root: RuleNode,
    options: SchemaOptions,
    is_async: bool,
    registry: Arc<TypeRegistry>,
    last_error: Mutex<Option<SchemaError>>,
    metrics: MetricsRegistry,
}

impl Schema {
    /// Compiles against the process-wide registry with default config.
    pub fn compile(def: SchemaDef) -> Result<Self, ConfigError> {
        Self::compile_with_config(def, types::global(), &EngineConfig::default())
    }

    /// Compiles against a specific registry.
    pub fn compile_with_registry(
        def: SchemaDef,
        registry: Arc<TypeRegistry>,
    ) -> Result<Self, ConfigError> {
        Self::compile_with_config(def, registry, &EngineConfig::default())
    }

    /// Compiles against a specific registry and config.
    ///
    /// Type tags are resolved when validating, not here.
    pub fn compile_with_config(
        def: SchemaDef,
        registry: Arc<TypeRegistry>,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        let fields = def
            .fields
            .into_iter()
            .map(|(key, child)| {
                let child = RuleNode::compile(child, &key, 1, config.max_definition_depth)?;
                Ok((key, child))
            })
            .collect::<Result<Vec<_>, ConfigError>>()
            .map_err(rejected)?;

        let root = RuleNode::Object(fields);
        let is_async = root.is_async();
        let options = def.options;

        log_event(
            Event::SchemaCompiled,
            &[
                ("async", bool_str(is_async)),
                ("exclusive", bool_str(options.exclusive)),
                ("inclusive", bool_str(options.inclusive)),
                ("leaves", &root.leaf_count().to_string()),
            ],
        );

        Ok(Self {
            root,
            options,
            is_async,
            registry,
            last_error: Mutex::new(None),
            metrics: MetricsRegistry::new(),
        })
    }

    /// Parses and compiles a JSON definition.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ConfigError> {
        Self::from_json_with_config(json, types::global(), &EngineConfig::default())
    }

    /// Parses and compiles a JSON definition with a registry and config.
    pub fn from_json_with_config(
        json: &serde_json::Value,
        registry: Arc<TypeRegistry>,
        config: &EngineConfig,
    ) -> Result<Self, ConfigError> {
        let def = SchemaDef::from_json_with_depth(json, config.max_definition_depth)
            .map_err(rejected)?;
        Self::compile_with_config(def, registry, config)
    }

    /// Validates a whole record.
    pub fn validate(&self, record: &Value) -> SchemaResult<()> {
        self.validate_with(record, &ValidateOptions::default())
    }

    /// Validates synchronously.
    ///
    /// # Errors
    ///
    /// - `Config(AsyncRequiresAwait)` if the schema has async leaves
    /// - `InvalidArgument` for empty paths or a non-object context
    /// - `NotAnObject` if the record is not an object
    /// - `Config(MatcherFault)` if a matcher faulted
    /// - `Validation` with the error tree otherwise
    pub fn validate_with(&self, record: &Value, options: &ValidateOptions) -> SchemaResult<()> {
        self.metrics.increment_validations();
        let scope = self.begin("sync");
        let outcome = self.run_sync(record, options);
        self.settle(outcome, scope)
    }

    /// Validates, awaiting async leaves. Works for every schema.
    ///
    /// Sibling leaves run concurrently; errors are aggregated in
    /// declaration and index order regardless of completion order.
    pub async fn validate_async(&self, record: &Value, options: &ValidateOptions) -> SchemaResult<()> {
        self.metrics.increment_validations();
        self.metrics.increment_async_validations();
        let scope = self.begin("async");
        let outcome = match self.prepare(record, options) {
            Ok(walk) => walk
                .walk_async(&self.root, Some(record), String::new())
                .await
                .map_err(SchemaError::from),
            Err(err) => Err(err),
        };
        self.settle(outcome, scope)
    }

    /// Result of the most recent validation, `None` if it passed.
    pub fn last_error(&self) -> Option<SchemaError> {
        match self.last_error.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn options(&self) -> SchemaOptions {
        self.options
    }

    /// The compiled rule tree.
    pub fn root(&self) -> &RuleNode {
        &self.root
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn run_sync(&self, record: &Value, options: &ValidateOptions) -> SchemaResult<Option<ErrorTree>> {
        if self.is_async {
            return Err(ConfigError::AsyncRequiresAwait.into());
        }
        let walk = self.prepare(record, options)?;
        Ok(walk.walk_sync(&self.root, Some(record), "")?)
    }

    /// Checks call arguments, in the order paths, context, record.
    fn prepare<'a>(&'a self, record: &Value, options: &'a ValidateOptions) -> SchemaResult<Walk<'a>> {
        if let Some(paths) = &options.paths {
            if paths.iter().any(|p| p.is_empty()) {
                return Err(SchemaError::InvalidArgument(
                    "paths must only contain non-empty strings".to_string(),
                ));
            }
        }

        let ctx = match &options.context {
            None | Some(Value::Null) => Value::Null,
            Some(ctx @ Value::Object(_)) => ctx.clone(),
            Some(other) => {
                return Err(SchemaError::InvalidArgument(format!(
                    "ctx must be an object, got {}",
                    other.kind_name()
                )))
            }
        };

        if record.as_object().is_none() {
            return Err(SchemaError::NotAnObject);
        }

        Ok(Walk {
            registry: self.registry.as_ref(),
            options: self.options,
            filter: PathFilter {
                paths: options.paths.as_deref(),
            },
            ctx: Arc::new(ctx),
        })
    }

    fn begin(&self, mode: &'static str) -> ObservationScope {
        log_event(Event::ValidationBegin, &[("mode", mode)]);
        ObservationScope::with_fields("VALIDATION_RUN", vec![("mode", mode.to_string())])
    }

    fn settle(
        &self,
        outcome: SchemaResult<Option<ErrorTree>>,
        scope: ObservationScope,
    ) -> SchemaResult<()> {
        let result = match outcome {
            Ok(None) => {
                self.metrics.increment_passed();
                log_event(Event::ValidationPassed, &[]);
                scope.complete();
                Ok(())
            }
            Ok(Some(errors)) => {
                let leaves = errors.leaf_count();
                self.metrics.record_failure(leaves as u64);
                log_event(Event::ValidationFailed, &[("leaves", &leaves.to_string())]);
                scope.complete();
                Err(SchemaError::Validation(ValidationError::new(errors)))
            }
            Err(err) => {
                self.metrics.increment_refused();
                let reason = err.to_string();
                log_event(
                    Event::ValidationRefused,
                    &[("code", err.code()), ("reason", &reason)],
                );
                scope.fail(Event::ValidationRefused.severity(), err.code());
                Err(err)
            }
        };

        let stored = result.as_ref().err().cloned();
        match self.last_error.lock() {
            Ok(mut slot) => *slot = stored,
            Err(poisoned) => *poisoned.into_inner() = stored,
        }
        result
    }
}

fn rejected(err: ConfigError) -> ConfigError {
    log_event(
        Event::SchemaRejected,
        &[("code", err.code()), ("reason", &err.to_string())],
    );
    err
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Compiles and validates in one call, against the process-wide registry.
pub fn validate(def: SchemaDef, record: &Value) -> SchemaResult<()> {
    Schema::compile(def)?.validate(record)
}

/// Restricts which leaves a walk evaluates.
#[derive(Debug, Clone, Copy)]
struct PathFilter<'a> {
    paths: Option<&'a [String]>,
}

impl PathFilter<'_> {
    /// A leaf runs only when its full path is listed.
    fn runs_leaf(&self, path: &str) -> bool {
        match self.paths {
            None => true,
            Some(paths) => paths.iter().any(|p| p == path),
        }
    }
}

type NodeResult = Result<Option<ErrorTree>, ConfigError>;

/// State of one validation call.
struct Walk<'a> {
    registry: &'a TypeRegistry,
    options: SchemaOptions,
    filter: PathFilter<'a>,
    ctx: Arc<Value>,
}

impl<'a> Walk<'a> {
    fn walk_sync(&self, node: &RuleNode, value: Option<&Value>, path: &str) -> NodeResult {
        match node {
            RuleNode::Leaf(rule) => {
                if !self.filter.runs_leaf(path) {
                    return Ok(None);
                }
                leaf_outcome(path, rule.validate_in(value, &self.ctx, self.registry))
            }
            RuleNode::Array(element) => {
                let Some(items) = value.and_then(Value::as_array) else {
                    return Ok(Some(ErrorTree::leaf(ARRAY_MISMATCH)));
                };
                let results = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.walk_sync(element, Some(item), &join_path(path, &i.to_string())))
                    .collect();
                collect_indexed(results)
            }
            RuleNode::Object(fields) => {
                let Some(record) = value else {
                    return Ok(Some(ErrorTree::leaf(OBJECT_MISMATCH)));
                };
                if record.as_object().is_none() {
                    return Ok(Some(ErrorTree::leaf(OBJECT_MISMATCH)));
                }
                if let Some(errors) = self.gate(fields, record, path) {
                    return Ok(Some(errors));
                }
                let results = fields
                    .iter()
                    .map(|(key, child)| self.walk_sync(child, record.get(key), &join_path(path, key)))
                    .collect();
                collect_keyed(fields, results)
            }
        }
    }

    fn walk_async<'w>(
        &'w self,
        node: &'w RuleNode,
        value: Option<&'w Value>,
        path: String,
    ) -> BoxFuture<'w, NodeResult> {
        async move {
            match node {
                RuleNode::Leaf(rule) => {
                    if !self.filter.runs_leaf(&path) {
                        return Ok(None);
                    }
                    let outcome = rule
                        .validate_async(value, Arc::clone(&self.ctx), self.registry)
                        .await;
                    leaf_outcome(&path, outcome)
                }
                RuleNode::Array(element) => {
                    let Some(items) = value.and_then(Value::as_array) else {
                        return Ok(Some(ErrorTree::leaf(ARRAY_MISMATCH)));
                    };
                    let pending = items.iter().enumerate().map(|(i, item)| {
                        self.walk_async(element, Some(item), join_path(&path, &i.to_string()))
                    });
                    collect_indexed(join_all(pending).await)
                }
                RuleNode::Object(fields) => {
                    let Some(record) = value.filter(|v| v.as_object().is_some()) else {
                        return Ok(Some(ErrorTree::leaf(OBJECT_MISMATCH)));
                    };
                    if let Some(errors) = self.gate(fields, record, &path) {
                        return Ok(Some(errors));
                    }
                    let pending = fields.iter().map(|(key, child)| {
                        self.walk_async(child, record.get(key), join_path(&path, key))
                    });
                    collect_keyed(fields, join_all(pending).await)
                }
            }
        }
        .boxed()
    }

    /// Exclusive and inclusive key gates for one object node.
    ///
    /// Extra keys are reported in the record's key order, which is sorted
    /// since objects are `BTreeMap`s. Missing keys follow declaration order.
    fn gate(&self, fields: &[(String, RuleNode)], record: &Value, path: &str) -> Option<ErrorTree> {
        let map = record.as_object()?;

        if self.options.exclusive {
            let extra = map
                .keys()
                .filter(|key| !fields.iter().any(|(name, _)| name == *key))
                .map(|key| {
                    let message = format!("{} is not an allowed path", join_path(path, key));
                    (key.clone(), ErrorTree::leaf(message))
                })
                .collect();
            if let Some(errors) = ErrorTree::from_keyed(extra) {
                return Some(errors);
            }
        }

        if self.options.inclusive {
            let missing = fields
                .iter()
                .filter(|(name, _)| !map.contains_key(name))
                .map(|(name, _)| {
                    let message = format!("{} must exist", join_path(path, name));
                    (name.clone(), ErrorTree::leaf(message))
                })
                .collect();
            if let Some(errors) = ErrorTree::from_keyed(missing) {
                return Some(errors);
            }
        }

        None
    }
}

fn leaf_outcome(path: &str, outcome: Result<(), MatchError>) -> NodeResult {
    match outcome {
        Ok(()) => Ok(None),
        Err(MatchError::Rejected(message)) => Ok(Some(ErrorTree::Leaf(message))),
        Err(MatchError::Faulted(message)) => {
            log_event(Event::MatcherFaulted, &[("path", path), ("reason", &message)]);
            Err(ConfigError::MatcherFault {
                path: path.to_string(),
                message,
            })
        }
    }
}

/// Aggregates per-index results. Every sibling has already run; the first
/// fault, if any, wins.
fn collect_indexed(results: Vec<NodeResult>) -> NodeResult {
    let entries = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    Ok(ErrorTree::from_indexed(entries))
}

/// Aggregates per-key results in declaration order.
fn collect_keyed(fields: &[(String, RuleNode)], results: Vec<NodeResult>) -> NodeResult {
    let mut entries = Vec::new();
    for ((key, _), result) in fields.iter().zip(results) {
        if let Some(errors) = result? {
            entries.push((key.clone(), errors));
        }
    }
    Ok(ErrorTree::from_keyed(entries))
}
