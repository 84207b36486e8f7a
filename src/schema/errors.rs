//! Schema error types
//!
//! Error codes:
//! - SHAPE_CONFIG_* (malformed types, rules, match conditions, directives)
//! - SHAPE_VALIDATION_FAILED (record violates the schema)
//! - SHAPE_NOT_AN_OBJECT (record is not an object)
//! - SHAPE_INVALID_ARGUMENT (bad paths or context)
//!
//! Configuration errors surface at registration and compile time. The two
//! exceptions, an async schema on the sync path and a faulted matcher, are
//! discovered while validating and travel through the result channel.

use std::fmt;

use thiserror::Error;

use super::report::ErrorTree;

/// Malformed schema, rule, match or registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid type tag '{0}': must be an identifier")]
    InvalidTypeTag(String),

    #[error("type name must be a non-empty string")]
    InvalidTypeName,

    #[error("type '{0}' is already registered")]
    DuplicateType(String),

    #[error("type registry is unavailable")]
    RegistryUnavailable,

    #[error("invalid rule at '{path}': {reason}")]
    InvalidRule { path: String, reason: String },

    #[error("invalid match condition: {0}")]
    InvalidMatch(String),

    #[error("directive {0} must be a boolean")]
    InvalidDirective(String),

    #[error("rule definition is nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("schema has async rules and must be validated with validate_async")]
    AsyncRequiresAwait,

    #[error("matcher at '{path}' faulted: {message}")]
    MatcherFault { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid_rule(path: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidRule {
            path: if path.is_empty() { "$root".to_string() } else { path.to_string() },
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidTypeTag(_) => "SHAPE_CONFIG_TYPE_TAG",
            ConfigError::InvalidTypeName => "SHAPE_CONFIG_TYPE_NAME",
            ConfigError::DuplicateType(_) => "SHAPE_CONFIG_DUPLICATE_TYPE",
            ConfigError::RegistryUnavailable => "SHAPE_CONFIG_REGISTRY_UNAVAILABLE",
            ConfigError::InvalidRule { .. } => "SHAPE_CONFIG_RULE",
            ConfigError::InvalidMatch(_) => "SHAPE_CONFIG_MATCH",
            ConfigError::InvalidDirective(_) => "SHAPE_CONFIG_DIRECTIVE",
            ConfigError::TooDeep(_) => "SHAPE_CONFIG_TOO_DEEP",
            ConfigError::AsyncRequiresAwait => "SHAPE_CONFIG_ASYNC_REQUIRES_AWAIT",
            ConfigError::MatcherFault { .. } => "SHAPE_CONFIG_MATCHER_FAULT",
        }
    }
}

/// Outcome of a single leaf or matcher that did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The value is invalid; the message lands in the error tree.
    #[error("{0}")]
    Rejected(String),

    /// The matcher itself broke; validation is aborted.
    #[error("{0}")]
    Faulted(String),
}

impl MatchError {
    pub fn rejected(message: impl Into<String>) -> Self {
        MatchError::Rejected(message.into())
    }

    pub fn faulted(message: impl Into<String>) -> Self {
        MatchError::Faulted(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            MatchError::Rejected(message) | MatchError::Faulted(message) => message,
        }
    }
}

/// A record failed one or more rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    errors: ErrorTree,
}

impl ValidationError {
    pub fn new(errors: ErrorTree) -> Self {
        Self { errors }
    }

    /// The per-path error tree.
    pub fn errors(&self) -> &ErrorTree {
        &self.errors
    }

    pub fn into_errors(self) -> ErrorTree {
        self.errors
    }

    /// JSON rendering of the error tree.
    pub fn to_json(&self) -> serde_json::Value {
        self.errors.to_json()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema Error:")?;
        for (path, message) in self.errors.flatten() {
            write!(f, "\n\t{}: {}", path, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Everything `Schema::validate*` can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("must be an object")]
    NotAnObject,

    #[error("{0}")]
    InvalidArgument(String),
}

impl SchemaError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Config(err) => err.code(),
            SchemaError::Validation(_) => "SHAPE_VALIDATION_FAILED",
            SchemaError::NotAnObject => "SHAPE_NOT_AN_OBJECT",
            SchemaError::InvalidArgument(_) => "SHAPE_INVALID_ARGUMENT",
        }
    }

    /// The error tree, if the record itself was invalid.
    pub fn errors(&self) -> Option<&ErrorTree> {
        match self {
            SchemaError::Validation(err) => Some(err.errors()),
            _ => None,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, SchemaError::Config(_))
    }
}

/// Result type for validation
pub type SchemaResult<T> = Result<T, SchemaError>;
