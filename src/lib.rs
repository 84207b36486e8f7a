//! shapeguard - declarative record validation
//!
//! Nested schemas of typed, condition-bearing rules checked against
//! in-memory records, with structured per-path error trees.
//!
//! ```ignore
//! use serde_json::json;
//! use shapeguard::{Schema, Value};
//!
//! let schema = Schema::from_json(&json!({
//!     "$exclusive": true,
//!     "name": {"type": "String", "match": {"exists": true, "min": 1}},
//!     "tags": ["String"],
//! }))?;
//! schema.validate(&Value::from(json!({"name": "ada", "tags": ["x"]})))?;
//! ```

pub mod config;
pub mod observability;
pub mod schema;
pub mod types;
pub mod value;

pub use config::EngineConfig;
pub use schema::{
    validate, Conditions, ConfigError, ErrorTree, MatchError, Matcher, Rule, RuleDef, RuleSpec,
    Schema, SchemaDef, SchemaError, SchemaOptions, SchemaResult, ValidateOptions,
    ValidationError,
};
pub use types::{add_type, get_type, TypeDescriptor, TypeRegistry, TypeTag};
pub use value::{Pattern, Value};
