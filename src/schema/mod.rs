//! Schema subsystem
//!
//! Rule definitions compile once into an immutable tree of leaf rules,
//! object nodes and array nodes. Records are then walked against that
//! tree, producing an error tree shaped like the record.
//!
//! # Design Principles
//!
//! - Malformed definitions fail at compile time, never while validating
//! - Leaf failures never abort siblings
//! - Async leaves run concurrently; results aggregate positionally
//! - Validation never mutates the compiled tree

mod conditions;
mod definition;
mod errors;
mod report;
mod rule;
mod validator;

pub use conditions::{AsyncMatchFn, Conditions, Matcher, SyncMatchFn, Threshold, CONDITION_KEYS};
pub use definition::{RuleDef, SchemaDef, SchemaOptions};
pub use errors::{ConfigError, MatchError, SchemaError, SchemaResult, ValidationError};
pub use report::ErrorTree;
pub use rule::{MatchSpec, Rule, RuleSpec};
pub use validator::{validate, RuleNode, Schema, ValidateOptions};
