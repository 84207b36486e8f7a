//! Built-in type descriptors
//!
//! Each predicate accepts exactly one `Value` variant. Registration goes
//! through the same `add_type` contract user types use.

use crate::schema::ConfigError;
use crate::value::Value;

use super::registry::{TypeRegistry, TypeTag};

/// Registers `String`, `Number`, `Boolean`, `Array`, `Object`, `Date`,
/// `RegExp` and `Buffer` in `registry`.
pub fn register_builtin_types(registry: &TypeRegistry) -> Result<(), ConfigError> {
    registry.add_type(TypeTag::STRING, "String", |v| matches!(v, Value::String(_)))?;
    registry.add_type(TypeTag::NUMBER, "Number", |v| matches!(v, Value::Number(_)))?;
    registry.add_type(TypeTag::BOOLEAN, "Boolean", |v| matches!(v, Value::Bool(_)))?;
    registry.add_type(TypeTag::ARRAY, "Array", |v| matches!(v, Value::Array(_)))?;
    registry.add_type(TypeTag::OBJECT, "Object", |v| matches!(v, Value::Object(_)))?;
    registry.add_type(TypeTag::DATE, "Date", |v| matches!(v, Value::Date(_)))?;
    registry.add_type(TypeTag::REGEXP, "RegExp", |v| matches!(v, Value::Regex(_)))?;
    registry.add_type(TypeTag::BUFFER, "Buffer", |v| matches!(v, Value::Buffer(_)))?;
    Ok(())
}
