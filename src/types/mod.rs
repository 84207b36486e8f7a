//! Type registry
//!
//! Maps type tags to a display name and a membership predicate. The
//! process-wide registry is append-only and preloaded with the built-ins;
//! isolated registries can be built for tests or embedding.

mod builtin;
mod registry;

pub use builtin::register_builtin_types;
pub use registry::{
    add_type, get_type, global, TypeDescriptor, TypePredicate, TypeRegistry, TypeTag,
};
