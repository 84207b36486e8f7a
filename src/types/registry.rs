//! Type tags, descriptors and the registry that maps one to the other.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use crate::observability::{log_event, Event, Logger};
use crate::schema::ConfigError;
use crate::value::Value;

use super::builtin::register_builtin_types;

/// Identifier selecting a registered type descriptor.
///
/// Tags are identifiers (`[A-Za-z_][A-Za-z0-9_]*`), compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub const STRING: TypeTag = TypeTag(Cow::Borrowed("String"));
    pub const NUMBER: TypeTag = TypeTag(Cow::Borrowed("Number"));
    pub const BOOLEAN: TypeTag = TypeTag(Cow::Borrowed("Boolean"));
    pub const ARRAY: TypeTag = TypeTag(Cow::Borrowed("Array"));
    pub const OBJECT: TypeTag = TypeTag(Cow::Borrowed("Object"));
    pub const DATE: TypeTag = TypeTag(Cow::Borrowed("Date"));
    pub const REGEXP: TypeTag = TypeTag(Cow::Borrowed("RegExp"));
    pub const BUFFER: TypeTag = TypeTag(Cow::Borrowed("Buffer"));

    /// Creates a tag, rejecting anything that is not an identifier.
    pub fn new(tag: impl Into<String>) -> Result<Self, ConfigError> {
        let tag = tag.into();
        if !Self::is_identifier(&tag) {
            return Err(ConfigError::InvalidTypeTag(tag));
        }
        Ok(TypeTag(Cow::Owned(tag)))
    }

    /// Returns true if `s` is usable as a tag.
    pub fn is_identifier(s: &str) -> bool {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for TypeTag {
    type Error = ConfigError;

    fn try_from(tag: &str) -> Result<Self, Self::Error> {
        TypeTag::new(tag)
    }
}

/// Predicate deciding whether a value belongs to a type.
pub type TypePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A registered type: tag, display name and membership predicate.
pub struct TypeDescriptor {
    tag: TypeTag,
    name: String,
    validate: TypePredicate,
}

impl TypeDescriptor {
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Name used in `Must be an instance of {name}`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the membership predicate.
    pub fn matches(&self, value: &Value) -> bool {
        (self.validate)(value)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("tag", &self.tag)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Append-only mapping from type tag to descriptor.
///
/// Written during startup, read concurrently by every validation after.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<TypeTag, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in types.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        if let Err(err) = register_builtin_types(&registry) {
            Logger::error("TYPE_REGISTRY_INIT_FAILED", &[("reason", &err.to_string())]);
        }
        registry
    }

    /// Registers a new type.
    ///
    /// # Errors
    ///
    /// - `InvalidTypeName` if `name` is empty
    /// - `DuplicateType` if `tag` is already registered
    /// - `RegistryUnavailable` if the lock is poisoned
    pub fn add_type<F>(
        &self,
        tag: TypeTag,
        name: impl Into<String>,
        validate: F,
    ) -> Result<Arc<TypeDescriptor>, ConfigError>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidTypeName);
        }

        let mut types = self
            .types
            .write()
            .map_err(|_| ConfigError::RegistryUnavailable)?;
        if types.contains_key(&tag) {
            return Err(ConfigError::DuplicateType(tag.to_string()));
        }

        let descriptor = Arc::new(TypeDescriptor {
            tag: tag.clone(),
            name,
            validate: Arc::new(validate),
        });
        types.insert(tag, Arc::clone(&descriptor));
        drop(types);

        log_event(
            Event::TypeRegistered,
            &[("name", descriptor.name()), ("tag", descriptor.tag().as_str())],
        );
        Ok(descriptor)
    }

    /// Looks up a descriptor by tag identity.
    pub fn get_type(&self, tag: &TypeTag) -> Option<Arc<TypeDescriptor>> {
        self.types.read().ok()?.get(tag).cloned()
    }

    /// Looks up a descriptor by its display name.
    pub fn get_type_by_name(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        let types = self.types.read().ok()?;
        types.values().find(|d| d.name() == name).cloned()
    }

    /// Looks up by tag first, then by display name.
    ///
    /// Not-found is `Ok(None)`; only a malformed identifier is an error.
    pub fn lookup(&self, tag_or_name: &str) -> Result<Option<Arc<TypeDescriptor>>, ConfigError> {
        let tag = TypeTag::new(tag_or_name)?;
        Ok(self
            .get_type(&tag)
            .or_else(|| self.get_type_by_name(tag_or_name)))
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<TypeTag> = self
            .types
            .read()
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.types.read().map(|types| types.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry").field("tags", &self.tags()).finish()
    }
}

static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();

/// The process-wide registry, created with the built-in types on first use.
pub fn global() -> Arc<TypeRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(TypeRegistry::with_builtins())))
}

/// Registers a type in the process-wide registry.
pub fn add_type<F>(
    tag: TypeTag,
    name: impl Into<String>,
    validate: F,
) -> Result<Arc<TypeDescriptor>, ConfigError>
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    global().add_type(tag, name, validate)
}

/// Looks up a type in the process-wide registry.
pub fn get_type(tag: &TypeTag) -> Option<Arc<TypeDescriptor>> {
    global().get_type(tag)
}
