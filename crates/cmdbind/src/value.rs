//! Type identifiers and type-erased argument values.
//!
//! Converters produce `Value`s; the binder collects them in parameter order
//! and handlers pull them back out with their concrete types.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a parameter or converter output type.
///
/// Equality only looks at the `TypeId`; the name is kept for messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An owned, converted argument value.
pub struct Value {
    key: TypeKey,
    inner: Box<dyn Any + Send>,
}

impl Value {
    pub fn new<T: Send + 'static>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            inner: Box::new(value),
        }
    }

    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Recover the concrete value, handing `self` back on a type mismatch.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let key = self.key;
        match self.inner.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(inner) => Err(Self { key, inner }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.key)
    }
}
