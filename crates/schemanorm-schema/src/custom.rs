//! # Custom Object Types
//!
//! A `custom` schema names an `obj_type`; the engine looks the name up in a
//! [`CustomTypeResolver`] and hands the whole value to the routine it
//! returns. The routine's error message becomes a validation error at the
//! current path.

use std::collections::HashMap;
use std::fmt;

use schemanorm_core::Value;

/// Normalization routine for one custom object type.
pub trait CustomType: Send + Sync {
    fn normalize(&self, value: Value) -> Result<Value, String>;
}

impl<F> CustomType for F
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync,
{
    fn normalize(&self, value: Value) -> Result<Value, String> {
        self(value)
    }
}

/// Maps `obj_type` names to their routines.
pub trait CustomTypeResolver: Send + Sync {
    fn resolve(&self, obj_type: &str) -> Option<&dyn CustomType>;
}

/// In-memory [`CustomTypeResolver`]. Empty by default.
#[derive(Default)]
pub struct CustomTypeRegistry {
    types: HashMap<String, Box<dyn CustomType>>,
}

impl CustomTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `routine` under `obj_type`, replacing any earlier entry.
    pub fn register(
        &mut self,
        obj_type: impl Into<String>,
        routine: impl CustomType + 'static,
    ) -> &mut Self {
        self.types.insert(obj_type.into(), Box::new(routine));
        self
    }

    /// Builder form of [`CustomTypeRegistry::register`].
    pub fn with(mut self, obj_type: impl Into<String>, routine: impl CustomType + 'static) -> Self {
        self.register(obj_type, routine);
        self
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl CustomTypeResolver for CustomTypeRegistry {
    fn resolve(&self, obj_type: &str) -> Option<&dyn CustomType> {
        self.types.get(obj_type).map(|routine| routine.as_ref())
    }
}

impl fmt::Debug for CustomTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}
