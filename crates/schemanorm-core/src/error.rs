//! # Error Types
//!
//! Two failure kinds are kept apart in the type system:
//!
//! - [`SchemaError`]: the schema itself is malformed. This is a programmer
//!   error in schema authoring; callers should not retry or surface it to
//!   end users.
//! - [`ValidationError`]: the value does not conform to a well-formed
//!   schema. Callers are expected to catch it and report it as user
//!   feedback.
//!
//! [`NormalizeError`] is the union returned by normalization. Every
//! message names what was received and what was expected.

use std::fmt;

use thiserror::Error;

use crate::path::ValuePath;

/// The schema is malformed. `location` fields are JSON Pointers into the
/// schema document (empty for the root schema node).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// A schema node (or property entry) is not a mapping.
    #[error("schema node at '{location}' must be a mapping, received {received}")]
    NotAMapping { location: String, received: String },

    /// The `type` tag is not one of the known schema types.
    #[error("Invalid schema type: {type_tag} (at schema location '{location}')")]
    UnknownType { location: String, type_tag: String },

    /// A key required for this schema type is absent.
    #[error("schema of type '{schema_type}' at '{location}' is missing required key '{key}'")]
    MissingKey {
        location: String,
        schema_type: String,
        key: String,
    },

    /// A key is present but holds the wrong kind of value.
    #[error("schema key '{key}' at '{location}' {expected}")]
    InvalidKey {
        location: String,
        key: String,
        /// What the key should hold, phrased to follow the key name.
        expected: String,
    },

    /// A key that this schema type does not define.
    #[error("schema of type '{schema_type}' at '{location}' has unexpected key '{key}'")]
    UnexpectedKey {
        location: String,
        schema_type: String,
        key: String,
    },

    /// Two properties of one dict schema share a name.
    #[error("dict schema at '{location}' declares property '{name}' more than once")]
    DuplicateProperty { location: String, name: String },

    /// A post-normalizer id that is not registered.
    #[error("Invalid normalizer id: {0}")]
    UnknownNormalizer(String),

    /// A post-normalizer entry with missing or unexpected arguments.
    #[error("normalizer '{id}' {reason}")]
    NormalizerArguments { id: String, reason: String },

    /// A custom schema whose `obj_type` has no registered routine.
    #[error("no custom object type registered under obj_type '{0}'")]
    UnknownObjType(String),
}

/// The value does not conform to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    path: ValuePath,
    message: String,
}

impl ValidationError {
    pub fn new(path: ValuePath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    /// Location of the offending value.
    pub fn path(&self) -> &ValuePath {
        &self.path
    }

    /// Human-readable description, without the location prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Failure of a normalization call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// The schema is malformed.
    #[error("schema configuration error: {0}")]
    Schema(#[from] SchemaError),

    /// The value does not conform.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl NormalizeError {
    /// Shorthand for a [`ValidationError`] at `path`.
    pub fn invalid(path: &ValuePath, message: impl Into<String>) -> Self {
        NormalizeError::Validation(ValidationError::new(path.clone(), message))
    }

    pub fn is_schema_error(&self) -> bool {
        matches!(self, NormalizeError::Schema(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, NormalizeError::Validation(_))
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            NormalizeError::Validation(e) => Some(e),
            NormalizeError::Schema(_) => None,
        }
    }

    pub fn as_schema(&self) -> Option<&SchemaError> {
        match self {
            NormalizeError::Schema(e) => Some(e),
            NormalizeError::Validation(_) => None,
        }
    }
}

/// Result alias used across the workspace.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_root() {
        let e = ValidationError::new(ValuePath::root(), "Expected bool, received 1");
        assert_eq!(e.to_string(), "(root): Expected bool, received 1");
    }

    #[test]
    fn test_validation_display_nested() {
        let e = ValidationError::new(ValuePath::root().key("a").index(2), "boom");
        assert_eq!(e.to_string(), "/a/2: boom");
        assert_eq!(e.message(), "boom");
    }

    #[test]
    fn test_kind_helpers() {
        let schema: NormalizeError = SchemaError::UnknownNormalizer("nope".into()).into();
        assert!(schema.is_schema_error());
        assert!(!schema.is_validation_error());
        assert!(schema.as_validation().is_none());

        let invalid = NormalizeError::invalid(&ValuePath::root(), "bad");
        assert!(invalid.is_validation_error());
        assert_eq!(invalid.as_validation().map(|e| e.message()), Some("bad"));
    }

    #[test]
    fn test_unknown_normalizer_message() {
        let e = SchemaError::UnknownNormalizer("frobnicate".into());
        assert_eq!(e.to_string(), "Invalid normalizer id: frobnicate");
    }

    #[test]
    fn test_unknown_type_message_names_tag() {
        let e = SchemaError::UnknownType {
            location: "/items".into(),
            type_tag: "tuple".into(),
        };
        assert!(e.to_string().contains("Invalid schema type: tuple"));
        assert!(e.to_string().contains("/items"));
    }
}
