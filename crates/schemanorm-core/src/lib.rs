//! # schemanorm-core: Foundational Types
//!
//! This crate is the leaf of the schemanorm workspace. It defines the value
//! model that schemas are checked against and the error taxonomy every other
//! crate reports through.
//!
//! ## Key Design Principles
//!
//! 1. **Closed value model.** [`Value`] is a sum type over null, booleans,
//!    integers, floats, text, lists and ordered mappings. Normalization
//!    pattern-matches on it; there is no runtime type inspection.
//!
//! 2. **Two error kinds.** A malformed schema is a [`SchemaError`]; a value
//!    that does not conform to a well-formed schema is a [`ValidationError`].
//!    [`NormalizeError`] carries one or the other and callers branch on the
//!    variant, never on message text.
//!
//! 3. **Located failures.** Every [`ValidationError`] records the
//!    [`ValuePath`] of the offending value, rendered as a JSON Pointer.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `schemanorm-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod path;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use error::{NormalizeError, NormalizeResult, SchemaError, ValidationError};
pub use path::{PathSegment, ValuePath};
pub use value::{Map, Value};
