//! # schemanorm-schema: Schemas and Normalization
//!
//! Declarative schemas and the engine that checks values against them.
//!
//! ## Schemas (`schema`)
//!
//! A [`Schema`] is a tree of typed nodes parsed from plain data
//! ([`Schema::from_value`]) or built in code. Parsing rejects structurally
//! invalid schemas with a [`SchemaError`](schemanorm_core::SchemaError)
//! naming the schema location.
//!
//! ## Engine (`engine`)
//!
//! [`SchemaNormalizer::normalize`] dispatches on the node type, recurses
//! into lists and dicts, enforces `choices` and then runs the node's
//! post-normalizers. [`normalize`] does the same with a shared default
//! engine.
//!
//! ## Post-normalizers (`registry`)
//!
//! A fixed table of named transforms. See [`NormalizerRegistry`] for the
//! built-in ids and their arguments.
//!
//! ## Collaborators (`html`, `custom`, `url`)
//!
//! The engine reaches HTML cleaning, link checks and custom object types
//! through the [`HtmlSanitizer`], [`LinkPolicy`] and [`CustomTypeResolver`]
//! traits. Defaults: [`AllowlistSanitizer`], [`HttpLinkPolicy`] and an
//! empty [`CustomTypeRegistry`].
//!
//! ## Crate Policy
//!
//! - Depends only on `schemanorm-core` internally.
//! - Synchronous and free of I/O. Schemas and engines are `Send + Sync`.
//! - The engine never logs; collaborators log rejections with `tracing`.

pub mod custom;
pub mod engine;
pub mod html;
pub mod registry;
pub mod schema;
pub mod url;

pub use custom::{CustomType, CustomTypeRegistry, CustomTypeResolver};
pub use engine::{normalize, SchemaNormalizer};
pub use html::{AllowlistSanitizer, HtmlSanitizer, HttpLinkPolicy, LinkPolicy, DEFAULT_ALLOWED_TAGS};
pub use registry::{Normalizer, NormalizerContext, NormalizerFn, NormalizerRegistry};
pub use schema::{NormalizerSpec, Property, Schema, SchemaKind, SchemaType};
pub use self::url::{quote_component, split_url, UrlParts, UrlSplitError};
