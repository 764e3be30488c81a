//! # Normalizer Registry
//!
//! Post-normalizers are named, stateless functions applied after type-level
//! normalization. Each one receives the in-progress value plus the named
//! arguments written next to its `id` in the schema, and either returns the
//! (possibly transformed) value or fails.
//!
//! The table is fixed when the process first asks for it
//! ([`NormalizerRegistry::builtin`]); there is no runtime registration.
//!
//! ## Built-ins
//!
//! | Id | Arguments | Behavior |
//! |---|---|---|
//! | `require_nonempty` | | rejects `""` and `[]` |
//! | `uniquify` | | sorted, de-duplicated list of scalars |
//! | `normalize_spaces` | | collapses whitespace runs to one space, trims |
//! | `sanitize_url` | | percent-encodes URL components; href must be http(s) |
//! | `require_at_least` | `min_value` | rejects values below the bound |
//! | `require_at_most` | `max_value` | rejects values above the bound |

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use schemanorm_core::{Map, NormalizeError, NormalizeResult, SchemaError, Value, ValuePath};

use crate::html::LinkPolicy;
use crate::schema::NormalizerSpec;
use crate::url::split_url;

/// Per-call inputs a normalizer may need besides the value itself.
pub struct NormalizerContext<'a> {
    /// Location of the value being normalized.
    pub path: &'a ValuePath,
    /// Link acceptability check used by `sanitize_url`.
    pub links: &'a dyn LinkPolicy,
}

impl NormalizerContext<'_> {
    /// A validation failure at the current path.
    pub fn invalid(&self, message: impl Into<String>) -> NormalizeError {
        NormalizeError::invalid(self.path, message)
    }
}

/// Signature shared by every normalizer.
pub type NormalizerFn = fn(Value, &Map, &NormalizerContext<'_>) -> NormalizeResult<Value>;

/// A registered normalizer.
#[derive(Clone, Copy)]
pub struct Normalizer {
    id: &'static str,
    params: &'static [&'static str],
    func: NormalizerFn,
}

impl Normalizer {
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Names of the arguments the normalizer requires. No others are accepted.
    pub fn params(&self) -> &'static [&'static str] {
        self.params
    }

    /// Run the normalizer. Arguments are assumed to have passed
    /// [`NormalizerRegistry::check_arguments`].
    pub fn apply(&self, value: Value, args: &Map, ctx: &NormalizerContext<'_>) -> NormalizeResult<Value> {
        (self.func)(value, args, ctx)
    }
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish()
    }
}

/// Id → normalizer table.
#[derive(Debug)]
pub struct NormalizerRegistry {
    normalizers: BTreeMap<&'static str, Normalizer>,
}

impl NormalizerRegistry {
    /// The process-wide registry of built-in normalizers.
    pub fn builtin() -> &'static NormalizerRegistry {
        static REGISTRY: OnceLock<NormalizerRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::with_builtins)
    }

    fn with_builtins() -> Self {
        let table = [
            Normalizer { id: "require_nonempty", params: &[], func: require_nonempty },
            Normalizer { id: "uniquify", params: &[], func: uniquify },
            Normalizer { id: "normalize_spaces", params: &[], func: normalize_spaces },
            Normalizer { id: "sanitize_url", params: &[], func: sanitize_url },
            Normalizer { id: "require_at_least", params: &["min_value"], func: require_at_least },
            Normalizer { id: "require_at_most", params: &["max_value"], func: require_at_most },
        ];
        Self {
            normalizers: table.into_iter().map(|n| (n.id, n)).collect(),
        }
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.normalizers.keys().copied()
    }

    /// Look up a normalizer by id.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownNormalizer`] if `id` is not registered.
    pub fn resolve(&self, id: &str) -> Result<&Normalizer, SchemaError> {
        self.normalizers
            .get(id)
            .ok_or_else(|| SchemaError::UnknownNormalizer(id.to_string()))
    }

    /// Check that `args` supplies exactly the arguments `id` requires.
    pub fn check_arguments(&self, id: &str, args: &Map) -> Result<(), SchemaError> {
        let normalizer = self.resolve(id)?;
        if let Some(missing) = normalizer.params.iter().find(|p| !args.contains_key(**p)) {
            return Err(SchemaError::NormalizerArguments {
                id: id.to_string(),
                reason: format!("is missing required argument '{missing}'"),
            });
        }
        if let Some(extra) = args.keys().find(|k| !normalizer.params.contains(&k.as_str())) {
            return Err(SchemaError::NormalizerArguments {
                id: id.to_string(),
                reason: format!("got an unexpected argument '{extra}'"),
            });
        }
        Ok(())
    }

    /// Resolve `spec.id` and apply it to `value`. The normalizer's own
    /// failure is returned as is.
    pub fn invoke(
        &self,
        spec: &NormalizerSpec,
        value: Value,
        ctx: &NormalizerContext<'_>,
    ) -> NormalizeResult<Value> {
        self.check_arguments(&spec.id, &spec.args)?;
        let normalizer = self.resolve(&spec.id)?;
        normalizer.apply(value, &spec.args, ctx)
    }
}

fn argument<'a>(id: &str, args: &'a Map, name: &str) -> Result<&'a Value, SchemaError> {
    args.get(name).ok_or_else(|| SchemaError::NormalizerArguments {
        id: id.to_string(),
        reason: format!("is missing required argument '{name}'"),
    })
}

/// Order `value` against `bound` when both are numbers or both are text.
fn compare_to_bound(
    value: &Value,
    bound: &Value,
    ctx: &NormalizerContext<'_>,
) -> NormalizeResult<Ordering> {
    let comparable = (value.is_number() && bound.is_number())
        || (value.as_str().is_some() && bound.as_str().is_some());
    if !comparable {
        return Err(ctx.invalid(format!("Cannot compare {value} with bound {bound}")));
    }
    Ok(value.natural_cmp(bound))
}

fn require_nonempty(value: Value, _args: &Map, ctx: &NormalizerContext<'_>) -> NormalizeResult<Value> {
    let empty = match &value {
        Value::Text(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        return Err(ctx.invalid(format!("Expected a nonempty value, received {value}")));
    }
    Ok(value)
}

fn uniquify(value: Value, _args: &Map, ctx: &NormalizerContext<'_>) -> NormalizeResult<Value> {
    let Value::List(mut items) = value else {
        return Err(ctx.invalid(format!("Expected list, received {value}")));
    };
    if let Some(item) = items.iter().find(|item| !item.is_scalar()) {
        return Err(ctx.invalid(format!(
            "Cannot uniquify a list containing the unhashable element {item}"
        )));
    }
    items.sort_by(Value::natural_cmp);
    items.dedup_by(|a, b| a.loose_eq(b));
    Ok(Value::List(items))
}

fn normalize_spaces(value: Value, _args: &Map, ctx: &NormalizerContext<'_>) -> NormalizeResult<Value> {
    match &value {
        Value::Text(s) => Ok(Value::Text(s.split_whitespace().collect::<Vec<_>>().join(" "))),
        _ => Err(ctx.invalid(format!("Expected unicode string, received {value}"))),
    }
}

/// The returned URL is built from the percent-encoded components, while the
/// link check runs on the raw input. Both behaviors are relied upon.
fn sanitize_url(value: Value, _args: &Map, ctx: &NormalizerContext<'_>) -> NormalizeResult<Value> {
    let Value::Text(raw) = &value else {
        return Err(ctx.invalid(format!("Expected unicode string, received {value}")));
    };
    let parts = split_url(raw).map_err(|e| ctx.invalid(format!("Invalid URL: {e}; received {value}")))?;
    let encoded = parts.quoted().unsplit();

    if !ctx.links.is_acceptable("href", raw) {
        return Err(ctx.invalid(format!(
            "Invalid URL: Sanitized URL should start with 'http://' or 'https://'; received {encoded}"
        )));
    }
    Ok(Value::Text(encoded))
}

fn require_at_least(value: Value, args: &Map, ctx: &NormalizerContext<'_>) -> NormalizeResult<Value> {
    let min_value = argument("require_at_least", args, "min_value")?;
    if compare_to_bound(&value, min_value, ctx)? == Ordering::Less {
        return Err(ctx.invalid(format!(
            "Expected a value of at least {min_value}, received {value}"
        )));
    }
    Ok(value)
}

fn require_at_most(value: Value, args: &Map, ctx: &NormalizerContext<'_>) -> NormalizeResult<Value> {
    let max_value = argument("require_at_most", args, "max_value")?;
    if compare_to_bound(&value, max_value, ctx)? == Ordering::Greater {
        return Err(ctx.invalid(format!(
            "Expected a value of at most {max_value}, received {value}"
        )));
    }
    Ok(value)
}
