//! # Normalization Engine
//!
//! [`SchemaNormalizer::normalize`] walks a value and a [`Schema`] together.
//! At each node it:
//!
//! 1. checks and coerces the value according to the node's type,
//!    recursing into dict properties and list elements;
//! 2. enforces `choices`, if any, using loose equality;
//! 3. threads the result through the node's post-normalizers in order.
//!
//! The first failure aborts the whole call; there are no partial results.
//! Validation errors carry the [`ValuePath`] of the value that failed.
//!
//! ## Coercions
//!
//! | Type | Accepts | Result |
//! |---|---|---|
//! | `bool` | bool | unchanged |
//! | `int` | int, float, integer text | `i64`; floats truncate toward zero |
//! | `float` | int, float, bool, numeric text | finite `f64`; bools are 1.0/0.0 |
//! | `unicode` | text | unchanged |
//! | `html` | text | sanitized text |
//! | `list` | list | element-wise |
//! | `dict` | mapping with exactly the declared keys | declared order |
//! | `custom` | anything | whatever the registered routine returns |
//!
//! Booleans are never valid ints. Text is trimmed before numeric parsing.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use schemanorm_core::{Map, NormalizeError, NormalizeResult, SchemaError, Value, ValuePath};

use crate::custom::{CustomTypeRegistry, CustomTypeResolver};
use crate::html::{AllowlistSanitizer, HtmlSanitizer, HttpLinkPolicy, LinkPolicy};
use crate::registry::{NormalizerContext, NormalizerRegistry};
use crate::schema::{Property, Schema, SchemaKind};

/// Normalizes values against schemas. Holds the collaborators used by
/// `html` and `custom` nodes and by `sanitize_url`.
pub struct SchemaNormalizer {
    html: Box<dyn HtmlSanitizer>,
    links: Box<dyn LinkPolicy>,
    custom_types: Box<dyn CustomTypeResolver>,
    registry: &'static NormalizerRegistry,
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self {
            html: Box::new(AllowlistSanitizer::default()),
            links: Box::new(HttpLinkPolicy),
            custom_types: Box::new(CustomTypeRegistry::default()),
            registry: NormalizerRegistry::builtin(),
        }
    }
}

impl std::fmt::Debug for SchemaNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaNormalizer")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl SchemaNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html_sanitizer(mut self, html: impl HtmlSanitizer + 'static) -> Self {
        self.html = Box::new(html);
        self
    }

    /// Replace the link policy consulted by `sanitize_url`. The HTML
    /// sanitizer keeps its own.
    pub fn with_link_policy(mut self, links: impl LinkPolicy + 'static) -> Self {
        self.links = Box::new(links);
        self
    }

    pub fn with_custom_types(mut self, resolver: impl CustomTypeResolver + 'static) -> Self {
        self.custom_types = Box::new(resolver);
        self
    }

    /// Normalize `value` against `schema`.
    ///
    /// # Errors
    ///
    /// [`NormalizeError::Schema`] when the schema is unusable (duplicate
    /// property names, an unknown normalizer or custom type), and
    /// [`NormalizeError::Validation`] when the value does not conform.
    pub fn normalize(&self, value: &Value, schema: &Schema) -> NormalizeResult<Value> {
        self.normalize_at(value, schema, &ValuePath::root())
    }

    fn normalize_at(&self, value: &Value, schema: &Schema, path: &ValuePath) -> NormalizeResult<Value> {
        let mut normalized = match &schema.kind {
            SchemaKind::Bool => match value {
                Value::Bool(b) => Value::Bool(*b),
                _ => return Err(NormalizeError::invalid(path, format!("Expected bool, received {value}"))),
            },
            SchemaKind::Custom { obj_type } => {
                let routine = self
                    .custom_types
                    .resolve(obj_type)
                    .ok_or_else(|| SchemaError::UnknownObjType(obj_type.clone()))?;
                routine
                    .normalize(value.clone())
                    .map_err(|message| NormalizeError::invalid(path, message))?
            }
            SchemaKind::Dict { properties } => self.normalize_dict(value, properties, path)?,
            SchemaKind::Float => Value::Float(coerce_float(value, path)?),
            SchemaKind::Int => Value::Int(coerce_int(value, path)?),
            SchemaKind::Html => match value {
                Value::Text(html) => Value::Text(
                    self.html
                        .sanitize(html)
                        .map_err(|message| NormalizeError::invalid(path, message))?,
                ),
                _ => {
                    return Err(NormalizeError::invalid(
                        path,
                        format!("Expected unicode HTML string, received {value}"),
                    ))
                }
            },
            SchemaKind::List { items, len } => {
                let Value::List(elements) = value else {
                    return Err(NormalizeError::invalid(path, format!("Expected list, received {value}")));
                };
                if let Some(len) = len {
                    if elements.len() != *len {
                        return Err(NormalizeError::invalid(
                            path,
                            format!(
                                "Expected list of length {len}, received {} elements: {value}",
                                elements.len()
                            ),
                        ));
                    }
                }
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| self.normalize_at(element, items, &path.index(i)))
                    .collect::<NormalizeResult<Vec<_>>>()?
                    .into()
            }
            SchemaKind::Unicode => match value {
                Value::Text(s) => Value::Text(s.clone()),
                _ => {
                    return Err(NormalizeError::invalid(
                        path,
                        format!("Expected unicode string, received {value}"),
                    ))
                }
            },
        };

        if let Some(choices) = &schema.choices {
            if !choices.iter().any(|choice| choice.loose_eq(&normalized)) {
                return Err(NormalizeError::invalid(
                    path,
                    format!(
                        "Received {normalized} which is not in the allowed range of choices: {}",
                        Value::List(choices.clone())
                    ),
                ));
            }
        }

        let ctx = NormalizerContext {
            path,
            links: self.links.as_ref(),
        };
        for spec in &schema.post_normalizers {
            normalized = self.registry.invoke(spec, normalized, &ctx)?;
        }
        Ok(normalized)
    }

    fn normalize_dict(&self, value: &Value, properties: &[Property], path: &ValuePath) -> NormalizeResult<Value> {
        let Value::Map(input) = value else {
            return Err(NormalizeError::invalid(path, format!("Expected dict, received {value}")));
        };

        let mut declared = HashSet::with_capacity(properties.len());
        for property in properties {
            if !declared.insert(property.name.as_str()) {
                return Err(SchemaError::DuplicateProperty {
                    location: path.to_string(),
                    name: property.name.clone(),
                }
                .into());
            }
        }

        let missing: BTreeSet<&str> = properties
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| !input.contains_key(*name))
            .collect();
        let unexpected: BTreeSet<&str> = input
            .keys()
            .map(String::as_str)
            .filter(|key| !declared.contains(key))
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(NormalizeError::invalid(
                path,
                format!(
                    "Expected dict with keys {}, received {value} (missing: {}; unexpected: {})",
                    key_list(properties.iter().map(|p| p.name.as_str())),
                    key_list(missing),
                    key_list(unexpected),
                ),
            ));
        }

        let mut output = Map::with_capacity(properties.len());
        for property in properties {
            // Presence checked above.
            let Some(child) = input.get(&property.name) else {
                continue;
            };
            let normalized = self.normalize_at(child, &property.schema, &path.key(property.name.as_str()))?;
            output.insert(property.name.clone(), normalized);
        }
        Ok(Value::Map(output))
    }
}

fn key_list<'a>(keys: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = keys.into_iter().map(|k| format!("{k:?}")).collect();
    format!("[{}]", quoted.join(", "))
}

fn coerce_float(value: &Value, path: &ValuePath) -> NormalizeResult<f64> {
    let parsed = match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(NormalizeError::invalid(path, format!("Expected float, received {value}"))),
    }
}

/// `2^63`, the first float above `i64::MAX`.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn coerce_int(value: &Value, path: &ValuePath) -> NormalizeResult<i64> {
    let parsed = match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.is_finite() => {
            let t = f.trunc();
            (t >= -I64_UPPER && t < I64_UPPER).then_some(t as i64)
        }
        Value::Text(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| NormalizeError::invalid(path, format!("Expected int, received {value}")))
}

/// Normalize with a process-wide engine using the default collaborators.
pub fn normalize(value: &Value, schema: &Schema) -> NormalizeResult<Value> {
    static ENGINE: OnceLock<SchemaNormalizer> = OnceLock::new();
    ENGINE.get_or_init(SchemaNormalizer::default).normalize(value, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NormalizerSpec;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn invalid_message(result: NormalizeResult<Value>) -> String {
        match result {
            Err(NormalizeError::Validation(e)) => e.message().to_string(),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_bool() {
        assert_eq!(normalize(&v(json!(true)), &Schema::bool()).unwrap(), Value::Bool(true));
        assert_eq!(
            invalid_message(normalize(&v(json!(1)), &Schema::bool())),
            "Expected bool, received 1"
        );
    }

    #[test]
    fn test_int_coercions() {
        let schema = Schema::int();
        assert_eq!(normalize(&v(json!(3)), &schema).unwrap(), Value::Int(3));
        assert_eq!(normalize(&v(json!(3.9)), &schema).unwrap(), Value::Int(3));
        assert_eq!(normalize(&v(json!(-3.9)), &schema).unwrap(), Value::Int(-3));
        assert_eq!(normalize(&v(json!(" 42 ")), &schema).unwrap(), Value::Int(42));
        assert!(normalize(&v(json!("4.5")), &schema).is_err());
        assert!(normalize(&v(json!(true)), &schema).is_err());
        assert!(normalize(&v(json!(1e300)), &schema).is_err());
        assert!(normalize(&Value::Null, &schema).is_err());
    }

    #[test]
    fn test_float_coercions() {
        let schema = Schema::float();
        assert_eq!(normalize(&v(json!(2)), &schema).unwrap(), Value::Float(2.0));
        assert_eq!(normalize(&v(json!("1.5")), &schema).unwrap(), Value::Float(1.5));
        assert!(normalize(&v(json!("inf")), &schema).is_err());
        assert!(normalize(&v(json!("abc")), &schema).is_err());
        assert!(normalize(&v(json!(null)), &schema).is_err());
    }

    #[test]
    fn test_float_accepts_booleans() {
        let schema = Schema::float();
        assert_eq!(normalize(&v(json!(true)), &schema).unwrap(), Value::Float(1.0));
        assert_eq!(normalize(&v(json!(false)), &schema).unwrap(), Value::Float(0.0));
        assert_eq!(
            invalid_message(normalize(&v(json!(true)), &Schema::int())),
            "Expected int, received true"
        );
    }

    #[test]
    fn test_unicode_rejects_non_text() {
        assert_eq!(
            invalid_message(normalize(&v(json!(5)), &Schema::unicode())),
            "Expected unicode string, received 5"
        );
    }

    #[test]
    fn test_html_is_sanitized() {
        let out = normalize(&v(json!("<b onclick=x>hi</b><script>x</script>")), &Schema::html()).unwrap();
        assert_eq!(out, Value::from("<b>hi</b>"));
        assert_eq!(
            invalid_message(normalize(&v(json!(["x"])), &Schema::html())),
            "Expected unicode HTML string, received [\"x\"]"
        );
    }

    #[test]
    fn test_list_length_checked_before_elements() {
        let schema = Schema::fixed_list(Schema::int(), 2);
        let err = normalize(&v(json!(["a", "b", "c"])), &schema).unwrap_err();
        let e = err.as_validation().unwrap();
        assert!(e.path().is_root());
        assert!(e.message().starts_with("Expected list of length 2"));
    }

    #[test]
    fn test_error_path_points_at_element() {
        let schema = Schema::dict([Property::new("a", Schema::list(Schema::int()))]);
        let err = normalize(&v(json!({"a": [1, "x"]})), &schema).unwrap_err();
        assert_eq!(err.as_validation().unwrap().path().to_string(), "/a/1");
    }

    #[test]
    fn test_dict_key_set_mismatch_names_keys() {
        let schema = Schema::dict([Property::new("a", Schema::int()), Property::new("b", Schema::int())]);
        let msg = invalid_message(normalize(&v(json!({"a": 1, "c": 2})), &schema));
        assert!(msg.contains("missing: [\"b\"]"), "{msg}");
        assert!(msg.contains("unexpected: [\"c\"]"), "{msg}");
    }

    #[test]
    fn test_dict_output_follows_declared_order() {
        let schema = Schema::dict([Property::new("b", Schema::int()), Property::new("a", Schema::float())]);
        let out = normalize(&v(json!({"a": 1, "b": "2"})), &schema).unwrap();
        let keys: Vec<&str> = out.as_map().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(out, v(json!({"b": 2, "a": 1.0})));
    }

    #[test]
    fn test_duplicate_property_in_built_schema() {
        let schema = Schema::dict([Property::new("a", Schema::int()), Property::new("a", Schema::int())]);
        let err = normalize(&v(json!({"a": 1})), &schema).unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_choices_use_loose_equality() {
        let schema = Schema::float().with_choices([1.0, 2.0]);
        assert_eq!(normalize(&v(json!(1)), &schema).unwrap(), Value::Float(1.0));
        assert_eq!(
            invalid_message(normalize(&v(json!(3)), &schema)),
            "Received 3.0 which is not in the allowed range of choices: [1.0, 2.0]"
        );
    }

    #[test]
    fn test_choices_checked_before_post_normalizers() {
        let schema = Schema::unicode()
            .with_choices(["a b"])
            .with_post_normalizer(NormalizerSpec::new("normalize_spaces"));
        assert!(normalize(&v(json!(" a  b ")), &schema).is_err());
        assert_eq!(normalize(&v(json!("a b")), &schema).unwrap(), Value::from("a b"));
    }

    #[test]
    fn test_post_normalizers_chain_in_order() {
        let schema = Schema::unicode()
            .with_post_normalizer(NormalizerSpec::new("normalize_spaces"))
            .with_post_normalizer(NormalizerSpec::new("require_nonempty"));
        assert!(normalize(&v(json!("   ")), &schema).unwrap_err().is_validation_error());
        assert_eq!(normalize(&v(json!(" x ")), &schema).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_unknown_normalizer_in_built_schema() {
        let schema = Schema::int().with_post_normalizer(NormalizerSpec::new("frobnicate"));
        let err = normalize(&v(json!(1)), &schema).unwrap_err();
        assert_eq!(err.as_schema(), Some(&SchemaError::UnknownNormalizer("frobnicate".into())));
    }

    #[test]
    fn test_custom_type_delegation() {
        let engine = SchemaNormalizer::new().with_custom_types(CustomTypeRegistry::new().with(
            "Lowercase",
            |value: Value| -> Result<Value, String> {
                match value {
                    Value::Text(s) => Ok(Value::Text(s.to_lowercase())),
                    other => Err(format!("Expected unicode string, received {other}")),
                }
            },
        ));
        let schema = Schema::custom("Lowercase");
        assert_eq!(engine.normalize(&v(json!("AbC")), &schema).unwrap(), Value::from("abc"));
        assert!(engine.normalize(&v(json!(1)), &schema).unwrap_err().is_validation_error());

        let err = engine.normalize(&v(json!("x")), &Schema::custom("Missing")).unwrap_err();
        assert_eq!(err.as_schema(), Some(&SchemaError::UnknownObjType("Missing".into())));
    }

    #[test]
    fn test_custom_link_policy_reaches_sanitize_url() {
        struct AllowAll;
        impl LinkPolicy for AllowAll {
            fn is_acceptable(&self, _attribute: &str, _value: &str) -> bool {
                true
            }
        }
        let schema = Schema::unicode().with_post_normalizer(NormalizerSpec::new("sanitize_url"));
        let engine = SchemaNormalizer::new().with_link_policy(AllowAll);
        assert_eq!(
            engine.normalize(&v(json!("ftp://host/a b")), &schema).unwrap(),
            Value::from("ftp://host/a%20b")
        );
        assert!(normalize(&v(json!("ftp://host/a b")), &schema).is_err());
    }
}
