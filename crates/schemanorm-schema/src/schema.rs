//! # Schema Model
//!
//! A schema is data: a tree of mappings with a `type` tag, type-specific
//! keys, an optional `choices` allow-list and an optional ordered list of
//! `post_normalizers`. This module turns that data into the typed
//! [`Schema`] tree the engine matches on, and back.
//!
//! ## Vocabulary
//!
//! | Tag | Required keys | Optional keys |
//! |---|---|---|
//! | `bool`, `float`, `html`, `int`, `unicode` | | |
//! | `custom` | `obj_type` | |
//! | `dict` | `properties` | |
//! | `list` | `items` | `len` |
//!
//! Every node may also carry `choices`, `post_normalizers`, and the
//! presentation-only keys `ui_config` and `allow_parameters`, which the
//! engine ignores but which survive a round trip. Property entries are
//! `{name, schema}` with an optional `description`.
//!
//! ## Structural Checks
//!
//! [`Schema::from_value`] rejects, as [`SchemaError`]s: non-mapping nodes,
//! unknown type tags, missing or mistyped keys, keys the type does not
//! define, duplicate property names, unknown normalizer ids and
//! normalizer entries with the wrong arguments.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use schemanorm_core::{Map, SchemaError, Value};

use crate::registry::NormalizerRegistry;

pub const SCHEMA_KEY_TYPE: &str = "type";
pub const SCHEMA_KEY_ITEMS: &str = "items";
pub const SCHEMA_KEY_LEN: &str = "len";
pub const SCHEMA_KEY_PROPERTIES: &str = "properties";
pub const SCHEMA_KEY_OBJ_TYPE: &str = "obj_type";
pub const SCHEMA_KEY_CHOICES: &str = "choices";
pub const SCHEMA_KEY_POST_NORMALIZERS: &str = "post_normalizers";
pub const SCHEMA_KEY_UI_CONFIG: &str = "ui_config";
pub const SCHEMA_KEY_ALLOW_PARAMETERS: &str = "allow_parameters";
pub const SCHEMA_KEY_NAME: &str = "name";
pub const SCHEMA_KEY_SCHEMA: &str = "schema";
pub const SCHEMA_KEY_DESCRIPTION: &str = "description";
pub const NORMALIZER_KEY_ID: &str = "id";

const COMMON_KEYS: &[&str] = &[
    SCHEMA_KEY_TYPE,
    SCHEMA_KEY_CHOICES,
    SCHEMA_KEY_POST_NORMALIZERS,
    SCHEMA_KEY_UI_CONFIG,
    SCHEMA_KEY_ALLOW_PARAMETERS,
];

const PROPERTY_KEYS: &[&str] = &[SCHEMA_KEY_NAME, SCHEMA_KEY_SCHEMA, SCHEMA_KEY_DESCRIPTION];

/// The closed set of schema type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Bool,
    Custom,
    Dict,
    Float,
    Html,
    Int,
    List,
    Unicode,
}

impl SchemaType {
    pub const ALL: [SchemaType; 8] = [
        SchemaType::Bool,
        SchemaType::Custom,
        SchemaType::Dict,
        SchemaType::Float,
        SchemaType::Html,
        SchemaType::Int,
        SchemaType::List,
        SchemaType::Unicode,
    ];

    /// The tag as written in schema documents.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::Bool => "bool",
            SchemaType::Custom => "custom",
            SchemaType::Dict => "dict",
            SchemaType::Float => "float",
            SchemaType::Html => "html",
            SchemaType::Int => "int",
            SchemaType::List => "list",
            SchemaType::Unicode => "unicode",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    fn specific_keys(self) -> &'static [&'static str] {
        match self {
            SchemaType::Custom => &[SCHEMA_KEY_OBJ_TYPE],
            SchemaType::Dict => &[SCHEMA_KEY_PROPERTIES],
            SchemaType::List => &[SCHEMA_KEY_ITEMS, SCHEMA_KEY_LEN],
            SchemaType::Bool
            | SchemaType::Float
            | SchemaType::Html
            | SchemaType::Int
            | SchemaType::Unicode => &[],
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific part of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Bool,
    /// Normalization delegated to the routine registered for `obj_type`.
    Custom { obj_type: String },
    /// A mapping whose key set is exactly the declared property names.
    Dict { properties: Vec<Property> },
    Float,
    Html,
    Int,
    /// A sequence whose elements all match `items`, optionally of exact
    /// length `len`.
    List { items: Box<Schema>, len: Option<usize> },
    Unicode,
}

impl SchemaKind {
    pub fn schema_type(&self) -> SchemaType {
        match self {
            SchemaKind::Bool => SchemaType::Bool,
            SchemaKind::Custom { .. } => SchemaType::Custom,
            SchemaKind::Dict { .. } => SchemaType::Dict,
            SchemaKind::Float => SchemaType::Float,
            SchemaKind::Html => SchemaType::Html,
            SchemaKind::Int => SchemaType::Int,
            SchemaKind::List { .. } => SchemaType::List,
            SchemaKind::Unicode => SchemaType::Unicode,
        }
    }
}

/// One named entry of a dict schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub description: Option<String>,
    pub schema: Schema,
}

impl Property {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(SCHEMA_KEY_NAME.into(), Value::from(self.name.as_str()));
        if let Some(description) = &self.description {
            map.insert(SCHEMA_KEY_DESCRIPTION.into(), Value::from(description.as_str()));
        }
        map.insert(SCHEMA_KEY_SCHEMA.into(), self.schema.to_value());
        Value::Map(map)
    }
}

/// A post-normalizer invocation: the registry id plus the named arguments
/// passed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerSpec {
    pub id: String,
    pub args: Map,
}

impl NormalizerSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(NORMALIZER_KEY_ID.into(), Value::from(self.id.as_str()));
        for (name, arg) in &self.args {
            map.insert(name.clone(), arg.clone());
        }
        Value::Map(map)
    }
}

/// A parsed schema node. Immutable during normalization and safe to share
/// across threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Schema {
    pub kind: SchemaKind,
    pub choices: Option<Vec<Value>>,
    pub post_normalizers: Vec<NormalizerSpec>,
    pub ui_config: Option<Map>,
    pub allow_parameters: Option<bool>,
}

impl Schema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            choices: None,
            post_normalizers: Vec::new(),
            ui_config: None,
            allow_parameters: None,
        }
    }

    pub fn bool() -> Self {
        Self::new(SchemaKind::Bool)
    }

    pub fn int() -> Self {
        Self::new(SchemaKind::Int)
    }

    pub fn float() -> Self {
        Self::new(SchemaKind::Float)
    }

    pub fn unicode() -> Self {
        Self::new(SchemaKind::Unicode)
    }

    pub fn html() -> Self {
        Self::new(SchemaKind::Html)
    }

    pub fn custom(obj_type: impl Into<String>) -> Self {
        Self::new(SchemaKind::Custom {
            obj_type: obj_type.into(),
        })
    }

    pub fn list(items: Schema) -> Self {
        Self::new(SchemaKind::List {
            items: Box::new(items),
            len: None,
        })
    }

    pub fn fixed_list(items: Schema, len: usize) -> Self {
        Self::new(SchemaKind::List {
            items: Box::new(items),
            len: Some(len),
        })
    }

    pub fn dict(properties: impl IntoIterator<Item = Property>) -> Self {
        Self::new(SchemaKind::Dict {
            properties: properties.into_iter().collect(),
        })
    }

    pub fn with_choices<V: Into<Value>>(mut self, choices: impl IntoIterator<Item = V>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_post_normalizer(mut self, spec: NormalizerSpec) -> Self {
        self.post_normalizers.push(spec);
        self
    }

    pub fn schema_type(&self) -> SchemaType {
        self.kind.schema_type()
    }

    /// Parse and structurally check a schema document.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] naming the schema location of the first
    /// problem found.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        parse_schema(value, "")
    }

    /// Render back to schema data. Keys appear in a fixed order: `type`,
    /// the type-specific keys, then the common keys.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            SCHEMA_KEY_TYPE.into(),
            Value::from(self.schema_type().as_str()),
        );
        match &self.kind {
            SchemaKind::Custom { obj_type } => {
                map.insert(SCHEMA_KEY_OBJ_TYPE.into(), Value::from(obj_type.as_str()));
            }
            SchemaKind::Dict { properties } => {
                map.insert(
                    SCHEMA_KEY_PROPERTIES.into(),
                    properties.iter().map(Property::to_value).collect(),
                );
            }
            SchemaKind::List { items, len } => {
                map.insert(SCHEMA_KEY_ITEMS.into(), items.to_value());
                if let Some(len) = len {
                    map.insert(
                        SCHEMA_KEY_LEN.into(),
                        Value::Int(i64::try_from(*len).unwrap_or(i64::MAX)),
                    );
                }
            }
            SchemaKind::Bool
            | SchemaKind::Float
            | SchemaKind::Html
            | SchemaKind::Int
            | SchemaKind::Unicode => {}
        }
        if let Some(choices) = &self.choices {
            map.insert(SCHEMA_KEY_CHOICES.into(), Value::List(choices.clone()));
        }
        if !self.post_normalizers.is_empty() {
            map.insert(
                SCHEMA_KEY_POST_NORMALIZERS.into(),
                self.post_normalizers
                    .iter()
                    .map(NormalizerSpec::to_value)
                    .collect(),
            );
        }
        if let Some(ui_config) = &self.ui_config {
            map.insert(SCHEMA_KEY_UI_CONFIG.into(), Value::Map(ui_config.clone()));
        }
        if let Some(allow) = self.allow_parameters {
            map.insert(SCHEMA_KEY_ALLOW_PARAMETERS.into(), Value::Bool(allow));
        }
        Value::Map(map)
    }
}

impl TryFrom<Value> for Schema {
    type Error = SchemaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Schema::from_value(&value)
    }
}

impl From<Schema> for Value {
    fn from(schema: Schema) -> Self {
        schema.to_value()
    }
}

fn as_node<'a>(value: &'a Value, location: &str) -> Result<&'a Map, SchemaError> {
    value.as_map().ok_or_else(|| SchemaError::NotAMapping {
        location: location.to_string(),
        received: value.to_string(),
    })
}

fn invalid_key(location: &str, key: &str, expected: impl Into<String>) -> SchemaError {
    SchemaError::InvalidKey {
        location: location.to_string(),
        key: key.to_string(),
        expected: expected.into(),
    }
}

fn required<'a>(
    node: &'a Map,
    key: &str,
    schema_type: SchemaType,
    location: &str,
) -> Result<&'a Value, SchemaError> {
    node.get(key).ok_or_else(|| SchemaError::MissingKey {
        location: location.to_string(),
        schema_type: schema_type.as_str().to_string(),
        key: key.to_string(),
    })
}

fn parse_schema(value: &Value, location: &str) -> Result<Schema, SchemaError> {
    let node = as_node(value, location)?;

    let tag = match node.get(SCHEMA_KEY_TYPE) {
        Some(Value::Text(tag)) => tag,
        Some(other) => {
            return Err(invalid_key(
                location,
                SCHEMA_KEY_TYPE,
                format!("must be a type name, received {other}"),
            ))
        }
        None => {
            return Err(SchemaError::MissingKey {
                location: location.to_string(),
                schema_type: "(untyped)".to_string(),
                key: SCHEMA_KEY_TYPE.to_string(),
            })
        }
    };
    let schema_type = SchemaType::from_tag(tag).ok_or_else(|| SchemaError::UnknownType {
        location: location.to_string(),
        type_tag: tag.clone(),
    })?;

    if let Some(key) = node
        .keys()
        .find(|k| !COMMON_KEYS.contains(&k.as_str()) && !schema_type.specific_keys().contains(&k.as_str()))
    {
        return Err(SchemaError::UnexpectedKey {
            location: location.to_string(),
            schema_type: schema_type.as_str().to_string(),
            key: key.clone(),
        });
    }

    let kind = match schema_type {
        SchemaType::Bool => SchemaKind::Bool,
        SchemaType::Float => SchemaKind::Float,
        SchemaType::Html => SchemaKind::Html,
        SchemaType::Int => SchemaKind::Int,
        SchemaType::Unicode => SchemaKind::Unicode,
        SchemaType::Custom => {
            let obj_type = required(node, SCHEMA_KEY_OBJ_TYPE, schema_type, location)?
                .as_str()
                .ok_or_else(|| invalid_key(location, SCHEMA_KEY_OBJ_TYPE, "must be a string"))?;
            SchemaKind::Custom {
                obj_type: obj_type.to_string(),
            }
        }
        SchemaType::Dict => {
            let entries = required(node, SCHEMA_KEY_PROPERTIES, schema_type, location)?
                .as_list()
                .ok_or_else(|| {
                    invalid_key(location, SCHEMA_KEY_PROPERTIES, "must be a list of {name, schema} entries")
                })?;
            SchemaKind::Dict {
                properties: parse_properties(entries, location)?,
            }
        }
        SchemaType::List => {
            let items = required(node, SCHEMA_KEY_ITEMS, schema_type, location)?;
            let items = parse_schema(items, &format!("{location}/{SCHEMA_KEY_ITEMS}"))?;
            let len = match node.get(SCHEMA_KEY_LEN) {
                None => None,
                Some(Value::Int(n)) => Some(usize::try_from(*n).map_err(|_| {
                    invalid_key(location, SCHEMA_KEY_LEN, format!("must be a non-negative integer, received {n}"))
                })?),
                Some(other) => {
                    return Err(invalid_key(
                        location,
                        SCHEMA_KEY_LEN,
                        format!("must be a non-negative integer, received {other}"),
                    ))
                }
            };
            SchemaKind::List {
                items: Box::new(items),
                len,
            }
        }
    };

    let choices = match node.get(SCHEMA_KEY_CHOICES) {
        None => None,
        Some(Value::List(choices)) => Some(choices.clone()),
        Some(other) => {
            return Err(invalid_key(
                location,
                SCHEMA_KEY_CHOICES,
                format!("must be a list, received {other}"),
            ))
        }
    };

    let post_normalizers = match node.get(SCHEMA_KEY_POST_NORMALIZERS) {
        None => Vec::new(),
        Some(Value::List(entries)) => entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                parse_normalizer_spec(entry, &format!("{location}/{SCHEMA_KEY_POST_NORMALIZERS}/{i}"))
            })
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(invalid_key(
                location,
                SCHEMA_KEY_POST_NORMALIZERS,
                format!("must be a list, received {other}"),
            ))
        }
    };

    let ui_config = match node.get(SCHEMA_KEY_UI_CONFIG) {
        None => None,
        Some(Value::Map(config)) => Some(config.clone()),
        Some(other) => {
            return Err(invalid_key(
                location,
                SCHEMA_KEY_UI_CONFIG,
                format!("must be a mapping, received {other}"),
            ))
        }
    };

    let allow_parameters = match node.get(SCHEMA_KEY_ALLOW_PARAMETERS) {
        None => None,
        Some(Value::Bool(allow)) => Some(*allow),
        Some(other) => {
            return Err(invalid_key(
                location,
                SCHEMA_KEY_ALLOW_PARAMETERS,
                format!("must be a boolean, received {other}"),
            ))
        }
    };

    Ok(Schema {
        kind,
        choices,
        post_normalizers,
        ui_config,
        allow_parameters,
    })
}

fn parse_properties(entries: &[Value], location: &str) -> Result<Vec<Property>, SchemaError> {
    let mut seen = HashSet::new();
    let mut properties = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let entry_location = format!("{location}/{SCHEMA_KEY_PROPERTIES}/{i}");
        let node = as_node(entry, &entry_location)?;
        if let Some(key) = node.keys().find(|k| !PROPERTY_KEYS.contains(&k.as_str())) {
            return Err(SchemaError::UnexpectedKey {
                location: entry_location,
                schema_type: "property".to_string(),
                key: key.clone(),
            });
        }
        let name = match node.get(SCHEMA_KEY_NAME) {
            Some(Value::Text(name)) => name.clone(),
            Some(other) => {
                return Err(invalid_key(
                    &entry_location,
                    SCHEMA_KEY_NAME,
                    format!("must be a string, received {other}"),
                ))
            }
            None => {
                return Err(SchemaError::MissingKey {
                    location: entry_location,
                    schema_type: "property".to_string(),
                    key: SCHEMA_KEY_NAME.to_string(),
                })
            }
        };
        if !seen.insert(name.clone()) {
            return Err(SchemaError::DuplicateProperty {
                location: location.to_string(),
                name,
            });
        }
        let description = match node.get(SCHEMA_KEY_DESCRIPTION) {
            None => None,
            Some(Value::Text(d)) => Some(d.clone()),
            Some(other) => {
                return Err(invalid_key(
                    &entry_location,
                    SCHEMA_KEY_DESCRIPTION,
                    format!("must be a string, received {other}"),
                ))
            }
        };
        let schema_value = node.get(SCHEMA_KEY_SCHEMA).ok_or_else(|| SchemaError::MissingKey {
            location: entry_location.clone(),
            schema_type: "property".to_string(),
            key: SCHEMA_KEY_SCHEMA.to_string(),
        })?;
        let schema = parse_schema(schema_value, &format!("{entry_location}/{SCHEMA_KEY_SCHEMA}"))?;
        properties.push(Property {
            name,
            description,
            schema,
        });
    }
    Ok(properties)
}

fn parse_normalizer_spec(value: &Value, location: &str) -> Result<NormalizerSpec, SchemaError> {
    let node = as_node(value, location)?;
    let id = match node.get(NORMALIZER_KEY_ID) {
        Some(Value::Text(id)) => id.clone(),
        Some(other) => {
            return Err(invalid_key(
                location,
                NORMALIZER_KEY_ID,
                format!("must be a normalizer id, received {other}"),
            ))
        }
        None => {
            return Err(SchemaError::MissingKey {
                location: location.to_string(),
                schema_type: "post_normalizer".to_string(),
                key: NORMALIZER_KEY_ID.to_string(),
            })
        }
    };
    let args: Map = node
        .iter()
        .filter(|(k, _)| k.as_str() != NORMALIZER_KEY_ID)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    NormalizerRegistry::builtin().check_arguments(&id, &args)?;
    Ok(NormalizerSpec { id, args })
}
