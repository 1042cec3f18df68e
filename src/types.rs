//! Type descriptions and on-wire type identifiers.
//!
//! A [`TypeDescription`] is the declarative shape of one serializable type.
//! It can be built in code or loaded from JSON:
//!
//! ```
//! use xlang_wire::types::TypeDescription;
//!
//! let json = r#"{
//!     "type": "object",
//!     "tag": "example.person",
//!     "fields": [
//!         { "name": "name", "type": { "type": "string" } },
//!         { "name": "age", "type": { "type": "int32" } }
//!     ]
//! }"#;
//! let description: TypeDescription = serde_json::from_str(json).unwrap();
//! assert_eq!(description.tag(), Some("example.person"));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};

/// First id handed to registered types. Lower ids are built in.
pub const FIRST_USER_TYPE_ID: u32 = 64;

/// Built-in type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Binary,
    Array,
    Map,
    /// Object whose tag has no registered codec; written with its tag.
    NamedObject,
}

impl TypeId {
    /// All built-in ids, in table order.
    pub const ALL: [TypeId; 12] = [
        TypeId::Bool,
        TypeId::Int8,
        TypeId::Int16,
        TypeId::Int32,
        TypeId::Int64,
        TypeId::Float32,
        TypeId::Float64,
        TypeId::String,
        TypeId::Binary,
        TypeId::Array,
        TypeId::Map,
        TypeId::NamedObject,
    ];

    pub fn as_u32(self) -> u32 {
        match self {
            TypeId::Bool => 1,
            TypeId::Int8 => 2,
            TypeId::Int16 => 3,
            TypeId::Int32 => 4,
            TypeId::Int64 => 5,
            TypeId::Float32 => 6,
            TypeId::Float64 => 7,
            TypeId::String => 8,
            TypeId::Binary => 9,
            TypeId::Array => 10,
            TypeId::Map => 11,
            TypeId::NamedObject => 12,
        }
    }

    /// Look up a built-in id. Returns `None` for registered or unknown ids.
    pub fn from_u32(id: u32) -> Option<Self> {
        TypeId::ALL.into_iter().find(|t| t.as_u32() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeId::Bool => "bool",
            TypeId::Int8 => "int8",
            TypeId::Int16 => "int16",
            TypeId::Int32 => "int32",
            TypeId::Int64 => "int64",
            TypeId::Float32 => "float32",
            TypeId::Float64 => "float64",
            TypeId::String => "string",
            TypeId::Binary => "binary",
            TypeId::Array => "array",
            TypeId::Map => "map",
            TypeId::NamedObject => "named_object",
        }
    }
}

/// Declarative schema of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeDescription {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Binary,
    /// Any value, encoded with its type id.
    Any,
    Array {
        item: Box<TypeDescription>,
    },
    Map {
        key: Box<TypeDescription>,
        value: Box<TypeDescription>,
    },
    /// Record type. Without fields and nested in another description, this
    /// refers to a type registered under `tag`.
    Object {
        tag: String,
        #[serde(default)]
        fields: Vec<FieldDescription>,
    },
}

/// One named field of an object description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescription,
}

impl FieldDescription {
    pub fn new(name: impl Into<String>, ty: TypeDescription) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl TypeDescription {
    /// Object description with the given fields.
    pub fn object(tag: impl Into<String>, fields: Vec<FieldDescription>) -> Self {
        TypeDescription::Object {
            tag: tag.into(),
            fields,
        }
    }

    /// Reference by tag to a registered object type.
    pub fn object_ref(tag: impl Into<String>) -> Self {
        TypeDescription::Object {
            tag: tag.into(),
            fields: Vec::new(),
        }
    }

    pub fn array(item: TypeDescription) -> Self {
        TypeDescription::Array {
            item: Box::new(item),
        }
    }

    pub fn map(key: TypeDescription, value: TypeDescription) -> Self {
        TypeDescription::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Tag of an object description.
    pub fn tag(&self) -> Option<&str> {
        match self {
            TypeDescription::Object { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Parse a description from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that this can be registered: an object whose field names are unique.
    pub(crate) fn validate_registrable(&self) -> Result<()> {
        let TypeDescription::Object { tag, fields } = self else {
            return Err(WireError::codec(
                "only object descriptions can be registered",
            ));
        };
        let mut names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(WireError::codec(format!(
                "duplicate field `{}` in `{tag}`",
                pair[0]
            )));
        }
        Ok(())
    }
}
