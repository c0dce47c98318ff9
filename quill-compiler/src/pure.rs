use std::fmt;

use serde_json::{Map, Number, Value as JsonValue};

use crate::types::{Builtin, Type};

/// Content of a value that is known at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Pure {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Pure>),
    /// Ordered key/value pairs.
    Object(Vec<(String, Pure)>),
    Type(Type),
}

impl Pure {
    /// The builtin tag a runtime value of this content carries.
    pub fn tag(&self) -> Builtin {
        match self {
            Pure::Null => Builtin::Void,
            Pure::Bool(_) => Builtin::Boolean,
            Pure::Number(_) => Builtin::Number,
            Pure::String(_) => Builtin::String,
            Pure::Array(_) => Builtin::Array,
            Pure::Object(_) => Builtin::Object,
            Pure::Type(_) => Builtin::Type,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Pure> {
        match self {
            Pure::Object(fields) => fields
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn element(&self, index: usize) -> Option<&Pure> {
        match self {
            Pure::Array(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Pure::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// Key under which a domain exposes this constant.
    pub fn key(&self) -> String {
        match self {
            Pure::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Pure::Null => JsonValue::Null,
            Pure::Bool(value) => JsonValue::Bool(*value),
            Pure::Number(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Pure::String(value) => JsonValue::String(value.clone()),
            Pure::Array(items) => JsonValue::Array(items.iter().map(Pure::to_json).collect()),
            Pure::Object(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), value.to_json());
                }
                JsonValue::Object(map)
            }
            Pure::Type(ty) => JsonValue::String(ty.describe()),
        }
    }
}

impl From<f64> for Pure {
    fn from(value: f64) -> Self {
        Pure::Number(value)
    }
}

impl From<bool> for Pure {
    fn from(value: bool) -> Self {
        Pure::Bool(value)
    }
}

impl From<&str> for Pure {
    fn from(value: &str) -> Self {
        Pure::String(value.to_string())
    }
}

impl From<String> for Pure {
    fn from(value: String) -> Self {
        Pure::String(value)
    }
}

impl From<Type> for Pure {
    fn from(value: Type) -> Self {
        Pure::Type(value)
    }
}

impl fmt::Display for Pure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pure::Null => f.write_str("null"),
            Pure::Bool(value) => write!(f, "{value}"),
            Pure::Number(value) => write!(f, "{value}"),
            Pure::String(value) => {
                let quoted = serde_json::to_string(value).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            Pure::Array(items) => {
                f.write_str("[")?;
                for (position, item) in items.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Pure::Object(fields) => {
                f.write_str("{")?;
                for (position, (key, value)) in fields.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Pure::Type(ty) => write!(f, "^{ty}"),
        }
    }
}
