//! Declared field types and raw field values.

use std::fmt;

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::ImageArray;

/// Type tag declared for a session input.
///
/// Unknown tags are kept as `Unsupported` so a session can be built from
/// any configuration; records using them are rejected when encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Str,
    Float,
    Int,
    Boolean,
    ImageArray,
    Unsupported(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Str => "str",
            FieldType::Float => "float",
            FieldType::Int => "int",
            FieldType::Boolean => "boolean",
            FieldType::ImageArray => "image_array",
            FieldType::Unsupported(tag) => tag.as_str(),
        }
    }
}

impl From<&str> for FieldType {
    fn from(tag: &str) -> Self {
        match tag {
            "str" => FieldType::Str,
            "float" => FieldType::Float,
            "int" => FieldType::Int,
            "boolean" => FieldType::Boolean,
            "image_array" => FieldType::ImageArray,
            other => FieldType::Unsupported(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        FieldType::from(tag.as_str())
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw value handed to the publisher for one input.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    Image(ImageArray),
}

impl FieldValue {
    /// Convert a JSON value according to the declared type of its field.
    pub fn from_json(field: &str, ty: &FieldType, value: &Value) -> ProtocolResult<Self> {
        let invalid = |reason: &str| ProtocolError::InvalidValue {
            field: field.to_string(),
            expected: ty.to_string(),
            reason: reason.to_string(),
        };

        match ty {
            FieldType::Str => value
                .as_str()
                .map(|s| FieldValue::Str(s.to_string()))
                .ok_or_else(|| invalid("expected a string")),
            FieldType::Float => value
                .as_f64()
                .map(FieldValue::Float)
                .ok_or_else(|| invalid("expected a number")),
            FieldType::Int => value
                .as_i64()
                .map(FieldValue::Int)
                .ok_or_else(|| invalid("expected an integer")),
            FieldType::Boolean => value
                .as_bool()
                .map(FieldValue::Bool)
                .ok_or_else(|| invalid("expected a boolean")),
            FieldType::ImageArray => ImageArray::from_json(field, value).map(FieldValue::Image),
            // Carried through so the publisher reports the unsupported tag.
            FieldType::Unsupported(_) => match value {
                Value::String(s) => Ok(FieldValue::Str(s.clone())),
                Value::Bool(b) => Ok(FieldValue::Bool(*b)),
                Value::Number(n) => n
                    .as_i64()
                    .map(FieldValue::Int)
                    .or_else(|| n.as_f64().map(FieldValue::Float))
                    .ok_or_else(|| invalid("number out of range")),
                Value::Array(_) => ImageArray::from_json(field, value).map(FieldValue::Image),
                _ => Err(invalid("unrepresentable value")),
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            FieldValue::Float(f) => Err(S::Error::custom(format!(
                "float {f} is not JSON serializable"
            ))),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Image(frame) => Err(S::Error::custom(format!(
                "image array of shape {:?} is not JSON serializable",
                frame.shape()
            ))),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<ImageArray> for FieldValue {
    fn from(frame: ImageArray) -> Self {
        FieldValue::Image(frame)
    }
}
