use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::CodecError;

/// Shape of a single schema field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    String,
    Int,
    Bool,
    Float,
    /// Ordered list of strings
    StringList,
    /// Nested record of the named type
    Nested(String),
    /// Collection of child records of the named type, keyed by name
    Collection(String),
}

impl FieldKind {
    /// Squeezer for scalar kinds; structured kinds have no string codec.
    pub fn squeezer(&self) -> Option<&'static dyn Squeezer> {
        match self {
            FieldKind::String => Some(&StringSqueezer),
            FieldKind::Int => Some(&IntSqueezer),
            FieldKind::Bool => Some(&BoolSqueezer),
            FieldKind::Float => Some(&FloatSqueezer),
            FieldKind::StringList | FieldKind::Nested(_) | FieldKind::Collection(_) => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Int => write!(f, "int"),
            FieldKind::Bool => write!(f, "boolean"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::StringList => write!(f, "string list"),
            FieldKind::Nested(name) => write!(f, "nested {name}"),
            FieldKind::Collection(name) => write!(f, "collection of {name}"),
        }
    }
}

/// A typed domain value for a scalar field.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Int(i64),
    Bool(bool),
    Float(f64),
}

/// Bidirectional converter between typed values and their canonical string
/// form.
///
/// The absent value squeezes to the empty string, and the empty string
/// unsqueezes to `None` rather than an error: unset optional fields
/// serialize as empty. Squeezing is the left inverse of unsqueezing for all
/// representable values.
pub trait Squeezer: Send + Sync {
    fn squeeze(
        &self,
        value: Option<&TypedValue>,
    ) -> String;

    /// # Errors
    ///
    /// - Return [`CodecError::Malformed`] when the text does not parse into
    ///   the target domain.
    fn unsqueeze(
        &self,
        text: &str,
    ) -> Result<Option<TypedValue>, CodecError>;
}

pub struct StringSqueezer;

impl Squeezer for StringSqueezer {
    fn squeeze(
        &self,
        value: Option<&TypedValue>,
    ) -> String {
        match value {
            Some(TypedValue::String(s)) => s.clone(),
            Some(other) => other_to_text(other),
            None => String::new(),
        }
    }

    fn unsqueeze(
        &self,
        text: &str,
    ) -> Result<Option<TypedValue>, CodecError> {
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(TypedValue::String(text.to_string())))
    }
}

pub struct IntSqueezer;

impl Squeezer for IntSqueezer {
    fn squeeze(
        &self,
        value: Option<&TypedValue>,
    ) -> String {
        match value {
            Some(TypedValue::Int(i)) => i.to_string(),
            Some(other) => other_to_text(other),
            None => String::new(),
        }
    }

    fn unsqueeze(
        &self,
        text: &str,
    ) -> Result<Option<TypedValue>, CodecError> {
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<i64>()
            .map(|i| Some(TypedValue::Int(i)))
            .map_err(|_| CodecError::Malformed {
                text: text.to_string(),
                kind: "int".to_string(),
            })
    }
}

pub struct BoolSqueezer;

impl Squeezer for BoolSqueezer {
    fn squeeze(
        &self,
        value: Option<&TypedValue>,
    ) -> String {
        match value {
            Some(TypedValue::Bool(b)) => b.to_string(),
            Some(other) => other_to_text(other),
            None => String::new(),
        }
    }

    fn unsqueeze(
        &self,
        text: &str,
    ) -> Result<Option<TypedValue>, CodecError> {
        match text {
            "" => Ok(None),
            "true" | "1" => Ok(Some(TypedValue::Bool(true))),
            "false" | "0" => Ok(Some(TypedValue::Bool(false))),
            _ => Err(CodecError::Malformed {
                text: text.to_string(),
                kind: "boolean".to_string(),
            }),
        }
    }
}

pub struct FloatSqueezer;

impl Squeezer for FloatSqueezer {
    fn squeeze(
        &self,
        value: Option<&TypedValue>,
    ) -> String {
        match value {
            Some(TypedValue::Float(f)) => f.to_string(),
            Some(other) => other_to_text(other),
            None => String::new(),
        }
    }

    fn unsqueeze(
        &self,
        text: &str,
    ) -> Result<Option<TypedValue>, CodecError> {
        if text.is_empty() {
            return Ok(None);
        }
        text.parse::<f64>()
            .map(|f| Some(TypedValue::Float(f)))
            .map_err(|_| CodecError::Malformed {
                text: text.to_string(),
                kind: "float".to_string(),
            })
    }
}

// Fallback for a value handed to the wrong squeezer; the registry validates
// kinds before squeezing, so this only shows up in diagnostics.
fn other_to_text(value: &TypedValue) -> String {
    match value {
        TypedValue::String(s) => s.clone(),
        TypedValue::Int(i) => i.to_string(),
        TypedValue::Bool(b) => b.to_string(),
        TypedValue::Float(f) => f.to_string(),
    }
}
