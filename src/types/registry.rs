use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::FieldKind;
use crate::NotFoundError;
use crate::Record;
use crate::Result;
use crate::TypedValue;
use crate::ValidationError;
use crate::Value;

/// Schema of a single record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSchema {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
        }
    }

    pub fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
        }
    }
}

/// Schema of a registered record type: which fields are legal and their
/// codecs.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSchema {
    symbolic_name: String,
    fields: BTreeMap<String, FieldSchema>,
}

impl TypeSchema {
    pub fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        schema: FieldSchema,
    ) -> Self {
        self.fields.insert(name.into(), schema);
        self
    }

    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    pub fn field(
        &self,
        name: &str,
    ) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Registry of record types keyed by symbolic name.
#[derive(Default)]
pub struct TypeRegistry {
    types: DashMap<String, Arc<TypeSchema>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type schema, replacing any previous registration under the
    /// same symbolic name.
    pub fn register(
        &self,
        schema: TypeSchema,
    ) -> Arc<TypeSchema> {
        debug!("register type '{}'", schema.symbolic_name());
        let schema = Arc::new(schema);
        self.types
            .insert(schema.symbolic_name().to_string(), schema.clone());
        schema
    }

    /// # Errors
    ///
    /// - Return [`NotFoundError::Type`] when the symbolic name was never
    ///   registered.
    pub fn schema(
        &self,
        symbolic_name: &str,
    ) -> Result<Arc<TypeSchema>> {
        self.types
            .get(symbolic_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| NotFoundError::Type(symbolic_name.to_string()).into())
    }

    /// Decode canonical text into the typed domain of the given field kind.
    ///
    /// Empty text decodes to the absent value, never an error.
    ///
    /// # Errors
    ///
    /// - Return [`crate::CodecError::Malformed`] when the text does not parse.
    /// - Return [`ValidationError::FieldTypeMismatch`] for structured kinds,
    ///   which have no string codec.
    pub fn decode(
        &self,
        field: &str,
        kind: &FieldKind,
        text: &str,
    ) -> Result<Option<TypedValue>> {
        match kind.squeezer() {
            Some(squeezer) => Ok(squeezer.unsqueeze(text)?),
            None => Err(ValidationError::FieldTypeMismatch {
                field: field.to_string(),
                expected: kind.to_string(),
            }
            .into()),
        }
    }

    /// Encode a typed value into its canonical string form; absent encodes
    /// as the empty string.
    pub fn encode(
        &self,
        value: Option<&TypedValue>,
    ) -> String {
        match value {
            None => String::new(),
            Some(TypedValue::String(_)) => FieldKind::String
                .squeezer()
                .map(|s| s.squeeze(value))
                .unwrap_or_default(),
            Some(TypedValue::Int(_)) => FieldKind::Int
                .squeezer()
                .map(|s| s.squeeze(value))
                .unwrap_or_default(),
            Some(TypedValue::Bool(_)) => FieldKind::Bool
                .squeezer()
                .map(|s| s.squeeze(value))
                .unwrap_or_default(),
            Some(TypedValue::Float(_)) => FieldKind::Float
                .squeezer()
                .map(|s| s.squeeze(value))
                .unwrap_or_default(),
        }
    }

    /// Validate a record's stored fields against its declared schema.
    ///
    /// Checks the symbolic name is registered, every stored (and hidden)
    /// field is declared, stored shapes match the declared kinds, scalar
    /// text parses under the field's codec, and nested records validate
    /// recursively. Required fields are checked separately against the
    /// resolved view, see [`TypeRegistry::validate_required`].
    pub fn validate_record(
        &self,
        record: &Record,
    ) -> Result<()> {
        let schema = self.schema(record.symbolic_name())?;

        for hidden in record.hidden_fields() {
            if schema.field(&hidden).is_none() {
                return Err(ValidationError::UnknownField {
                    symbolic_name: schema.symbolic_name().to_string(),
                    field: hidden,
                }
                .into());
            }
        }

        for (name, value) in record.fields() {
            let field = schema.field(name).ok_or_else(|| ValidationError::UnknownField {
                symbolic_name: schema.symbolic_name().to_string(),
                field: name.to_string(),
            })?;

            self.validate_value(name, &field.kind, value)?;
        }

        Ok(())
    }

    /// Check required fields are present and non-empty.
    ///
    /// Applied to the resolved view of a record: a template may legally
    /// leave required fields for its descendants to supply.
    pub fn validate_required(
        &self,
        record: &Record,
    ) -> Result<()> {
        let schema = self.schema(record.symbolic_name())?;

        for (name, field) in schema.fields() {
            if !field.required {
                continue;
            }

            let satisfied = match record.get(name) {
                Some(Value::Scalar(text)) => !text.is_empty(),
                Some(_) => true,
                None => false,
            };
            if !satisfied {
                return Err(ValidationError::MissingRequired {
                    field: name.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    pub(crate) fn validate_value(
        &self,
        name: &str,
        kind: &FieldKind,
        value: &Value,
    ) -> Result<()> {
        match (kind, value) {
            (FieldKind::String | FieldKind::Int | FieldKind::Bool | FieldKind::Float, Value::Scalar(text)) => {
                // Parse failure surfaces as a codec error before any
                // storage mutation.
                self.decode(name, kind, text)?;
                Ok(())
            }
            (FieldKind::StringList, Value::List(_)) => Ok(()),
            (FieldKind::Nested(symbolic_name), Value::Nested(nested)) => {
                if nested.symbolic_name() != symbolic_name {
                    return Err(ValidationError::FieldTypeMismatch {
                        field: name.to_string(),
                        expected: kind.to_string(),
                    }
                    .into());
                }
                self.validate_record(nested)
            }
            (FieldKind::Collection(symbolic_name), Value::Collection(children)) => {
                for child in children.values() {
                    if child.symbolic_name() != symbolic_name {
                        return Err(ValidationError::FieldTypeMismatch {
                            field: name.to_string(),
                            expected: kind.to_string(),
                        }
                        .into());
                    }
                    self.validate_record(child)?;
                }
                Ok(())
            }
            (kind, _) => Err(ValidationError::FieldTypeMismatch {
                field: name.to_string(),
                expected: kind.to_string(),
            }
            .into()),
        }
    }
}
