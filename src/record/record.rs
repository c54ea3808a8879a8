use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

/// Meta property naming the parent template id within the owning scope.
pub const PARENT_KEY: &str = "parent";
/// Meta property marking a record as a template node.
pub const TEMPLATE_KEY: &str = "template";
/// Meta property listing fields explicitly cleared at this record.
pub const HIDDEN_KEY: &str = "hidden";

const HIDDEN_SEPARATOR: char = ',';

/// A single stored field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Scalar in canonical string form
    Scalar(String),
    /// Ordered list of canonical strings
    List(Vec<String>),
    /// Nested record reference
    Nested(Record),
    /// Collection of child records keyed by name
    Collection(BTreeMap<String, Record>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Human-facing shape name, used in validation errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::List(_) => "list",
            Value::Nested(_) => "nested record",
            Value::Collection(_) => "collection",
        }
    }
}

/// Atomic named/typed container of configuration values.
///
/// Field names within one record are unique (map semantics) and the symbolic
/// type name is immutable after creation. Records are mutated in place by
/// update operations, never replaced wholesale, so listeners keep a stable
/// identity for the record at a given path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    symbolic_name: String,
    #[serde(default)]
    meta: BTreeMap<String, String>,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(symbolic_name: impl Into<String>) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            meta: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Symbolic type name, resolved via the type registry.
    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    pub fn get(
        &self,
        field: &str,
    ) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field, returning any previous value.
    ///
    /// Storing a value clears an explicit hidden mark on the same field.
    pub fn put(
        &mut self,
        field: impl Into<String>,
        value: Value,
    ) -> Option<Value> {
        let field = field.into();
        self.unhide_field(&field);
        self.fields.insert(field, value)
    }

    pub fn remove(
        &mut self,
        field: &str,
    ) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains_field(
        &self,
        field: &str,
    ) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn meta(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    pub fn set_meta(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.meta.insert(key.into(), value.into());
    }

    pub fn remove_meta(
        &mut self,
        key: &str,
    ) -> Option<String> {
        self.meta.remove(key)
    }

    /// Id of the parent template record within the same scope, if linked.
    pub fn parent_id(&self) -> Option<&str> {
        self.meta(PARENT_KEY)
    }

    pub fn set_parent_id(
        &mut self,
        parent: Option<&str>,
    ) {
        match parent {
            Some(id) => self.set_meta(PARENT_KEY, id),
            None => {
                self.meta.remove(PARENT_KEY);
            }
        }
    }

    pub fn is_template(&self) -> bool {
        self.meta(TEMPLATE_KEY).is_some()
    }

    pub fn mark_template(&mut self) {
        self.set_meta(TEMPLATE_KEY, "true");
    }

    /// Fields explicitly cleared at this record, suppressing inheritance
    /// without supplying a replacement value.
    pub fn hidden_fields(&self) -> BTreeSet<String> {
        self.meta(HIDDEN_KEY)
            .map(|joined| {
                joined
                    .split(HIDDEN_SEPARATOR)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_hidden(
        &self,
        field: &str,
    ) -> bool {
        self.hidden_fields().contains(field)
    }

    /// Mark a field as explicitly cleared, dropping any local value for it.
    pub fn hide_field(
        &mut self,
        field: &str,
    ) {
        self.fields.remove(field);
        let mut hidden = self.hidden_fields();
        hidden.insert(field.to_string());
        self.store_hidden(hidden);
    }

    pub fn unhide_field(
        &mut self,
        field: &str,
    ) {
        let mut hidden = self.hidden_fields();
        if hidden.remove(field) {
            self.store_hidden(hidden);
        }
    }

    fn store_hidden(
        &mut self,
        hidden: BTreeSet<String>,
    ) {
        if hidden.is_empty() {
            self.meta.remove(HIDDEN_KEY);
        } else {
            let joined = hidden.into_iter().collect::<Vec<_>>().join(",");
            self.set_meta(HIDDEN_KEY, joined);
        }
    }
}
