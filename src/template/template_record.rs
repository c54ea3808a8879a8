use crate::Record;
use crate::Value;

/// Outcome of resolving one field against an inheritance chain.
#[derive(Debug, PartialEq)]
pub enum Resolution<'a> {
    /// The field has an effective value, supplied by the named chain entry.
    Defined { value: &'a Value, owner: &'a str },
    /// The field was explicitly cleared by the named chain entry,
    /// suppressing inheritance without a replacement value.
    Cleared { owner: &'a str },
    /// No record in the chain defines or clears the field.
    Absent,
}

/// A record participating in inheritance: the stored record plus a link to
/// its parent template, or none for the root of a hierarchy.
///
/// The parent-of relation is acyclic; the template manager refuses to build
/// chains that revisit an id, so ownership here can be a plain `Box` without
/// risking a reference cycle.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    id: String,
    record: Record,
    parent: Option<Box<TemplateRecord>>,
}

impl TemplateRecord {
    pub fn new(
        id: impl Into<String>,
        record: Record,
        parent: Option<TemplateRecord>,
    ) -> Self {
        Self {
            id: id.into(),
            record,
            parent: parent.map(Box::new),
        }
    }

    /// Id of this record within its scope.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The stored record: explicitly-set fields only, inherited values are
    /// never baked in.
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn parent(&self) -> Option<&TemplateRecord> {
        self.parent.as_deref()
    }

    /// Number of records in the chain, this one included.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map(|p| p.depth()).unwrap_or(0)
    }

    /// Chain ids ordered root first, this record last.
    pub fn chain_ids(&self) -> Vec<&str> {
        let mut ids = self
            .parent
            .as_ref()
            .map(|p| p.chain_ids())
            .unwrap_or_default();
        ids.push(self.id());
        ids
    }

    /// Resolve a field's effective value, walking the chain leaf to root.
    pub fn resolve(
        &self,
        field: &str,
    ) -> Resolution<'_> {
        if self.record.is_hidden(field) {
            return Resolution::Cleared { owner: &self.id };
        }
        if let Some(value) = self.record.get(field) {
            return Resolution::Defined {
                value,
                owner: &self.id,
            };
        }
        match &self.parent {
            Some(parent) => parent.resolve(field),
            None => Resolution::Absent,
        }
    }

    /// Effective value of a field, if any.
    pub fn effective(
        &self,
        field: &str,
    ) -> Option<&Value> {
        match self.resolve(field) {
            Resolution::Defined { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Id of the chain entry supplying the field's effective value or clear
    /// mark.
    pub fn owner_of(
        &self,
        field: &str,
    ) -> Option<&str> {
        match self.resolve(field) {
            Resolution::Defined { owner, .. } | Resolution::Cleared { owner } => Some(owner),
            Resolution::Absent => None,
        }
    }

    /// True when this record defines or clears the field locally, shielding
    /// it (and its descendants) from ancestor changes.
    pub fn overrides(
        &self,
        field: &str,
    ) -> bool {
        self.record.contains_field(field) || self.record.is_hidden(field)
    }

    /// Bake the chain's effective values into a plain read-only record.
    ///
    /// Cleared and absent fields are omitted, matching the wire convention
    /// that they have the empty/absent form. Meta properties come from this
    /// record (the leaf).
    pub fn flatten(&self) -> Record {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }

        // Apply root first so closer records override.
        let mut flat = Record::new(self.record.symbolic_name());
        for entry in chain.iter().rev() {
            for hidden in entry.record.hidden_fields() {
                flat.remove(&hidden);
            }
            for (name, value) in entry.record.fields() {
                flat.put(name, value.clone());
            }
        }

        if let Some(parent_id) = self.record.parent_id() {
            flat.set_parent_id(Some(parent_id));
        }
        if self.record.is_template() {
            flat.mark_template();
        }

        flat
    }
}
