use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::CycleOrDepthError;
use crate::DeletePolicy;
use crate::Error;
use crate::NotFoundError;
use crate::Path;
use crate::Record;
use crate::RecordStore;
use crate::Result;
use crate::Settings;
use crate::TemplateRecord;
use crate::TypeRegistry;
use crate::ValidationError;

/// Resolves inheritance chains and loads/stores/deletes template records.
///
/// Items of a templated scope live at `scope/id`. Chain construction is
/// deterministic: ancestors are discovered by following the parent-of meta
/// link upward until a record with no parent is reached. A repeated id or a
/// chain longer than the configured maximum depth is refused before any
/// resolution, as a defensive bound against accidental cycles.
pub struct TemplateManager {
    settings: Arc<Settings>,
    store: Arc<dyn RecordStore>,
    registry: Arc<TypeRegistry>,
}

impl TemplateManager {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<dyn RecordStore>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            settings,
            store,
            registry,
        }
    }

    /// Build the resolved template record for `scope/id`: a read view whose
    /// accessors walk the inheritance chain root -> ... -> id.
    ///
    /// # Errors
    ///
    /// - Return [`NotFoundError::Path`] if no record exists at the path.
    /// - Return [`NotFoundError::Ancestor`] if a parent link names a missing
    ///   record.
    /// - Return [`CycleOrDepthError`] if the parent-of relation revisits an
    ///   id or the chain exceeds the configured bound.
    pub fn load(
        &self,
        scope: &str,
        id: &str,
    ) -> Result<TemplateRecord> {
        self.assert_templated(scope)?;
        debug!("build inheritance chain for '{scope}/{id}'");

        let max = self.settings.engine.max_chain_depth;
        let mut seen: HashSet<String> = HashSet::new();
        // Collected leaf first; folded root first below.
        let mut chain: Vec<(String, Record)> = Vec::new();
        let mut current = id.to_string();

        loop {
            if !seen.insert(current.clone()) {
                return Err(CycleOrDepthError::CycleDetected {
                    scope: scope.to_string(),
                    id: id.to_string(),
                }
                .into());
            }
            if chain.len() == max {
                return Err(CycleOrDepthError::DepthExceeded {
                    scope: scope.to_string(),
                    id: id.to_string(),
                    max,
                }
                .into());
            }

            let path = self.item_path(scope, &current)?;
            let record = self.store.get(&path).ok_or_else(|| -> Error {
                if current == id {
                    NotFoundError::Path(path.to_string()).into()
                } else {
                    NotFoundError::Ancestor {
                        scope: scope.to_string(),
                        id: id.to_string(),
                        ancestor: current.clone(),
                    }
                    .into()
                }
            })?;

            let parent_id = record.parent_id().map(str::to_string);
            chain.push((current, record));
            match parent_id {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let mut template: Option<TemplateRecord> = None;
        for (entry_id, record) in chain.into_iter().rev() {
            template = Some(TemplateRecord::new(entry_id, record, template));
        }
        // The loop above always pushes the target record before breaking.
        Ok(template.expect("chain contains at least the target record"))
    }

    /// Persist the record as given: its own explicitly-set fields only,
    /// inherited values are never baked in.
    ///
    /// # Errors
    ///
    /// - Return [`ValidationError`]/[`crate::CodecError`] if the record
    ///   disagrees with its declared schema.
    /// - Return [`CycleOrDepthError`] if the declared parent link would
    ///   create a cycle or an over-deep chain.
    pub fn store(
        &self,
        scope: &str,
        id: &str,
        record: &Record,
    ) -> Result<()> {
        self.assert_templated(scope)?;
        self.registry.validate_record(record)?;

        if let Some(parent_id) = record.parent_id() {
            self.assert_link_allowed(scope, id, parent_id)?;
        }

        let path = self.item_path(scope, id)?;
        self.store.put(&path, record.clone());
        Ok(())
    }

    /// Remove the record and apply the reparenting policy to its direct
    /// template children. Returns the ids of reparented children.
    ///
    /// Deleting an absent id is not an error; delete is idempotent.
    pub fn delete(
        &self,
        scope: &str,
        id: &str,
    ) -> Result<Vec<String>> {
        self.assert_templated(scope)?;

        let path = self.item_path(scope, id)?;
        let record = match self.store.get(&path) {
            Some(record) => record,
            None => {
                debug!("delete of absent '{path}' ignored");
                return Ok(Vec::new());
            }
        };

        let children = self.children_of(scope, id)?;
        if self.settings.engine.delete_policy == DeletePolicy::Restrict && !children.is_empty() {
            return Err(ValidationError::DeleteRestricted {
                path: path.to_string(),
                children: children.len(),
            }
            .into());
        }

        let new_parent = record.parent_id();
        for child_id in &children {
            let child_path = self.item_path(scope, child_id)?;
            if let Some(mut child) = self.store.get(&child_path) {
                child.set_parent_id(new_parent);
                self.store.put(&child_path, child);
            }
        }

        self.store.remove(&path);
        Ok(children)
    }

    /// Ids of records whose parent link names `id`, sorted.
    pub fn children_of(
        &self,
        scope: &str,
        id: &str,
    ) -> Result<Vec<String>> {
        let scope_root = Path::parse(scope)?;
        let mut ids = Vec::new();
        for child_path in self.store.children(&scope_root) {
            if let Some(record) = self.store.get(&child_path) {
                if record.parent_id() == Some(id) {
                    ids.push(child_path.base_name().to_string());
                }
            }
        }
        Ok(ids)
    }

    /// All descendants of `id`, breadth first, root to leaf.
    pub fn descendants(
        &self,
        scope: &str,
        id: &str,
    ) -> Result<Vec<String>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = self.children_of(scope, id)?.into();
        let mut order = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(self.children_of(scope, &current)?);
            order.push(current);
        }

        Ok(order)
    }

    /// Storage path of a scope item.
    pub(crate) fn item_path(
        &self,
        scope: &str,
        id: &str,
    ) -> Result<Path> {
        let path = Path::parse(format!("{scope}/{id}"))?;
        if path.len() != 2 {
            return Err(ValidationError::InvalidPath {
                path: path.to_string(),
                reason: "template ids must be single path segments".to_string(),
            }
            .into());
        }
        Ok(path)
    }

    /// # Errors
    ///
    /// - Return [`NotFoundError::Scope`] for an undeclared scope.
    /// - Return [`ValidationError::NotTemplated`] for a scope declared
    ///   without inheritance.
    pub(crate) fn assert_templated(
        &self,
        scope: &str,
    ) -> Result<()> {
        let config = self
            .settings
            .scope(scope)
            .ok_or_else(|| NotFoundError::Scope(scope.to_string()))?;
        if !config.templated {
            return Err(ValidationError::NotTemplated(scope.to_string()).into());
        }
        Ok(())
    }

    /// Verify that linking `id` under `parent_id` keeps the parent-of
    /// relation an acyclic forest within the depth bound.
    pub(crate) fn assert_link_allowed(
        &self,
        scope: &str,
        id: &str,
        parent_id: &str,
    ) -> Result<()> {
        let max = self.settings.engine.max_chain_depth;
        let mut current = parent_id.to_string();
        let mut steps = 0;

        loop {
            if current == id {
                return Err(CycleOrDepthError::CycleDetected {
                    scope: scope.to_string(),
                    id: id.to_string(),
                }
                .into());
            }

            let path = self.item_path(scope, &current)?;
            let record = self.store.get(&path).ok_or_else(|| NotFoundError::Ancestor {
                scope: scope.to_string(),
                id: id.to_string(),
                ancestor: current.clone(),
            })?;

            steps += 1;
            if steps >= max {
                return Err(CycleOrDepthError::DepthExceeded {
                    scope: scope.to_string(),
                    id: id.to_string(),
                    max,
                }
                .into());
            }

            match record.parent_id() {
                Some(parent) => current = parent.to_string(),
                None => break,
            }
        }

        Ok(())
    }
}
