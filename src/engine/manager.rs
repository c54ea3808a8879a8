use std::sync::Arc;
use std::thread;
use std::thread::ThreadId;

use dashmap::DashMap;
use parking_lot::Mutex;
use parking_lot::RwLock;
use parking_lot::RwLockWriteGuard;
use tracing::info;
use tracing::warn;

use crate::CompletionStatus;
use crate::ConfigEvent;
use crate::ConflictError;
use crate::EventBus;
use crate::EventKind;
use crate::HandlerResult;
use crate::MutationState;
use crate::NotFoundError;
use crate::Path;
use crate::Record;
use crate::RecordStore;
use crate::Result;
use crate::Settings;
use crate::TemplateManager;
use crate::TemplateRecord;
use crate::TypeRegistry;
use crate::UnitOfWork;
use crate::ValidationError;
use crate::Value;

type Synchronization = Box<dyn FnOnce(CompletionStatus) + Send + 'static>;

/// The transactional façade over the template manager: validates, applies
/// inserts/updates/deletes, fires lifecycle events, and guarantees either
/// full commit or full rollback of a cascading operation.
///
/// Mutations execute under a scope-level exclusive lock so that
/// inheritance-chain reads during a cascade never observe a partially
/// applied sibling mutation: many readers, one active writer per scope. The
/// lock is released at the commit point (storage applied and every
/// pre-commit listener accepted), so post-commit listeners may read the
/// committed state freely.
pub struct ConfigurationTemplateManager {
    settings: Arc<Settings>,
    store: Arc<dyn RecordStore>,
    registry: Arc<TypeRegistry>,
    templates: TemplateManager,
    bus: EventBus,
    scope_locks: DashMap<String, Arc<RwLock<()>>>,
    // Completion callbacks staged per in-flight operation. Dispatch is
    // synchronous on the mutating thread, so the thread id identifies the
    // operation; nested mutations from listeners push a fresh frame.
    in_flight: DashMap<ThreadId, Mutex<Vec<Vec<Synchronization>>>>,
    pending_synchronizations: Mutex<Vec<Synchronization>>,
}

impl ConfigurationTemplateManager {
    /// # Errors
    ///
    /// - Return [`crate::Error::Config`] when the settings fail validation.
    pub fn new(
        settings: Settings,
        store: Arc<dyn RecordStore>,
        registry: Arc<TypeRegistry>,
    ) -> Result<Self> {
        settings.validate()?;
        let settings = Arc::new(settings);
        let templates =
            TemplateManager::new(settings.clone(), store.clone(), registry.clone());

        Ok(Self {
            settings,
            store,
            registry,
            templates,
            bus: EventBus::new(),
            scope_locks: DashMap::new(),
            in_flight: DashMap::new(),
            pending_synchronizations: Mutex::new(Vec::new()),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Register a handler for one event kind; handlers run synchronously in
    /// subscription order.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ConfigEvent) -> HandlerResult + Send + Sync + 'static,
    ) {
        self.bus.subscribe(kind, handler);
    }

    /// Register a one-shot callback fired exactly once when the enclosing
    /// unit of work finishes, with the final status.
    ///
    /// Called from a listener, the callback attaches to the operation being
    /// dispatched on the calling thread, never to a concurrent one on
    /// another scope; called outside any mutation, it attaches to the next
    /// one that starts.
    pub fn post_completion(
        &self,
        callback: impl FnOnce(CompletionStatus) + Send + 'static,
    ) {
        let callback: Synchronization = Box::new(callback);
        if let Some(frames) = self.in_flight.get(&thread::current().id()) {
            if let Some(frame) = frames.lock().last_mut() {
                frame.push(callback);
                return;
            }
        }
        self.pending_synchronizations.lock().push(callback);
    }

    /// Insert a new record at the path.
    ///
    /// Fires `Insert` pre-commit (a rejecting listener rolls the persist
    /// back) then `PostInsert` once the operation is durable.
    pub fn insert(
        &self,
        path: impl AsRef<str>,
        record: Record,
    ) -> Result<()> {
        let path = Path::parse(path)?;
        let lock = self.scope_lock(path.scope());
        let guard = lock
            .try_write()
            .ok_or_else(|| ConflictError::ScopeBusy(path.scope().to_string()))?;

        self.begin_operation();
        let mut uow = UnitOfWork::new();
        if let Err(err) = self.validate_insert(&path, &record) {
            self.finish_rejected(uow)?;
            return Err(err);
        }
        uow.transition(MutationState::Validated)?;

        self.store.put(&path, record);
        uow.transition(MutationState::Applied)?;
        uow.transition(MutationState::Cascading)?;

        let event = ConfigEvent::new(EventKind::Insert, path.clone(), None, false);
        if let Err(failure) = self.bus.publish_pre(&event) {
            warn!("insert at '{path}' rejected, rolling back: {failure}");
            self.store.remove(&path);
            self.finish_rolled_back(uow)?;
            return Err(failure.into());
        }

        // Commit point: post-commit listeners may read the scope.
        drop(guard);
        self.bus.publish_post(&event_as_post(&event));
        self.finish_committed(uow)?;
        info!("inserted record at '{path}'");
        Ok(())
    }

    /// Apply a single-field change and cascade it.
    ///
    /// Every descendant template that does not override the field is
    /// notified (its resolved value changes even though its stored data does
    /// not); overriding descendants are untouched and receive no event. The
    /// cascade is one atomic unit: any rejection rolls the storage mutation
    /// back.
    ///
    /// In a templated scope an empty scalar marks the field explicitly
    /// cleared, suppressing inheritance without a replacement value.
    pub fn update(
        &self,
        path: impl AsRef<str>,
        field: &str,
        value: Value,
    ) -> Result<()> {
        let path = Path::parse(path)?;
        let templated = self.is_templated(path.scope())?;
        let lock = self.scope_lock(path.scope());
        let guard = lock
            .try_write()
            .ok_or_else(|| ConflictError::ScopeBusy(path.scope().to_string()))?;

        self.begin_operation();
        let mut uow = UnitOfWork::new();
        let old = match self.validate_update(&path, field, &value) {
            Ok(record) => record,
            Err(err) => {
                self.finish_rejected(uow)?;
                return Err(err);
            }
        };
        uow.transition(MutationState::Validated)?;

        let mut mutated = old.clone();
        let clears = templated && value.as_scalar() == Some("");
        if clears {
            mutated.hide_field(field);
        } else {
            mutated.put(field, value);
        }
        self.store.put(&path, mutated);
        uow.transition(MutationState::Applied)?;
        uow.transition(MutationState::Cascading)?;

        let event = ConfigEvent::new(
            EventKind::Update,
            path.clone(),
            Some(field.to_string()),
            false,
        );
        if let Err(failure) = self.bus.publish_pre(&event) {
            warn!("update of '{path}' rejected, rolling back: {failure}");
            self.store.put(&path, old);
            self.finish_rolled_back(uow)?;
            return Err(failure.into());
        }

        // Notify non-overriding descendants breadth first, root to leaf. An
        // overriding descendant shields its whole subtree.
        let mut notified: Vec<Path> = Vec::new();
        if templated && path.len() == 2 {
            let scope = path.scope().to_string();
            let mut queue = std::collections::VecDeque::from(
                self.templates.children_of(&scope, path.base_name())?,
            );
            while let Some(child_id) = queue.pop_front() {
                let child_path = self.templates.item_path(&scope, &child_id)?;
                let child = match self.store.get(&child_path) {
                    Some(child) => child,
                    None => continue,
                };
                if child.contains_field(field) || child.is_hidden(field) {
                    continue;
                }

                let cascaded = ConfigEvent::new(
                    EventKind::Update,
                    child_path.clone(),
                    Some(field.to_string()),
                    true,
                );
                if let Err(failure) = self.bus.publish_pre(&cascaded) {
                    warn!(
                        "cascade for '{path}' rejected at '{child_path}', rolling back: {failure}"
                    );
                    self.store.put(&path, old);
                    self.finish_rolled_back(uow)?;
                    return Err(failure.into());
                }

                queue.extend(self.templates.children_of(&scope, &child_id)?);
                notified.push(child_path);
            }
        }

        drop(guard);
        self.bus.publish_post(&event_as_post(&event));
        for child_path in notified {
            self.bus.publish_post(&ConfigEvent::new(
                EventKind::PostUpdate,
                child_path,
                Some(field.to_string()),
                true,
            ));
        }
        self.finish_committed(uow)?;
        info!("updated '{field}' at '{path}'");
        Ok(())
    }

    /// Delete the record at the path.
    ///
    /// Deleting an absent path is not an error and fires no events. In a
    /// templated scope the reparent policy applies to direct template
    /// children; in a plain scope the whole stored subtree is removed.
    pub fn delete(
        &self,
        path: impl AsRef<str>,
    ) -> Result<()> {
        let path = Path::parse(path)?;
        let templated = self.is_templated(path.scope())?;
        let lock = self.scope_lock(path.scope());
        let guard = lock
            .try_write()
            .ok_or_else(|| ConflictError::ScopeBusy(path.scope().to_string()))?;

        if !self.store.contains(&path) {
            info!("delete of absent '{path}' is a no-op");
            return Ok(());
        }

        self.begin_operation();
        if templated && path.len() == 2 {
            self.delete_template_item(&path, guard)
        } else {
            self.delete_subtree(&path, guard)
        }
    }

    /// Resolved read view of the record at the path.
    ///
    /// In a templated scope this is the flattened inheritance chain; field
    /// accessors on it see effective values. Reads may proceed concurrently
    /// with other reads; a scope with a mutation still in flight surfaces
    /// [`ConflictError`] rather than blocking, so a pre-commit listener
    /// reading its own scope gets a conflict instead of a deadlock.
    pub fn resolve(
        &self,
        path: impl AsRef<str>,
    ) -> Result<Record> {
        let path = Path::parse(path)?;
        let templated = self.is_templated(path.scope())?;
        let lock = self.scope_lock(path.scope());
        let _guard = lock
            .try_read()
            .ok_or_else(|| ConflictError::ScopeBusy(path.scope().to_string()))?;

        if templated && path.len() == 2 {
            let template = self.templates.load(path.scope(), path.base_name())?;
            return Ok(template.flatten());
        }
        self.store
            .get(&path)
            .ok_or_else(|| NotFoundError::Path(path.to_string()).into())
    }

    /// Resolved template record (chain intact) for inspection of owners and
    /// overrides.
    pub fn resolve_template(
        &self,
        path: impl AsRef<str>,
    ) -> Result<TemplateRecord> {
        let path = Path::parse(path)?;
        let lock = self.scope_lock(path.scope());
        let _guard = lock
            .try_read()
            .ok_or_else(|| ConflictError::ScopeBusy(path.scope().to_string()))?;
        self.templates.load(path.scope(), path.base_name())
    }

    fn delete_template_item(
        &self,
        path: &Path,
        guard: RwLockWriteGuard<'_, ()>,
    ) -> Result<()> {
        let scope = path.scope().to_string();
        let id = path.base_name().to_string();
        let mut uow = UnitOfWork::new();

        // Snapshot target and direct children for rollback.
        let removed = match self.store.get(path) {
            Some(record) => record,
            None => {
                self.finish_rejected(uow)?;
                return Err(NotFoundError::Path(path.to_string()).into());
            }
        };
        let child_snapshots = match self.snapshot_children(&scope, &id) {
            Ok(snapshots) => snapshots,
            Err(err) => {
                self.finish_rejected(uow)?;
                return Err(err);
            }
        };

        match self.templates.delete(&scope, &id) {
            Ok(_reparented) => {}
            Err(err) => {
                self.finish_rejected(uow)?;
                return Err(err);
            }
        }
        uow.transition(MutationState::Validated)?;
        uow.transition(MutationState::Applied)?;
        uow.transition(MutationState::Cascading)?;

        let event = ConfigEvent::new(EventKind::Delete, path.clone(), None, false);
        let mut pre_result = self.bus.publish_pre(&event);
        if pre_result.is_ok() {
            // Reparented children see their resolved values change.
            for (child_path, _) in &child_snapshots {
                let cascaded =
                    ConfigEvent::new(EventKind::Update, child_path.clone(), None, true);
                if let Err(failure) = self.bus.publish_pre(&cascaded) {
                    pre_result = Err(failure);
                    break;
                }
            }
        }

        if let Err(failure) = pre_result {
            warn!("delete of '{path}' rejected, rolling back: {failure}");
            self.store.put(path, removed);
            for (child_path, child) in child_snapshots {
                self.store.put(&child_path, child);
            }
            self.finish_rolled_back(uow)?;
            return Err(failure.into());
        }

        drop(guard);
        self.bus.publish_post(&event_as_post(&event));
        for (child_path, _) in &child_snapshots {
            self.bus.publish_post(&ConfigEvent::new(
                EventKind::PostUpdate,
                child_path.clone(),
                None,
                true,
            ));
        }
        self.finish_committed(uow)?;
        info!("deleted template record at '{path}'");
        Ok(())
    }

    fn delete_subtree(
        &self,
        path: &Path,
        guard: RwLockWriteGuard<'_, ()>,
    ) -> Result<()> {
        let mut uow = UnitOfWork::new();
        if path.is_scope_root() {
            self.finish_rejected(uow)?;
            return Err(ValidationError::InvalidPath {
                path: path.to_string(),
                reason: "cannot delete a scope root".to_string(),
            }
            .into());
        }

        let subtree = self.store.subtree(path);
        uow.transition(MutationState::Validated)?;

        for (entry_path, _) in &subtree {
            self.store.remove(entry_path);
        }
        uow.transition(MutationState::Applied)?;
        uow.transition(MutationState::Cascading)?;

        let event = ConfigEvent::new(EventKind::Delete, path.clone(), None, false);
        let mut pre_result = self.bus.publish_pre(&event);
        if pre_result.is_ok() {
            for (entry_path, _) in subtree.iter().filter(|(p, _)| p != path) {
                let cascaded =
                    ConfigEvent::new(EventKind::Delete, entry_path.clone(), None, true);
                if let Err(failure) = self.bus.publish_pre(&cascaded) {
                    pre_result = Err(failure);
                    break;
                }
            }
        }

        if let Err(failure) = pre_result {
            warn!("delete of '{path}' rejected, rolling back: {failure}");
            for (entry_path, record) in subtree {
                self.store.put(&entry_path, record);
            }
            self.finish_rolled_back(uow)?;
            return Err(failure.into());
        }

        drop(guard);
        self.bus.publish_post(&event_as_post(&event));
        for (entry_path, _) in subtree.iter().filter(|(p, _)| p != path) {
            self.bus.publish_post(&ConfigEvent::new(
                EventKind::PostDelete,
                entry_path.clone(),
                None,
                true,
            ));
        }
        self.finish_committed(uow)?;
        info!("deleted record subtree at '{path}'");
        Ok(())
    }

    fn validate_insert(
        &self,
        path: &Path,
        record: &Record,
    ) -> Result<()> {
        let templated = self.is_templated(path.scope())?;

        if path.is_scope_root() {
            return Err(ValidationError::InvalidPath {
                path: path.to_string(),
                reason: "cannot insert at a scope root".to_string(),
            }
            .into());
        }
        if self.store.contains(path) {
            return Err(ValidationError::RecordExists(path.to_string()).into());
        }
        self.registry.validate_record(record)?;

        if templated {
            if path.len() != 2 {
                return Err(ValidationError::InvalidPath {
                    path: path.to_string(),
                    reason: "templated scopes nest structure within records".to_string(),
                }
                .into());
            }

            let parent = match record.parent_id() {
                Some(parent_id) => {
                    self.templates
                        .assert_link_allowed(path.scope(), path.base_name(), parent_id)?;
                    Some(self.templates.load(path.scope(), parent_id)?)
                }
                None => None,
            };

            // Templates may leave required fields for descendants; concrete
            // records must satisfy them through the resolved view.
            if !record.is_template() {
                let view =
                    TemplateRecord::new(path.base_name(), record.clone(), parent);
                self.registry.validate_required(&view.flatten())?;
            }
        } else {
            if record.parent_id().is_some() || record.is_template() {
                return Err(ValidationError::NotTemplated(path.scope().to_string()).into());
            }
            if let Some(parent_path) = path.parent() {
                if !parent_path.is_scope_root() && !self.store.contains(&parent_path) {
                    return Err(NotFoundError::Path(parent_path.to_string()).into());
                }
            }
            self.registry.validate_required(record)?;
        }

        Ok(())
    }

    fn validate_update(
        &self,
        path: &Path,
        field: &str,
        value: &Value,
    ) -> Result<Record> {
        let record = self
            .store
            .get(path)
            .ok_or_else(|| NotFoundError::Path(path.to_string()))?;

        let schema = self.registry.schema(record.symbolic_name())?;
        let field_schema =
            schema
                .field(field)
                .ok_or_else(|| ValidationError::UnknownField {
                    symbolic_name: record.symbolic_name().to_string(),
                    field: field.to_string(),
                })?;
        self.registry.validate_value(field, &field_schema.kind, value)?;

        Ok(record)
    }

    fn snapshot_children(
        &self,
        scope: &str,
        id: &str,
    ) -> Result<Vec<(Path, Record)>> {
        let mut snapshots = Vec::new();
        for child_id in self.templates.children_of(scope, id)? {
            let child_path = self.templates.item_path(scope, &child_id)?;
            if let Some(child) = self.store.get(&child_path) {
                snapshots.push((child_path, child));
            }
        }
        Ok(snapshots)
    }

    fn is_templated(
        &self,
        scope: &str,
    ) -> Result<bool> {
        self.settings
            .scope(scope)
            .map(|config| config.templated)
            .ok_or_else(|| NotFoundError::Scope(scope.to_string()).into())
    }

    fn scope_lock(
        &self,
        scope: &str,
    ) -> Arc<RwLock<()>> {
        self.scope_locks
            .entry(scope.to_string())
            .or_default()
            .clone()
    }

    fn finish_committed(
        &self,
        mut uow: UnitOfWork,
    ) -> Result<()> {
        self.drain_synchronizations(&mut uow);
        uow.commit()
    }

    fn finish_rolled_back(
        &self,
        mut uow: UnitOfWork,
    ) -> Result<()> {
        self.drain_synchronizations(&mut uow);
        uow.rollback()
    }

    fn finish_rejected(
        &self,
        mut uow: UnitOfWork,
    ) -> Result<()> {
        self.drain_synchronizations(&mut uow);
        uow.reject()
    }

    // Open a staging frame for the operation starting on this thread,
    // absorbing any callbacks registered outside a mutation.
    fn begin_operation(&self) {
        let staged = std::mem::take(&mut *self.pending_synchronizations.lock());
        self.in_flight
            .entry(thread::current().id())
            .or_default()
            .lock()
            .push(staged);
    }

    fn drain_synchronizations(
        &self,
        uow: &mut UnitOfWork,
    ) {
        let thread = thread::current().id();
        let frame = self
            .in_flight
            .get(&thread)
            .and_then(|frames| frames.lock().pop())
            .unwrap_or_default();
        self.in_flight.remove_if(&thread, |_, frames| frames.lock().is_empty());

        for callback in frame {
            uow.post_completion(callback);
        }
    }
}

fn event_as_post(event: &ConfigEvent) -> ConfigEvent {
    ConfigEvent::new(
        event.kind.post(),
        event.path.clone(),
        event.field.clone(),
        event.cascaded,
    )
}
