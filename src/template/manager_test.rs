use std::sync::Arc;

use crate::DeletePolicy;
use crate::Error;
use crate::FieldKind;
use crate::FieldSchema;
use crate::CycleOrDepthError;
use crate::InMemoryRecordStore;
use crate::MockRecordStore;
use crate::NotFoundError;
use crate::Path;
use crate::Record;
use crate::RecordStore;
use crate::Settings;
use crate::TemplateManager;
use crate::TypeRegistry;
use crate::TypeSchema;
use crate::ValidationError;
use crate::Value;

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.declare_scope("projects", true);
    settings.declare_scope("settings", false);
    settings
}

fn registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    registry.register(
        TypeSchema::new("projectConfig")
            .with_field("url", FieldSchema::new(FieldKind::String))
            .with_field("timeout", FieldSchema::new(FieldKind::Int)),
    );
    Arc::new(registry)
}

fn manager_with(settings: Settings) -> (TemplateManager, Arc<InMemoryRecordStore>) {
    let store = Arc::new(InMemoryRecordStore::new());
    let manager = TemplateManager::new(
        Arc::new(settings),
        store.clone() as Arc<dyn RecordStore>,
        registry(),
    );
    (manager, store)
}

fn manager() -> (TemplateManager, Arc<InMemoryRecordStore>) {
    manager_with(settings())
}

fn record(
    parent: Option<&str>,
    url: Option<&str>,
) -> Record {
    let mut record = Record::new("projectConfig");
    record.set_parent_id(parent);
    if let Some(url) = url {
        record.put("url", Value::Scalar(url.to_string()));
    }
    record
}

#[test]
fn test_load_builds_chain_root_to_leaf() {
    let (manager, _) = manager();
    manager.store("projects", "global", &record(None, Some("http://global"))).unwrap();
    manager.store("projects", "acme", &record(Some("global"), None)).unwrap();

    let template = manager.load("projects", "acme").unwrap();
    assert_eq!(vec!["global", "acme"], template.chain_ids());
    assert_eq!(
        Some("http://global"),
        template.effective("url").and_then(Value::as_scalar)
    );
}

#[test]
fn test_load_missing_target() {
    let (manager, _) = manager();
    match manager.load("projects", "ghost") {
        Err(Error::NotFound(NotFoundError::Path(path))) => assert_eq!("projects/ghost", path),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_load_missing_ancestor() {
    let (manager, store) = manager();
    // Bypass store() so the dangling parent link reaches load().
    store.put(
        &Path::parse("projects/acme").unwrap(),
        record(Some("ghost"), None),
    );

    match manager.load("projects", "acme") {
        Err(Error::NotFound(NotFoundError::Ancestor { ancestor, .. })) => {
            assert_eq!("ghost", ancestor)
        }
        other => panic!("expected missing ancestor, got {:?}", other),
    }
}

#[test]
fn test_store_rejects_cycle() {
    let (manager, _) = manager();
    manager.store("projects", "a", &record(None, None)).unwrap();
    manager.store("projects", "b", &record(Some("a"), None)).unwrap();

    // Re-linking a under b would form a -> b -> a.
    match manager.store("projects", "a", &record(Some("b"), None)) {
        Err(Error::CycleOrDepth(CycleOrDepthError::CycleDetected { id, .. })) => {
            assert_eq!("a", id)
        }
        other => panic!("expected CycleDetected, got {:?}", other),
    }
}

#[test]
fn test_store_rejects_self_parent() {
    let (manager, _) = manager();
    assert!(matches!(
        manager.store("projects", "a", &record(Some("a"), None)),
        Err(Error::CycleOrDepth(_))
    ));
}

#[test]
fn test_load_rejects_preexisting_cycle_before_resolution() {
    let (manager, store) = manager();
    // Write the cycle directly into the store; load must refuse it.
    store.put(&Path::parse("projects/a").unwrap(), record(Some("b"), None));
    store.put(&Path::parse("projects/b").unwrap(), record(Some("a"), None));

    assert!(matches!(
        manager.load("projects", "a"),
        Err(Error::CycleOrDepth(CycleOrDepthError::CycleDetected { .. }))
    ));
}

#[test]
fn test_depth_bound() {
    let mut settings = settings();
    settings.engine.max_chain_depth = 3;
    let (manager, _) = manager_with(settings);

    manager.store("projects", "t0", &record(None, None)).unwrap();
    manager.store("projects", "t1", &record(Some("t0"), None)).unwrap();
    manager.store("projects", "t2", &record(Some("t1"), None)).unwrap();

    match manager.store("projects", "t3", &record(Some("t2"), None)) {
        Err(Error::CycleOrDepth(CycleOrDepthError::DepthExceeded { max, .. })) => {
            assert_eq!(3, max)
        }
        other => panic!("expected DepthExceeded, got {:?}", other),
    }
}

#[test]
fn test_store_validates_schema() {
    let (manager, _) = manager();
    let mut bad = Record::new("projectConfig");
    bad.put("bogus", Value::Scalar("x".to_string()));

    assert!(matches!(
        manager.store("projects", "acme", &bad),
        Err(Error::Validation(ValidationError::UnknownField { .. }))
    ));
}

#[test]
fn test_templated_scope_guard() {
    let (manager, _) = manager();

    assert!(matches!(
        manager.load("settings", "global"),
        Err(Error::Validation(ValidationError::NotTemplated(_)))
    ));
    assert!(matches!(
        manager.load("unknown", "global"),
        Err(Error::NotFound(NotFoundError::Scope(_)))
    ));
}

#[test]
fn test_children_and_descendants_order() {
    let (manager, _) = manager();
    manager.store("projects", "root", &record(None, None)).unwrap();
    manager.store("projects", "mid-a", &record(Some("root"), None)).unwrap();
    manager.store("projects", "mid-b", &record(Some("root"), None)).unwrap();
    manager.store("projects", "leaf", &record(Some("mid-a"), None)).unwrap();

    assert_eq!(
        vec!["mid-a".to_string(), "mid-b".to_string()],
        manager.children_of("projects", "root").unwrap()
    );
    // Breadth first, root to leaf.
    assert_eq!(
        vec!["mid-a".to_string(), "mid-b".to_string(), "leaf".to_string()],
        manager.descendants("projects", "root").unwrap()
    );
}

#[test]
fn test_delete_reparents_children() {
    let (manager, _) = manager();
    manager.store("projects", "root", &record(None, Some("http://root"))).unwrap();
    manager.store("projects", "mid", &record(Some("root"), None)).unwrap();
    manager.store("projects", "leaf", &record(Some("mid"), None)).unwrap();

    let reparented = manager.delete("projects", "mid").unwrap();
    assert_eq!(vec!["leaf".to_string()], reparented);

    let template = manager.load("projects", "leaf").unwrap();
    assert_eq!(vec!["root", "leaf"], template.chain_ids());
    assert_eq!(
        Some("http://root"),
        template.effective("url").and_then(Value::as_scalar)
    );
}

#[test]
fn test_delete_root_clears_child_parent_links() {
    let (manager, _) = manager();
    manager.store("projects", "root", &record(None, None)).unwrap();
    manager.store("projects", "child", &record(Some("root"), None)).unwrap();

    manager.delete("projects", "root").unwrap();

    let template = manager.load("projects", "child").unwrap();
    assert_eq!(vec!["child"], template.chain_ids());
    assert!(template.record().parent_id().is_none());
}

#[test]
fn test_delete_restrict_policy() {
    let mut settings = settings();
    settings.engine.delete_policy = DeletePolicy::Restrict;
    let (manager, _) = manager_with(settings);

    manager.store("projects", "root", &record(None, None)).unwrap();
    manager.store("projects", "child", &record(Some("root"), None)).unwrap();

    match manager.delete("projects", "root") {
        Err(Error::Validation(ValidationError::DeleteRestricted { children, .. })) => {
            assert_eq!(1, children)
        }
        other => panic!("expected DeleteRestricted, got {:?}", other),
    }

    // Leaves delete fine.
    assert!(manager.delete("projects", "child").unwrap().is_empty());
}

#[test]
fn test_children_of_filters_by_parent_link() {
    let mut store = MockRecordStore::new();
    store
        .expect_children()
        .withf(|path| path.to_string() == "projects")
        .return_once(|_| {
            vec![
                Path::parse("projects/a").unwrap(),
                Path::parse("projects/b").unwrap(),
            ]
        });
    store.expect_get().returning(|path| {
        if path.base_name() == "a" {
            Some(record(Some("root"), None))
        } else {
            Some(record(None, None))
        }
    });

    let manager = TemplateManager::new(Arc::new(settings()), Arc::new(store), registry());
    assert_eq!(
        vec!["a".to_string()],
        manager.children_of("projects", "root").unwrap()
    );
}

#[test]
fn test_delete_is_idempotent() {
    let (manager, _) = manager();
    manager.store("projects", "acme", &record(None, None)).unwrap();

    assert!(manager.delete("projects", "acme").unwrap().is_empty());
    assert!(manager.delete("projects", "acme").unwrap().is_empty());
}
