//! End-to-end scenario: a templated project hierarchy served through the
//! transactional façade, from settings file to cascading mutations.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use stratum::EngineBuilder;
use stratum::EventKind;
use stratum::FieldKind;
use stratum::FieldSchema;
use stratum::Record;
use stratum::Settings;
use stratum::TypeRegistry;
use stratum::TypeSchema;
use stratum::Value;

fn registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    registry.register(
        TypeSchema::new("buildConfig")
            .with_field("command", FieldSchema::required(FieldKind::String))
            .with_field("timeout", FieldSchema::new(FieldKind::Int))
            .with_field("notify", FieldSchema::new(FieldKind::Bool)),
    );
    Arc::new(registry)
}

fn settings_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[engine]
max_chain_depth = 8
delete_policy = "reparent"

[[scopes]]
name = "projects"
templated = true

[[scopes]]
name = "agents"
templated = false
"#
    )
    .unwrap();
    file
}

#[test]
fn test_templated_hierarchy_end_to_end() {
    let file = settings_file();
    let settings = Settings::load(file.path().to_str()).unwrap();
    let engine = Arc::new(
        EngineBuilder::new(settings)
            .registry(registry())
            .build()
            .unwrap(),
    );

    // Organization-wide defaults, one team template, two concrete projects.
    let mut org = Record::new("buildConfig");
    org.mark_template();
    org.put("command", Value::Scalar("make all".to_string()));
    org.put("timeout", Value::Scalar("300".to_string()));
    engine.insert("projects/org", org).unwrap();

    let mut team = Record::new("buildConfig");
    team.mark_template();
    team.set_parent_id(Some("org"));
    team.put("timeout", Value::Scalar("600".to_string()));
    engine.insert("projects/team", team).unwrap();

    let mut web = Record::new("buildConfig");
    web.set_parent_id(Some("team"));
    engine.insert("projects/web", web).unwrap();

    let mut cli = Record::new("buildConfig");
    cli.set_parent_id(Some("team"));
    cli.put("command", Value::Scalar("cargo build".to_string()));
    engine.insert("projects/cli", cli).unwrap();

    // Resolution walks leaf to root: web inherits both levels, cli overrides
    // the command locally.
    let web_view = engine.resolve("projects/web").unwrap();
    assert_eq!(
        Some("make all"),
        web_view.get("command").and_then(Value::as_scalar)
    );
    assert_eq!(
        Some("600"),
        web_view.get("timeout").and_then(Value::as_scalar)
    );
    let cli_view = engine.resolve("projects/cli").unwrap();
    assert_eq!(
        Some("cargo build"),
        cli_view.get("command").and_then(Value::as_scalar)
    );

    // A cascading update from the root reaches web but not cli.
    let cascaded = Arc::new(Mutex::new(Vec::new()));
    let sink = cascaded.clone();
    engine.subscribe(EventKind::PostUpdate, move |event| {
        if event.cascaded {
            sink.lock().push(event.path.to_string());
        }
        Ok(())
    });

    engine
        .update("projects/org", "command", Value::Scalar("make release".to_string()))
        .unwrap();
    assert_eq!(
        vec!["projects/team".to_string(), "projects/web".to_string()],
        *cascaded.lock()
    );
    assert_eq!(
        Some("make release"),
        engine
            .resolve("projects/web")
            .unwrap()
            .get("command")
            .and_then(Value::as_scalar)
    );

    // Deleting the middle template reparents the leaves to the root.
    engine.delete("projects/team").unwrap();
    let web_chain = engine.resolve_template("projects/web").unwrap();
    assert_eq!(vec!["org", "web"], web_chain.chain_ids());
    assert_eq!(
        Some("make release"),
        engine
            .resolve("projects/web")
            .unwrap()
            .get("command")
            .and_then(Value::as_scalar)
    );

    // Plain scope records resolve straight from storage.
    let mut agent = Record::new("buildConfig");
    agent.put("command", Value::Scalar("run".to_string()));
    engine.insert("agents/linux", agent).unwrap();
    assert_eq!(
        Some("run"),
        engine
            .resolve("agents/linux")
            .unwrap()
            .get("command")
            .and_then(Value::as_scalar)
    );
}
