//! End-to-end flow over a project directory.
//!
//! A project holds an `envkit.toml` with the active plugins, lockfile and
//! orchestrator settings and the service definitions, plus a `plugins/` tree.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use envkit_lock::{LockConfig, LockManager, LockStatus, verify_integrity};
use envkit_plugins::PluginRegistry;
use envkit_services::{
    CancellationToken, Orchestrator, OrchestratorConfig, ServiceDefinitions, ServiceStatus,
};
use envkit_test_utils::{PluginSpec, ProviderCall, RecordingProvider, ScriptedProbe, write_manifest, write_plugin_tree};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use tempfile::TempDir;

const PROJECT_CONFIG: &str = r#"
active = ["myorg/git"]

[lock]
path = "locks/envkit.lock"
generator = "integration"

[orchestrator]
health_interval_ms = 20
probe_timeout_ms = 200

[services.db]
command = "postgres -D /data"
port = 5432

[services.api]
command = "api --listen 8080"
port = 8080
dependsOn = ["db"]

[services.worker]
command = "worker"
depends_on = ["db", "api"]
"#;

#[derive(Debug, Deserialize)]
struct ActivePlugins {
    active: Vec<String>,
}

struct Project {
    temp: TempDir,
}

impl Project {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("envkit.toml"), PROJECT_CONFIG).unwrap();
        write_plugin_tree(
            &temp.path().join("plugins"),
            &[
                PluginSpec::new("core/base", "1.0.0", &[]),
                PluginSpec::new("core/shell", "0.3.0", &["core/base"]),
                PluginSpec::new("myorg/git", "2.1.0", &["core/base", "core/shell"]),
                PluginSpec::new("myorg/unused", "0.0.1", &[]),
            ],
        );
        Self { temp }
    }

    fn config_path(&self) -> PathBuf {
        self.temp.path().join("envkit.toml")
    }

    fn active(&self) -> Vec<String> {
        let document: ActivePlugins =
            toml::from_str(&fs::read_to_string(self.config_path()).unwrap()).unwrap();
        document.active
    }

    fn registry(&self) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.discover(self.temp.path().join("plugins")).unwrap();
        registry
    }

    fn lock_manager(&self) -> LockManager {
        LockManager::from_config(self.temp.path(), &LockConfig::load(self.config_path()).unwrap())
    }
}

#[test]
fn lock_cycle_from_project_config() {
    let project = Project::new();
    let active = project.active();
    let registry = project.registry();
    let manager = project.lock_manager();

    assert_eq!(manager.check(&registry, &active).unwrap(), LockStatus::Missing);

    let lockfile = manager.generate(&registry, &active).unwrap();
    assert_eq!(
        lockfile.plugins.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["core/base", "core/shell", "myorg/git"]
    );
    assert_eq!(lockfile.metadata.generator, "integration");

    manager.save(&lockfile).unwrap();
    assert!(project.temp.path().join("locks/envkit.lock").is_file());

    let loaded = manager.load().unwrap();
    verify_integrity(&loaded).unwrap();
    assert_eq!(loaded.metadata.content_hash, lockfile.metadata.content_hash);
    assert!(manager.is_up_to_date(&registry, &active).unwrap());
}

#[test]
fn editing_a_locked_manifest_makes_the_lock_stale() {
    let project = Project::new();
    let active = project.active();
    let manager = project.lock_manager();
    let lockfile = manager.generate(&project.registry(), &active).unwrap();
    manager.save(&lockfile).unwrap();

    write_manifest(
        &project.temp.path().join("plugins"),
        PluginSpec::new("core/shell", "0.4.0", &["core/base"]),
    );
    let registry = project.registry();

    match manager.check(&registry, &active).unwrap() {
        LockStatus::Stale(diff) => {
            assert_eq!(diff.changed, vec!["core/shell".to_string()]);
            assert!(diff.added.is_empty());
            assert!(diff.removed.is_empty());
        }
        other => panic!("expected a stale lockfile, got {other:?}"),
    }
}

#[test]
fn editing_an_unlocked_manifest_keeps_the_lock_current() {
    let project = Project::new();
    let active = project.active();
    let manager = project.lock_manager();
    manager
        .save(&manager.generate(&project.registry(), &active).unwrap())
        .unwrap();

    write_manifest(
        &project.temp.path().join("plugins"),
        PluginSpec::new("myorg/unused", "9.9.9", &[]),
    );

    assert!(manager.is_up_to_date(&project.registry(), &active).unwrap());
}

#[tokio::test]
async fn services_from_project_config_start_in_order() {
    let project = Project::new();
    let services = ServiceDefinitions::load(project.config_path()).unwrap().into_services();
    assert_eq!(services["api"].depends_on, vec!["db"]);

    let provider = Arc::new(RecordingProvider::new().with_create_delay(Duration::from_millis(10)));
    let probe = Arc::new(ScriptedProbe::new());
    let orchestrator = Orchestrator::builder(provider.clone())
        .workspace(project.temp.path())
        .config(OrchestratorConfig::load(project.config_path()).unwrap())
        .probe(probe.clone())
        .build();
    let ctx = CancellationToken::new();

    orchestrator.start(&ctx, services).await.unwrap();

    let launched = |name: &str, command: &str| {
        provider
            .position(&ProviderCall::Exec {
                session: format!("service-{name}"),
                command: command.to_string(),
            })
            .unwrap()
    };
    let created = |name: &str| provider.position(&ProviderCall::Create(format!("service-{name}"))).unwrap();

    assert!(launched("db", "postgres -D /data") < created("api"));
    assert!(launched("api", "api --listen 8080") < created("worker"));

    let health = orchestrator.list_services().await;
    assert_eq!(
        health.iter().map(|h| h.name.as_str()).collect::<Vec<_>>(),
        vec!["api", "db", "worker"]
    );
    assert!(health.iter().all(|h| h.status == ServiceStatus::Running));
    assert_eq!(
        orchestrator.status("api").await.unwrap().url.as_deref(),
        Some("http://localhost:8080")
    );

    orchestrator.stop_all(&ctx).await.unwrap();
    for health in orchestrator.list_services().await {
        assert_eq!(health.status, ServiceStatus::Stopped, "{health:?}");
    }
    ctx.cancel();
}
