//! Lock manager behaviour against discovered plugin trees.

use std::fs;

use envkit_lock::{Error, LockManager, LockStatus, verify_integrity};
use envkit_plugins::PluginRegistry;
use envkit_test_utils::{PluginSpec, write_manifest, write_plugin_tree};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

const TREE: &[PluginSpec<'static>] = &[
    PluginSpec {
        key: "core/base",
        version: "1.0.0",
        dependencies: &[],
    },
    PluginSpec {
        key: "core/shell",
        version: "0.3.0",
        dependencies: &["core/base"],
    },
    PluginSpec {
        key: "myorg/git",
        version: "2.1.0",
        dependencies: &["core/base", "core/shell"],
    },
];

struct Project {
    _temp: TempDir,
    plugins: std::path::PathBuf,
    manager: LockManager,
}

fn project() -> Project {
    let temp = TempDir::new().unwrap();
    let plugins = temp.path().join("plugins");
    write_plugin_tree(&plugins, TREE);
    let manager = LockManager::new(temp.path().join("envkit.lock"));
    Project {
        _temp: temp,
        plugins,
        manager,
    }
}

fn discover(root: &std::path::Path) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.discover(root).unwrap();
    registry
}

#[test]
fn lockfile_holds_the_resolved_closure() {
    let project = project();
    let registry = discover(&project.plugins);

    let lockfile = project.manager.generate(&registry, &["myorg/git"]).unwrap();

    let keys: Vec<&str> = lockfile.plugins.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["core/base", "core/shell", "myorg/git"]);
    assert_eq!(lockfile.version, "1.0");
    assert_eq!(lockfile.plugins["myorg/git"].version, "2.1.0");
    assert_eq!(lockfile.plugins["myorg/git"].sha.len(), 64);
    assert_eq!(lockfile.metadata.content_hash.len(), 64);
}

#[test]
fn content_hash_is_stable_across_generations() {
    let project = project();
    let registry = discover(&project.plugins);

    let first = project.manager.generate(&registry, &["myorg/git"]).unwrap();
    let second = project.manager.generate(&registry, &["myorg/git"]).unwrap();

    assert_eq!(first.metadata.content_hash, second.metadata.content_hash);
}

#[test]
fn content_hash_is_reproducible_across_checkouts() {
    let a = project();
    let b = project();

    let hash_a = a
        .manager
        .generate(&discover(&a.plugins), &["myorg/git"])
        .unwrap()
        .metadata
        .content_hash;
    let hash_b = b
        .manager
        .generate(&discover(&b.plugins), &["myorg/git"])
        .unwrap()
        .metadata
        .content_hash;

    assert_eq!(hash_a, hash_b);
}

#[rstest]
#[case::leaf("core/base")]
#[case::middle("core/shell")]
#[case::requested("myorg/git")]
fn version_bump_changes_content_hash(#[case] key: &str) {
    let project = project();
    let before = project
        .manager
        .generate(&discover(&project.plugins), &["myorg/git"])
        .unwrap();

    let spec = TREE.iter().find(|spec| spec.key == key).unwrap();
    write_manifest(
        &project.plugins,
        PluginSpec::new(key, "99.0.0", spec.dependencies),
    );
    let after = project
        .manager
        .generate(&discover(&project.plugins), &["myorg/git"])
        .unwrap();

    assert_ne!(before.metadata.content_hash, after.metadata.content_hash);
    assert_ne!(before.plugins[key].sha, after.plugins[key].sha);
}

#[test]
fn resolution_errors_propagate_unchanged() {
    let project = project();
    let registry = discover(&project.plugins);

    let err = project.manager.generate(&registry, &["myorg/ghost"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Plugins(envkit_plugins::Error::PluginNotFound { ref name, .. }) if name == "myorg/ghost"
    ));
}

#[test]
fn save_then_load_round_trips_and_verifies() {
    let project = project();
    let registry = discover(&project.plugins);
    let lockfile = project.manager.generate(&registry, &["myorg/git"]).unwrap();

    project.manager.save(&lockfile).unwrap();
    let loaded = project.manager.load().unwrap();

    assert_eq!(loaded, lockfile);
    verify_integrity(&loaded).unwrap();
}

#[test]
fn tampered_content_hash_fails_verification() {
    let project = project();
    let registry = discover(&project.plugins);
    let lockfile = project.manager.generate(&registry, &["myorg/git"]).unwrap();
    project.manager.save(&lockfile).unwrap();

    let path = project.manager.path().to_native();
    let text = fs::read_to_string(&path).unwrap();
    let forged = "f".repeat(64);
    fs::write(&path, text.replace(&lockfile.metadata.content_hash, &forged)).unwrap();

    let err = verify_integrity(&project.manager.load().unwrap()).unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, Error::Integrity { .. }));
    assert!(message.contains(&forged));
    assert!(message.contains(&lockfile.metadata.content_hash));
}

#[test]
fn missing_lockfile() {
    let project = project();
    assert!(!project.manager.exists());
    assert!(matches!(
        project.manager.load(),
        Err(Error::LockfileMissing { .. })
    ));
}

#[test]
fn corrupt_lockfile_is_a_parse_error() {
    let project = project();
    fs::write(project.manager.path().to_native(), "version = [broken").unwrap();

    assert!(matches!(
        project.manager.load(),
        Err(Error::LockfileParse { .. })
    ));
}

#[test]
fn staleness_lifecycle() {
    let project = project();
    let registry = discover(&project.plugins);

    assert!(!project.manager.is_up_to_date(&registry, &["myorg/git"]).unwrap());

    let lockfile = project.manager.generate(&registry, &["myorg/git"]).unwrap();
    project.manager.save(&lockfile).unwrap();
    assert!(project.manager.is_up_to_date(&registry, &["myorg/git"]).unwrap());

    write_manifest(&project.plugins, PluginSpec::new("core/shell", "0.4.0", &["core/base"]));
    let registry = discover(&project.plugins);
    assert!(!project.manager.is_up_to_date(&registry, &["myorg/git"]).unwrap());

    match project.manager.check(&registry, &["myorg/git"]).unwrap() {
        LockStatus::Stale(diff) => {
            assert_eq!(diff.changed, vec!["core/shell"]);
            assert!(diff.added.is_empty() && diff.removed.is_empty());
        }
        other => panic!("expected stale lockfile, got {other:?}"),
    }
}

#[test]
fn changing_the_active_set_makes_lockfile_stale() {
    let project = project();
    let registry = discover(&project.plugins);
    let lockfile = project.manager.generate(&registry, &["core/shell"]).unwrap();
    project.manager.save(&lockfile).unwrap();

    match project.manager.check(&registry, &["myorg/git"]).unwrap() {
        LockStatus::Stale(diff) => assert_eq!(diff.added, vec!["myorg/git"]),
        other => panic!("expected stale lockfile, got {other:?}"),
    }
}

#[test]
fn check_without_lockfile_is_missing() {
    let project = project();
    let registry = discover(&project.plugins);
    assert_eq!(
        project.manager.check(&registry, &["myorg/git"]).unwrap(),
        LockStatus::Missing
    );
}

#[test]
fn removed_plugin_is_a_structural_error() {
    let project = project();
    let registry = discover(&project.plugins);
    let lockfile = project.manager.generate(&registry, &["myorg/git"]).unwrap();
    project.manager.save(&lockfile).unwrap();

    fs::remove_dir_all(project.plugins.join("core/shell")).unwrap();
    let registry = discover(&project.plugins);

    let err = project
        .manager
        .is_up_to_date(&registry, &["myorg/git"])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Plugins(envkit_plugins::Error::PluginNotFound { ref name, .. }) if name == "core/shell"
    ));
}
