//! End-to-end flows through the public API: registry persistence across
//! store handles, and orchestrated runs with the real HTTP resolver
//! pointed at an unroutable remote.

use tempfile::TempDir;
use upkeep_core::update::{Orchestrator, RunOptions, Selection, UpdateOutcome};
use upkeep_core::{RegistryEntry, RegistryStore, UpkeepError};

fn entry(name: &str, root: &std::path::Path) -> RegistryEntry {
    RegistryEntry {
        name: name.to_string(),
        // Port 1 on loopback refuses connections immediately, so the
        // version fetch fails fast without real network access.
        repo_url: format!("http://127.0.0.1:1/example/{name}"),
        branch: "main".to_string(),
        install_dir: root.join(name).to_string_lossy().into_owned(),
        version_file: root.join(name).join("VERSION").to_string_lossy().into_owned(),
        install_cmd: String::new(),
    }
}

#[test]
fn registry_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry");

    {
        let store = RegistryStore::at(&path);
        store.add(&entry("toolA", dir.path())).unwrap();
        store.add(&entry("toolB", dir.path())).unwrap();
    }

    {
        let store = RegistryStore::at(&path);
        let names: Vec<_> = store.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["toolA", "toolB"]);

        store.remove("toolA").unwrap();
    }

    let store = RegistryStore::at(&path);
    let names: Vec<_> = store.list().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["toolB"]);
}

#[test]
fn reregistration_is_an_upsert_across_handles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("registry");

    let store = RegistryStore::at(&path);
    let mut e = entry("toolA", dir.path());
    store.add(&e).unwrap();

    e.branch = "release".to_string();
    RegistryStore::at(&path).add(&e).unwrap();

    let entries = RegistryStore::at(&path).list();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].branch, "release");
}

#[test]
fn unregister_absent_name_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::at(dir.path().join("registry"));
    store.add(&entry("toolA", dir.path())).unwrap();

    assert!(matches!(store.remove("ghost"), Err(UpkeepError::NotFound(_))));
    assert_eq!(store.list().len(), 1);
}

#[tokio::test]
async fn unreachable_remote_fails_project_but_not_loop() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::at(dir.path().join("registry"));

    for name in ["toolA", "toolB"] {
        let e = entry(name, dir.path());
        std::fs::create_dir_all(e.install_dir.clone()).unwrap();
        std::fs::write(e.version_file_path(), "1.0.0").unwrap();
        store.add(&e).unwrap();
    }

    let orchestrator = Orchestrator::new(store, RunOptions::default()).unwrap();
    let summary = orchestrator.run(&Selection::All).await.unwrap();

    // Both entries processed despite per-project failures.
    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.failed(), 2);
    assert!(!summary.succeeded());

    for result in &summary.results {
        assert_eq!(result.outcome, UpdateOutcome::Failed);
        assert_eq!(result.local_version, "1.0.0");
    }

    // Installed trees are untouched by failed fetches.
    for name in ["toolA", "toolB"] {
        let version_file = dir.path().join(name).join("VERSION");
        assert_eq!(std::fs::read_to_string(version_file).unwrap(), "1.0.0");
    }
}

#[tokio::test]
async fn remote_failure_beats_dry_run() {
    // Step order: version resolution happens before the dry-run check,
    // so an unreachable remote reports failed even in a dry run.
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::at(dir.path().join("registry"));
    store.add(&entry("toolA", dir.path())).unwrap();

    let options = RunOptions {
        dry_run: true,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(store, options).unwrap();
    let summary = orchestrator.run(&Selection::All).await.unwrap();

    assert_eq!(summary.failed(), 1);
    assert!(!summary.succeeded());
}

#[tokio::test]
async fn selecting_unknown_names_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let store = RegistryStore::at(dir.path().join("registry"));
    store.add(&entry("toolA", dir.path())).unwrap();

    let orchestrator = Orchestrator::new(store, RunOptions::default()).unwrap();
    let selection = Selection::Names(vec!["ghost".to_string(), "phantom".to_string()]);
    let summary = orchestrator.run(&selection).await.unwrap();

    assert!(summary.results.is_empty());
    assert!(summary.succeeded());
}
