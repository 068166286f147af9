use crate::common::TestEnvironment;
use appdock::test_utils::sample_app_tar;
use predicates::prelude::*;
use std::fs;

fn hold_lock(env: &TestEnvironment) {
    fs::create_dir_all(env.apps_root()).unwrap();
    fs::write(
        env.apps_root().join("install.lock"),
        r#"{"pid":4242,"created_at":"2024-01-01T00:00:00Z"}"#,
    )
    .unwrap();
}

#[test]
fn test_lock_status_free() {
    let env = TestEnvironment::new();
    let (ok, body) = env.json(&["lock", "status"]);
    assert!(ok);
    assert_eq!(body, serde_json::json!({"success": true}));
}

#[test]
fn test_lock_status_held() {
    let env = TestEnvironment::new();
    hold_lock(&env);

    let (ok, body) = env.json(&["lock", "status"]);
    assert!(ok, "a held lock is not an error");
    assert_eq!(body["wait"], true);
    assert_eq!(body["holder"]["pid"], 4242);

    env.appdock_command()
        .args(["lock", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pid 4242"));
}

#[test]
fn test_install_while_locked_is_busy() {
    let env = TestEnvironment::new();
    hold_lock(&env);
    let archive = sample_app_tar("clock", "1.0", "manifest").write_to(env.scratch(), "clock.tar");

    let (ok, body) = env.json(&["install", "local", archive.to_str().unwrap()]);
    assert!(ok);
    assert_eq!(body, serde_json::json!({"success": false, "wait": true}));
    assert!(!env.apps_root().join("clock").exists());
    // The other holder's marker is left alone
    assert!(env.apps_root().join("install.lock").exists());
}

#[test]
fn test_lock_clear_recovers() {
    let env = TestEnvironment::new();
    hold_lock(&env);
    let archive = sample_app_tar("clock", "1.0", "manifest").write_to(env.scratch(), "clock.tar");

    env.appdock_command()
        .args(["lock", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed install lock"));
    env.appdock_command().args(["install", "local"]).arg(&archive).assert().success();

    let (ok, body) = env.json(&["lock", "clear"]);
    assert!(ok);
    assert_eq!(body["removed"], false);
}

#[test]
fn test_stale_lock_reclaimed_with_ttl() {
    let env = TestEnvironment::new();
    hold_lock(&env);
    fs::write(env.scratch().join("config.toml"), "lock_ttl_secs = 60\n").unwrap();
    let archive = sample_app_tar("clock", "1.0", "manifest").write_to(env.scratch(), "clock.tar");

    env.appdock_command().args(["install", "local"]).arg(&archive).assert().success();
    assert!(env.app_file("clock", "app.js").is_file());
    assert!(!env.apps_root().join("install.lock").exists());
}
