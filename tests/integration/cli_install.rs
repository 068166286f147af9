use crate::common::TestEnvironment;
use appdock::test_utils::{TarBuilder, manifest_json, sample_app_tar, sample_app_zip};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_install_local_archive() {
    let env = TestEnvironment::new();
    let archive = sample_app_tar("clock", "1.0", "manifest").write_to(env.scratch(), "clock.tar");

    env.appdock_command()
        .args(["install", "local"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed"))
        .stdout(predicate::str::contains("clock"));

    assert!(env.app_file("clock", "clock.manifest").is_file());
    assert_eq!(fs::read_to_string(env.app_file("clock", "app.js")).unwrap(), "console.log('hello');\n");
    assert!(!env.apps_root().join("_clock").exists());
    assert!(!env.apps_root().join("install.lock").exists());
}

#[test]
fn test_second_install_conflicts() {
    let env = TestEnvironment::new();
    let archive = sample_app_zip("clock", "1.0", "manifest").write_to(env.scratch(), "clock.zip");

    env.appdock_command().args(["install", "local"]).arg(&archive).assert().success();
    env.appdock_command()
        .args(["install", "local"])
        .arg(&archive)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("'clock' app is already installed"))
        .stderr(predicate::str::contains("appdock update clock"));
}

#[test]
fn test_install_json_result() {
    let env = TestEnvironment::new();
    let archive = sample_app_tar("clock", "1.0", "manifest").write_to(env.scratch(), "clock.tar");

    let (ok, body) = env.json(&["install", "local", archive.to_str().unwrap()]);
    assert!(ok);
    assert_eq!(body, serde_json::json!({"success": true, "appName": "clock"}));

    let (ok, body) = env.json(&["install", "local", archive.to_str().unwrap()]);
    assert!(!ok);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "'clock' app is already installed");
}

#[test]
fn test_install_rejects_traversal() {
    let env = TestEnvironment::new();
    let archive = TarBuilder::new()
        .dir("clock/")
        .file("clock/../../escape.txt", b"pwned")
        .write_to(env.scratch(), "evil.tar");

    env.appdock_command()
        .args(["install", "local"])
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Archive contains invalid filename"));
    assert!(!env.scratch().join("escape.txt").exists());
    assert!(!env.apps_root().join("clock").exists());
}

#[test]
fn test_install_unsupported_file() {
    let env = TestEnvironment::new();
    let path = env.scratch().join("notes.txt");
    fs::write(&path, "just text").unwrap();

    env.appdock_command().args(["install", "local"]).arg(&path).assert().failure().code(1);
}

#[test]
fn test_install_from_manifest_file() {
    let env = TestEnvironment::new();
    let src = env.scratch().join("src");
    fs::create_dir_all(src.join("css")).unwrap();
    fs::write(src.join("clock.manifest"), manifest_json("clock", "2.1", &["clock.manifest", "css/site.css"]))
        .unwrap();
    fs::write(src.join("css").join("site.css"), "body {}").unwrap();

    env.appdock_command().args(["install", "local"]).arg(src.join("clock.manifest")).assert().success();
    assert_eq!(fs::read_to_string(env.app_file("clock", "css/site.css")).unwrap(), "body {}");
}

#[test]
fn test_install_payload_from_stdin() {
    let env = TestEnvironment::new();
    let encoded = STANDARD.encode(sample_app_tar("clock", "1.0", "manifest").into_gzip_bytes());

    env.appdock_command().args(["install", "payload", "-"]).write_stdin(encoded).assert().success();
    assert!(env.app_file("clock", "app.js").is_file());

    let leftovers: Vec<_> = fs::read_dir(env.apps_root())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != "clock")
        .collect();
    assert!(leftovers.is_empty(), "unexpected entries: {leftovers:?}");
}

#[test]
fn test_install_payload_invalid_base64() {
    let env = TestEnvironment::new();
    let path = env.scratch().join("payload.b64");
    fs::write(&path, "%%% not base64 %%%").unwrap();

    let (ok, body) = env.json(&["install", "payload", path.to_str().unwrap()]);
    assert!(!ok);
    assert!(body["error"].as_str().unwrap().contains("base64"));
}

#[test]
fn test_update_unknown_app() {
    let env = TestEnvironment::new();
    env.appdock_command()
        .args(["update", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("App 'ghost' is not installed"));
}

#[test]
fn test_update_without_meta_url() {
    let env = TestEnvironment::new();
    env.seed_app("clock", Some(r#"{"name":"clock","version":"1.0","files":["app.js"]}"#));

    let (ok, body) = env.json(&["update", "clock"]);
    assert!(!ok);
    assert_eq!(body["error"], "Cannot update 'clock', missing 'app-meta-url' from meta file");
}

#[test]
fn test_check_update_rejects_bad_url() {
    let env = TestEnvironment::new();
    let (ok, body) = env.json(&["check-update", "not a url", "--version", "1.0"]);
    assert!(!ok);
    assert_eq!(body["success"], false);

    env.appdock_command()
        .args(["check-update", "ftp://example.com/clock.manifest", "--version", "1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported URL scheme"));
}
