use crate::common::TestEnvironment;
use predicates::prelude::*;
use serde_json::json;
use std::fs;

#[test]
fn test_list_empty_root() {
    let env = TestEnvironment::new();
    env.appdock_command().arg("list").assert().success().stdout(predicate::str::contains("No apps installed"));

    let (ok, body) = env.json(&["list"]);
    assert!(ok);
    assert_eq!(body, json!({"success": true, "appList": []}));
}

#[test]
fn test_list_reports_meta_problems() {
    let env = TestEnvironment::new();
    env.seed_app(
        "clock",
        Some(r#"{"name":"clock","version":"1.0","files":["app.js"],"app-meta-url":"http://x/clock/clock.manifest"}"#),
    );
    env.seed_app("notes", Some(r#"{"name":"notes","version":"1.0","files":[]}"#));
    env.seed_app("bare", None);
    fs::create_dir_all(env.apps_root().join("_staging")).unwrap();

    let (ok, body) = env.json(&["list"]);
    assert!(ok);
    let apps = body["appList"].as_array().unwrap();
    let names: Vec<&str> = apps.iter().map(|a| a["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["bare", "clock", "notes"]);
    assert_eq!(apps[0]["meta"], false);
    assert_eq!(apps[1]["meta"]["version"], "1.0");
    assert!(apps[1].get("meta-error").is_none());
    assert_eq!(apps[2]["meta-error"], "No app Update URL");

    env.appdock_command()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("clock"))
        .stdout(predicate::str::contains("No app Update URL"));
}

#[test]
fn test_files_lists_relative_paths() {
    let env = TestEnvironment::new();
    env.seed_app("clock", None);
    fs::create_dir_all(env.apps_root().join("clock").join("img")).unwrap();
    fs::write(env.app_file("clock", "img/face.png"), [0u8; 4]).unwrap();

    let (ok, body) = env.json(&["files", "clock"]);
    assert!(ok);
    assert_eq!(body["fileList"], json!(["app.js", "img/face.png"]));

    let (ok, body) = env.json(&["files", "ghost"]);
    assert!(!ok);
    assert_eq!(body["error"], "App 'ghost' is not installed");
}

#[test]
fn test_meta_get_synthesizes_missing_manifest() {
    let env = TestEnvironment::new();
    env.seed_app("clock", None);

    let (ok, body) = env.json(&["meta", "get", "clock"]);
    assert!(ok);
    assert_eq!(body["metaCreate"], true);
    assert_eq!(body["meta"], json!({"name": "clock", "files": ["app.js"]}));
}

#[test]
fn test_meta_save_then_get() {
    let env = TestEnvironment::new();
    env.seed_app("clock", None);
    let raw = r#"{"name":"clock","version":"1.0","files":["app.js","clock.manifest(Will be created)"],"author":"me"}"#;

    let (ok, body) = env.json(&["meta", "save", raw]);
    assert!(ok);
    assert_eq!(body["appName"], "clock");

    let (ok, body) = env.json(&["meta", "get", "clock"]);
    assert!(ok);
    assert!(body.get("metaCreate").is_none());
    assert_eq!(body["meta"]["files"], json!(["app.js", "clock.manifest"]));
    assert_eq!(body["meta"]["author"], "me");
}

#[test]
fn test_meta_save_from_file() {
    let env = TestEnvironment::new();
    env.seed_app("clock", None);
    let path = env.scratch().join("meta.json");
    fs::write(&path, r#"{"name":"clock","version":"3","files":["app.js"]}"#).unwrap();

    env.appdock_command()
        .args(["meta", "save", "--file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved meta file for 'clock'"));
    assert!(env.app_file("clock", "clock.manifest").is_file());
}

#[test]
fn test_meta_save_missing_field() {
    let env = TestEnvironment::new();
    env.seed_app("clock", None);

    let (ok, body) = env.json(&["meta", "save", r#"{"name":"clock","files":[]}"#]);
    assert!(!ok);
    assert_eq!(
        body["metaError"],
        json!({"error": "meta file missing mandatory field 'version'", "name": "version"})
    );
    assert!(!env.app_file("clock", "clock.manifest").exists());
}
