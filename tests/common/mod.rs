//! Shared helpers for the integration tests.
//!
//! Every test gets its own temporary apps root and an empty config path, so
//! the binary never sees the developer's real configuration.

// Allow dead code because these utilities are used across different test files
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated apps root plus scratch space for archives and manifests.
pub struct TestEnvironment {
    temp_dir: TempDir,
    apps_root: PathBuf,
}

impl TestEnvironment {
    /// Empty environment; the apps root is not created yet.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let apps_root = temp_dir.path().join("apps");
        Self {
            temp_dir,
            apps_root,
        }
    }

    /// The apps root passed to every command.
    pub fn apps_root(&self) -> &Path {
        &self.apps_root
    }

    /// Scratch directory outside the apps root.
    pub fn scratch(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `appdock --apps-root <root>` with the config redirected to a missing file.
    pub fn appdock_command(&self) -> Command {
        let mut cmd = Command::cargo_bin("appdock").expect("appdock binary");
        cmd.env("APPDOCK_CONFIG", self.temp_dir.path().join("config.toml"))
            .env_remove("APPDOCK_APPS_ROOT")
            .env_remove("RUST_LOG")
            .arg("--apps-root")
            .arg(&self.apps_root);
        cmd
    }

    /// Path of an installed app's file.
    pub fn app_file(&self, app: &str, file: &str) -> PathBuf {
        self.apps_root.join(app).join(file)
    }

    /// Writes an installed app directly, bypassing the installer.
    pub fn seed_app(&self, name: &str, manifest: Option<&str>) {
        let dir = self.apps_root.join(name);
        fs::create_dir_all(&dir).expect("create app dir");
        fs::write(dir.join("app.js"), "console.log('seeded');\n").expect("write app file");
        if let Some(manifest) = manifest {
            fs::write(dir.join(format!("{name}.manifest")), manifest).expect("write manifest");
        }
    }

    /// Runs a command with `--json` and parses its stdout.
    pub fn json(&self, args: &[&str]) -> (bool, serde_json::Value) {
        let output = self.appdock_command().arg("--json").args(args).output().expect("run appdock");
        let body = serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
            panic!(
                "stdout is not JSON ({e}): {}\nstderr: {}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        });
        (output.status.success(), body)
    }
}
