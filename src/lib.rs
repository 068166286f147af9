//! appdock - an installer and updater for self-contained apps
//!
//! appdock manages a single directory of apps (the *apps root*). Each app is a
//! directory named after it, holding a JSON manifest `<app>/<app>.<ext>` plus
//! the files that manifest lists. Apps can be installed from local archives or
//! manifest files, from base64 payloads, from GitHub, or from any web server,
//! and are later updated from the URL recorded in their manifest.
//!
//! # Architecture Overview
//!
//! - Every install or update is one attempt owned by an
//!   [`installer::InstallSession`]: it holds a filesystem lock, assembles the
//!   app in an `_<app>` staging directory, and only then renames it into
//!   place. Dropping a failed attempt removes everything it created.
//! - Manifests are validated at the boundary into an
//!   [`manifest::AppManifest`]; nothing downstream handles untyped JSON.
//! - Remote sources sit behind the [`source::AppSource`] trait, so the
//!   orchestrator is written once for GitHub, web servers and local
//!   directories.
//!
//! # Core Modules
//!
//! - [`archive`] - Safe tar, tar.gz and zip extraction into staging
//! - [`cli`] - Command-line interface
//! - [`config`] - Config file and per-invocation overrides
//! - [`core`] - Error types and the apps root layout
//! - [`installer`] - Install, update, inventory and the install lock
//! - [`manifest`] - Manifest validation and I/O
//! - [`models`] - JSON result objects
//! - [`source`] - Manifest and file fetchers
//! - [`utils`] - Filesystem and path helpers
//! - [`version`] - Dotted version comparison
//!
//! # Example
//!
//! ```rust,no_run
//! use appdock::config::{Overrides, Settings};
//! use appdock::installer::{AppManager, UpdateOutcome};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::resolve(&Overrides::default(), |key| std::env::var(key).ok()).await?;
//! let manager = AppManager::from_settings(settings)?;
//!
//! for app in manager.list_apps()? {
//!     if let UpdateOutcome::Updated { version, .. } = manager.update(&app.name).await? {
//!         println!("{} -> {version}", app.name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod installer;
pub mod manifest;
pub mod models;
pub mod source;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
