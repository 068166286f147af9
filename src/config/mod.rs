//! Configuration management for appdock.
//!
//! Two things are configurable: where apps live, and how remote sources are
//! reached. Both come from one TOML file ([`AppsConfig`]) and can be
//! overridden per invocation.
//!
//! # Configuration Priority
//!
//! The apps root is taken from, in order:
//!
//! 1. The `--apps-root` flag
//! 2. The `APPDOCK_APPS_ROOT` environment variable
//! 3. `apps_root` in the config file
//! 4. `~/.appdock/apps`
//!
//! The config file itself is found via `--config`, then `APPDOCK_CONFIG`, then
//! the platform default (see [`AppsConfig::default_path`]).
//!
//! # Examples
//!
//! ```rust,no_run
//! use appdock::config::{Overrides, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::resolve(&Overrides::default(), |key| std::env::var(key).ok()).await?;
//! println!("apps root: {}", settings.apps_root.path().display());
//! # Ok(())
//! # }
//! ```

mod global;

pub use global::{AppsConfig, WebAuth};

use crate::constants::{APPS_ROOT_ENV, CONFIG_PATH_ENV};
use crate::core::AppsRoot;
use crate::utils::platform::resolve_path;
use anyhow::Result;
use std::path::PathBuf;

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--apps-root`
    pub apps_root: Option<PathBuf>,
    /// `--config`
    pub config_path: Option<PathBuf>,
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Loaded config file (or defaults)
    pub config: AppsConfig,
    /// Effective apps root
    pub apps_root: AppsRoot,
}

impl Settings {
    /// Loads the config file and applies overrides.
    ///
    /// `env` looks up environment variables; tests pass a closure instead of
    /// touching the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or a
    /// path cannot be expanded.
    pub async fn resolve<F>(overrides: &Overrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = match (&overrides.config_path, env(CONFIG_PATH_ENV)) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(path)) if !path.is_empty() => Some(resolve_path(&path)?),
            _ => None,
        };
        let config = AppsConfig::load_with_optional(config_path).await?;

        let root = match (&overrides.apps_root, env(APPS_ROOT_ENV)) {
            (Some(root), _) => root.clone(),
            (None, Some(root)) if !root.is_empty() => resolve_path(&root)?,
            _ => config.apps_root_path()?,
        };
        tracing::debug!(apps_root = %root.display(), "Resolved apps root");

        let apps_root = AppsRoot::new(root, config.manifest_extension.clone());
        Ok(Self {
            config,
            apps_root,
        })
    }
}
