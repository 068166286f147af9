//! User configuration file for appdock.
//!
//! Settings live in a TOML file, by default:
//!
//! - **Unix/macOS**: `~/.appdock/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\appdock\config.toml`
//!
//! A missing file is not an error; every key has a default. The file may hold
//! credentials (`github_token`, `web_auth`), so it is written with owner-only
//! permissions on Unix.
//!
//! # File Format
//!
//! ```toml
//! apps_root = "~/apps"
//! manifest_extension = "manifest"
//! github_token = "ghp_xxxxxxxxxxxx"
//! lock_ttl_secs = 600
//! http_timeout_secs = 30
//! user_agent = "appdock/0.1"
//!
//! [web_auth]
//! username = "deploy"
//! password = "secret"
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use appdock::config::AppsConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppsConfig::load().await?;
//! println!("Installing into {}", config.apps_root_path()?.display());
//! # Ok(())
//! # }
//! ```

use crate::constants::{DEFAULT_MANIFEST_EXTENSION, default_http_timeout, default_user_agent};
use crate::utils::platform::{get_home_dir, resolve_path};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

fn default_manifest_extension() -> String {
    DEFAULT_MANIFEST_EXTENSION.to_string()
}

fn is_default_manifest_extension(ext: &String) -> bool {
    ext == DEFAULT_MANIFEST_EXTENSION
}

/// Credentials sent as HTTP basic auth to web-server sources.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAuth {
    /// Basic-auth user name
    pub username: String,
    /// Basic-auth password
    pub password: String,
}

impl fmt::Debug for WebAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Settings shared by every command.
///
/// # Examples
///
/// ```rust,no_run
/// use appdock::config::AppsConfig;
///
/// let config: AppsConfig = toml::from_str("lock_ttl_secs = 600").unwrap();
/// assert_eq!(config.lock_ttl().map(|d| d.as_secs()), Some(600));
/// assert_eq!(config.manifest_extension, "manifest");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppsConfig {
    /// Directory apps are installed into; `~` and `$VAR` are expanded.
    ///
    /// Defaults to `~/.appdock/apps`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps_root: Option<String>,

    /// Extension of each app's manifest file, without the dot.
    #[serde(
        default = "default_manifest_extension",
        skip_serializing_if = "is_default_manifest_extension"
    )]
    pub manifest_extension: String,

    /// Token sent as `Authorization: token <t>` to the GitHub API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Basic-auth credentials for web-server sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_auth: Option<WebAuth>,

    /// Age after which an install lock is considered abandoned.
    ///
    /// Unset means a stale lock stays until `appdock lock clear`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_ttl_secs: Option<u64>,

    /// Per-request HTTP timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_timeout_secs: Option<u64>,

    /// `User-Agent` header override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            apps_root: None,
            manifest_extension: default_manifest_extension(),
            github_token: None,
            web_auth: None,
            lock_ttl_secs: None,
            http_timeout_secs: None,
            user_agent: None,
        }
    }
}

impl AppsConfig {
    /// Load the configuration from the default location.
    ///
    /// A missing file yields [`AppsConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, or the file
    /// exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML for
    /// this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        // Owner read/write only: the file may hold tokens
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or, on Windows, local data) directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    fn config_dir() -> Result<PathBuf> {
        if cfg!(target_os = "windows") {
            Ok(dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("appdock"))
        } else {
            Ok(get_home_dir()?.join(".appdock"))
        }
    }

    /// The configured apps root with `~` and variables expanded, or the
    /// default `~/.appdock/apps`.
    ///
    /// # Errors
    ///
    /// Returns an error if expansion fails or the home directory is unknown.
    pub fn apps_root_path(&self) -> Result<PathBuf> {
        match &self.apps_root {
            Some(root) => Ok(resolve_path(root)?),
            None => Ok(Self::config_dir()?.join("apps")),
        }
    }

    /// HTTP timeout per request.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout_secs.map_or_else(default_http_timeout, Duration::from_secs)
    }

    /// `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }

    /// Stale-lock lease, if configured.
    #[must_use]
    pub fn lock_ttl(&self) -> Option<Duration> {
        self.lock_ttl_secs.map(Duration::from_secs)
    }
}
