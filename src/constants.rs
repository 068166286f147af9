//! Global constants used throughout the appdock codebase.
//!
//! File names, naming conventions for the apps root layout, and the network
//! defaults shared by the source fetchers live here so the on-disk contract is
//! defined in exactly one place.

use std::time::Duration;

/// Extension of an app's manifest file when none is configured.
///
/// The manifest of app `clock` lives at `<apps_root>/clock/clock.manifest`.
pub const DEFAULT_MANIFEST_EXTENSION: &str = "manifest";

/// Name of the root-level marker that signals an install in progress.
pub const LOCK_FILE_NAME: &str = "install.lock";

/// Suffix of the per-app marker reserved for finer-grained locking.
pub const APP_LOCK_SUFFIX: &str = ".install.lock";

/// Prefix of the staging directory an app is assembled in before promotion.
pub const STAGING_PREFIX: &str = "_";

/// Suffix of the directory the previous version is parked in during an update.
///
/// The full name is `.<app>.previous`; the leading dot keeps it out of listings.
pub const BACKUP_SUFFIX: &str = ".previous";

/// Manifest key holding the URL later update checks are made against.
pub const META_URL_KEY: &str = "app-meta-url";

/// Placeholder a client puts in `files` for a manifest that does not exist yet.
pub const META_PLACEHOLDER: &str = "(Will be created)";

/// Listing note for a valid manifest that cannot be updated.
pub const NO_UPDATE_URL: &str = "No app Update URL";

/// Host whose URLs are routed to the GitHub content API.
pub const GITHUB_HOST: &str = "github.com";

/// Base of the GitHub content API.
pub const GITHUB_API_BASE: &str = "https://api.github.com/repos";

/// Branch that is addressed without an explicit `?ref=` query.
pub const GITHUB_DEFAULT_BRANCH: &str = "master";

/// Format of `If-Modified-Since` header values (RFC 7231 IMF-fixdate).
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Default timeout for a single HTTP request (30 seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default timeout for a single HTTP request as a [`Duration`].
pub fn default_http_timeout() -> Duration {
    Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
}

/// Default `User-Agent` sent with every request.
pub fn default_user_agent() -> String {
    format!("appdock/{}", env!("CARGO_PKG_VERSION"))
}

/// Environment variable overriding the apps root.
pub const APPS_ROOT_ENV: &str = "APPDOCK_APPS_ROOT";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "APPDOCK_CONFIG";
