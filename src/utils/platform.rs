//! Platform helpers for home directories, path expansion and path rendering.
//!
//! Configured paths may use `~/` and `$VAR` (or `${VAR}`); both are expanded
//! with `shellexpand` before use. Relative paths inside an app are always
//! reported with `/` separators regardless of platform.

use crate::core::AppError;
use std::path::{Path, PathBuf};

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the home directory of the current user.
///
/// # Errors
///
/// Returns [`AppError::Other`] when the home directory cannot be determined
/// (`HOME` unset on Unix, `USERPROFILE` unset on Windows).
pub fn get_home_dir() -> Result<PathBuf, AppError> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        AppError::Other {
            message: format!("Could not determine home directory.\n\n{platform_help}"),
        }
    })
}

/// Expands `~` and environment variables in a configured path.
///
/// ```rust,no_run
/// use appdock::utils::platform::resolve_path;
///
/// # fn example() -> Result<(), appdock::core::AppError> {
/// let apps = resolve_path("~/.appdock/apps")?;
/// assert!(apps.is_absolute());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`AppError::InvalidLocator`] when a referenced variable is unset.
pub fn resolve_path(path: &str) -> Result<PathBuf, AppError> {
    let expanded = shellexpand::full(path)
        .map_err(|e| AppError::locator(path, format!("Failed to expand path '{path}': {e}")))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Renders a relative path with forward slashes.
#[must_use]
pub fn normalize_path_separator(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
