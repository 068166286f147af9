//! Path validation for untrusted names coming from archives and manifests.
//!
//! Archive entry names and manifest `files` entries are attacker-controlled.
//! Both are checked segment by segment before anything touches the disk: a
//! path is split on `/` and `\`, and it is rejected when its first segment is
//! empty (an absolute path) or when any segment begins with `.` (which covers
//! `..` traversal as well as hidden files).

/// Splits a path on both separator styles.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
}

/// Returns `true` if an archive entry name could escape the extraction root.
///
/// Trailing separators (directory entries such as `clock/`) are allowed.
///
/// ```rust,no_run
/// use appdock::utils::path_validation::is_unsafe_entry_path;
///
/// assert!(!is_unsafe_entry_path("clock/assets/"));
/// assert!(is_unsafe_entry_path("clock/../../etc/passwd"));
/// assert!(is_unsafe_entry_path("/etc/passwd"));
/// ```
#[must_use]
pub fn is_unsafe_entry_path(path: &str) -> bool {
    segments(path)
        .enumerate()
        .any(|(i, segment)| (i == 0 && segment.is_empty()) || segment.starts_with('.'))
}

/// Returns `true` if `path` is a safe relative file path inside an app.
///
/// Stricter than [`is_unsafe_entry_path`]: every segment must be non-empty, so
/// `a//b` and `dir/` are rejected as file paths.
#[must_use]
pub fn is_safe_relative_file(path: &str) -> bool {
    !path.is_empty()
        && !path.contains(':')
        && segments(path).all(|segment| !segment.is_empty() && !segment.starts_with('.'))
}

/// Returns `true` if `name` is usable as an app directory name.
///
/// An app name is a single non-empty path segment that does not begin with `.`
/// (hidden and backup directories) or `_` (staging directories).
#[must_use]
pub fn is_valid_app_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\', ':'])
        && !name.starts_with('.')
        && !name.starts_with('_')
}
