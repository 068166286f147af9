//! Safety checks over a complete archive listing.
//!
//! The check runs over every entry before the first byte is written. A single
//! bad entry rejects the whole archive.

use super::{ArchiveEntry, EntryKind};
use crate::core::AppError;
use crate::utils::path_validation::is_unsafe_entry_path;

/// Rejects the archive if any entry could land outside the staging directory.
///
/// An entry is rejected when its path is absolute, contains a segment that
/// begins with `.` (including `..`), or when it is a symbolic link, hard link
/// or special file.
///
/// # Errors
///
/// Returns [`AppError::UnsafeArchivePath`] naming the first offending entry.
pub fn check_entries(entries: &[ArchiveEntry]) -> Result<(), AppError> {
    for entry in entries {
        let unsafe_kind = matches!(entry.kind, EntryKind::Link | EntryKind::Special);
        if unsafe_kind || is_unsafe_entry_path(&entry.path) {
            return Err(AppError::UnsafeArchivePath {
                path: entry.path.clone(),
            });
        }
    }
    Ok(())
}

/// Top-level directory of the first entry, which names the app.
#[must_use]
pub fn top_level_name(entries: &[ArchiveEntry]) -> Option<&str> {
    entries
        .first()
        .and_then(|entry| entry.path.split(['/', '\\']).next())
        .filter(|name| !name.is_empty())
}
