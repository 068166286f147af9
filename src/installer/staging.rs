//! Assembling an app in its staging directory and promoting it into place.

use crate::core::AppError;
use crate::manifest::{AppManifest, write_manifest};
use crate::source::AppSource;
use crate::utils::fs::{ensure_dir, join_relative, remove_dir_all, rename, write_file};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Creates `staging` and one directory per unique parent of `files`.
///
/// # Errors
///
/// Returns [`AppError::Io`] if a directory cannot be created.
pub fn create_app_dirs<'a>(staging: &Path, files: impl IntoIterator<Item = &'a str>) -> Result<(), AppError> {
    ensure_dir(staging)?;
    let parents: BTreeSet<PathBuf> = files
        .into_iter()
        .filter_map(|file| join_relative(staging, file).parent().map(Path::to_path_buf))
        .filter(|parent| parent.as_path() != staging)
        .collect();
    for parent in parents {
        ensure_dir(&parent)?;
    }
    Ok(())
}

/// Writes `manifest` and every file it lists into `staging`.
///
/// Files are fetched relative to `locator`, the place the manifest itself
/// was fetched from. The manifest goes first, so an interrupted attempt leaves a recognizable
/// staging directory. The manifest's own entry in `files` is never fetched.
///
/// # Errors
///
/// Returns the first fetch or write error; files written so far are left for
/// the caller to clean up with the staging directory.
pub async fn stage_from_source(
    source: &dyn AppSource,
    locator: &str,
    manifest: &AppManifest,
    staging: &Path,
    manifest_file_name: &str,
) -> Result<(), AppError> {
    create_app_dirs(staging, manifest.files.iter().map(String::as_str))?;
    write_manifest(&staging.join(manifest_file_name), manifest)?;

    for file in manifest.payload_files(manifest_file_name) {
        debug!(app = %manifest.name, file, source = %source.kind(), "Staging file");
        let bytes = source.fetch_file(locator, file).await?;
        write_file(&join_relative(staging, file), &bytes)?;
    }
    Ok(())
}

/// Renames a staged app to its final directory.
///
/// # Errors
///
/// - [`AppError::AlreadyInstalled`] if `target` exists
/// - [`AppError::Io`] if the rename fails
pub fn promote_fresh(staged: &Path, target: &Path, app_name: &str) -> Result<(), AppError> {
    if target.exists() {
        return Err(AppError::AlreadyInstalled {
            name: app_name.to_string(),
        });
    }
    rename(staged, target)?;
    debug!(from = %staged.display(), to = %target.display(), "Promoted app");
    Ok(())
}

/// Replaces an installed app with a staged one.
///
/// The installed directory is parked at `backup`, the staged one renamed into
/// place, and only then is the backup deleted. If the second rename fails the
/// backup is moved back, so the installed version survives.
///
/// # Errors
///
/// Returns [`AppError::Io`] from the failed rename. Failing to delete the
/// backup afterwards is only logged.
pub fn promote_replace(staged: &Path, target: &Path, backup: &Path) -> Result<(), AppError> {
    if backup.exists() {
        debug!(path = %backup.display(), "Removing stale backup directory");
        remove_dir_all(backup)?;
    }

    rename(target, backup)?;
    if let Err(e) = rename(staged, target) {
        warn!(target = %target.display(), error = %e, "Promotion failed, restoring previous version");
        if let Err(restore) = rename(backup, target) {
            warn!(backup = %backup.display(), error = %restore, "Failed to restore previous version");
        }
        return Err(e);
    }

    if let Err(e) = remove_dir_all(backup) {
        warn!(path = %backup.display(), error = %e, "Failed to remove previous version");
    }
    debug!(from = %staged.display(), to = %target.display(), "Replaced app");
    Ok(())
}
