//! File system utilities for the apps root.
//!
//! Every helper here maps failures onto [`AppError::Io`] with the operation and
//! path that failed, so the installer can surface an actionable message without
//! re-wrapping.
//!
//! # Atomic writes
//!
//! [`atomic_write`] writes to a sibling `.tmp` file, syncs it, and renames it
//! over the destination. A reader never observes a half-written manifest.

use crate::core::AppError;
use crate::utils::platform::normalize_path_separator;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Ensures a directory exists, creating it and all parents if necessary.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the path exists but is not a directory, or if
/// creation fails.
pub fn ensure_dir(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(AppError::io(
                "create directory",
                path,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
            ));
        }
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| AppError::io("create directory", path, e))
}

/// Atomically writes bytes to a file by writing to a temporary file first.
///
/// Parent directories are created if they don't exist.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the temporary file cannot be written or synced,
/// or if the final rename fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| AppError::io("create temp file", &temp_path, e))?;
        file.write_all(content).map_err(|e| AppError::io("write temp file", &temp_path, e))?;
        file.sync_all().map_err(|e| AppError::io("sync temp file", &temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        AppError::io("rename temp file to", path, e)
    })
}

/// Writes bytes to a file, creating parent directories as needed.
///
/// Used inside staging directories, where atomicity comes from the final
/// directory rename rather than from each file.
///
/// # Errors
///
/// Returns [`AppError::Io`] on any write failure.
pub fn write_file(path: &Path, content: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, content).map_err(|e| AppError::io("write file", path, e))
}

/// Copies a single file, creating the destination's parent directories.
///
/// # Errors
///
/// Returns [`AppError::FileNotFound`] if the source is missing and
/// [`AppError::Io`] for any other failure.
pub fn copy_file(src: &Path, dst: &Path) -> Result<(), AppError> {
    if !src.is_file() {
        return Err(AppError::FileNotFound {
            what: "App file".to_string(),
            path: src.to_path_buf(),
        });
    }
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).map_err(|e| AppError::io("copy file to", dst, e))?;
    Ok(())
}

/// Recursively removes a directory. Missing directories are not an error.
///
/// # Errors
///
/// Returns [`AppError::Io`] if removal fails.
pub fn remove_dir_all(path: &Path) -> Result<(), AppError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::io("remove directory", path, e)),
    }
}

/// Renames a file or directory.
///
/// # Errors
///
/// Returns [`AppError::Io`] naming the source path if the rename fails.
pub fn rename(from: &Path, to: &Path) -> Result<(), AppError> {
    fs::rename(from, to).map_err(|e| AppError::io(format!("rename to {} from", to.display()), from, e))
}

/// Lists every regular file below `dir` as a `/`-separated relative path.
///
/// The result is sorted so listings are stable across platforms.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the directory cannot be walked.
pub fn list_relative_files(dir: &Path) -> Result<Vec<String>, AppError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            AppError::io("read directory", path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            files.push(normalize_path_separator(relative));
        }
    }
    files.sort();
    Ok(files)
}

/// Reads a file's modification time, if the file exists.
#[must_use]
pub fn modified_time(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).ok().filter(fs::Metadata::is_file).and_then(|m| m.modified().ok())
}

/// Joins a `/`-separated relative path onto a base directory.
#[must_use]
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative.split(['/', '\\']).fold(base.to_path_buf(), |acc, segment| acc.join(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, "x").unwrap();
        assert!(matches!(ensure_dir(&file), Err(AppError::Io { .. })));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sub").join("clock.manifest");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert!(!temp.path().join("sub").join("clock.manifest.tmp").exists());
    }

    #[test]
    fn test_remove_dir_all_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        remove_dir_all(&temp.path().join("nope")).unwrap();
    }

    #[test]
    fn test_list_relative_files_sorted() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("z.js"), b"").unwrap();
        write_file(&temp.path().join("lib").join("a.js"), b"").unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();

        let files = list_relative_files(temp.path()).unwrap();
        assert_eq!(files, vec!["lib/a.js".to_string(), "z.js".to_string()]);
    }

    #[test]
    fn test_copy_file_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = copy_file(&temp.path().join("nope"), &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, AppError::FileNotFound { .. }));
    }

    #[test]
    fn test_join_relative() {
        let joined = join_relative(Path::new("/apps/_clock"), "lib/a.js");
        assert_eq!(joined, Path::new("/apps/_clock").join("lib").join("a.js"));
    }
}
