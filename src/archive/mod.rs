//! Safe extraction of app archives into a staging directory.
//!
//! An app archive is a tar (optionally gzip-compressed) or zip file whose
//! entries live under a single top-level directory named after the app:
//!
//! ```text
//! clock/
//! clock/clock.manifest
//! clock/app.js
//! ```
//!
//! Extraction proceeds in a fixed order:
//!
//! 1. Detect the container format from its magic bytes (never the extension)
//! 2. List every entry; an archive with one entry or fewer is empty
//! 3. Reject the archive if any entry is unsafe ([`safety::check_entries`])
//! 4. Name the app after the first entry's top-level directory
//! 5. Extract everything into `<apps_root>/_<app>`
//!
//! Nothing is written before step 5, and if step 5 fails the staging directory
//! is removed again. Extraction is blocking work; async callers use
//! [`extract_async`], which runs it on tokio's blocking pool.

pub mod safety;

#[cfg(test)]
mod tests;

use crate::core::{AppError, AppsRoot};
use crate::utils::fs::{ensure_dir, join_relative, remove_dir_all};
use crate::utils::path_validation::is_valid_app_name;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const USTAR_MAGIC: &[u8] = b"ustar";
const USTAR_MAGIC_OFFSET: usize = 257;
const TAR_CHECKSUM_RANGE: std::ops::Range<usize> = 148..156;
const TAR_BLOCK: usize = 512;

/// Container format of an app archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// POSIX/GNU tar
    Tar,
    /// Gzip-compressed tar
    TarGz,
    /// Zip
    Zip,
}

/// What an archive entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic or hard link
    Link,
    /// Device node, FIFO or anything else that is not a file or directory
    Special,
}

/// One entry of an archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name exactly as stored in the archive
    pub path: String,
    /// Entry type
    pub kind: EntryKind,
}

/// Result of a successful extraction.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    /// Name of the archive's top-level directory
    pub app_name: String,
    /// The `_<app>` staging directory the archive was extracted into
    pub staging_dir: PathBuf,
}

impl ExtractedArchive {
    /// Directory holding the app's files inside the staging directory.
    #[must_use]
    pub fn app_dir(&self) -> PathBuf {
        self.staging_dir.join(&self.app_name)
    }
}

/// Detects the archive format by content.
///
/// # Errors
///
/// Returns [`AppError::UnsupportedFormat`] when the file is neither zip, tar,
/// nor gzip-compressed tar, and [`AppError::Io`] if it cannot be read.
///
/// A tar is recognized by the `ustar` magic or, for pre-POSIX (V7) archives,
/// by a first header whose checksum is valid.
pub fn detect_format(path: &Path) -> Result<ArchiveFormat, AppError> {
    let mut head = [0u8; TAR_BLOCK];
    let read = read_prefix(open(path)?, &mut head).map_err(|e| AppError::io("read archive", path, e))?;
    let head = &head[..read];

    if head.starts_with(ZIP_LOCAL_HEADER) || head.starts_with(ZIP_EMPTY_ARCHIVE) {
        return Ok(ArchiveFormat::Zip);
    }

    if head.starts_with(GZIP_MAGIC) {
        let mut inner = [0u8; TAR_BLOCK];
        // A gzip stream that fails to inflate is not an archive we support
        let read = read_prefix(GzDecoder::new(open(path)?), &mut inner).unwrap_or(0);
        if is_tar_header(&inner[..read]) {
            return Ok(ArchiveFormat::TarGz);
        }
        return Err(unsupported(path));
    }

    if is_tar_header(head) {
        return Ok(ArchiveFormat::Tar);
    }

    Err(unsupported(path))
}

/// Lists every entry of an archive in stored order.
///
/// # Errors
///
/// Returns [`AppError::Io`] (or [`AppError::Other`] for zip structure errors)
/// when the archive is corrupt.
pub fn list_entries(path: &Path, format: ArchiveFormat) -> Result<Vec<ArchiveEntry>, AppError> {
    match format {
        ArchiveFormat::Tar => list_tar(BufReader::new(open(path)?), path),
        ArchiveFormat::TarGz => list_tar(GzDecoder::new(BufReader::new(open(path)?)), path),
        ArchiveFormat::Zip => list_zip(path),
    }
}

/// Extracts an app archive into its staging directory under `apps_root`.
///
/// # Errors
///
/// - [`AppError::UnsupportedFormat`] for anything but tar, tar.gz or zip
/// - [`AppError::EmptyArchive`] when the archive has one entry or fewer
/// - [`AppError::UnsafeArchivePath`] when any entry could escape the staging directory
/// - [`AppError::InvalidManifest`] when the top-level directory is not a valid app name
/// - [`AppError::Io`] when extraction fails; the staging directory is removed first
pub fn extract(archive_path: &Path, apps_root: &AppsRoot) -> Result<ExtractedArchive, AppError> {
    let format = detect_format(archive_path)?;
    let entries = list_entries(archive_path, format)?;
    debug!(archive = %archive_path.display(), ?format, entries = entries.len(), "Listed archive");

    if entries.len() <= 1 {
        return Err(AppError::EmptyArchive {
            path: archive_path.to_path_buf(),
        });
    }

    safety::check_entries(&entries)?;

    let app_name = safety::top_level_name(&entries).unwrap_or_default().to_string();
    if !is_valid_app_name(&app_name) {
        return Err(AppError::InvalidManifest {
            reason: format!("archive top-level directory '{app_name}' is not a valid app name"),
        });
    }

    let staging_dir = apps_root.staging_dir(&app_name);
    if staging_dir.exists() {
        debug!(path = %staging_dir.display(), "Removing leftover staging directory");
        remove_dir_all(&staging_dir)?;
    }
    ensure_dir(&staging_dir)?;

    let unpacked = match format {
        ArchiveFormat::Tar => unpack_tar(BufReader::new(open(archive_path)?), archive_path, &staging_dir),
        ArchiveFormat::TarGz => {
            unpack_tar(GzDecoder::new(BufReader::new(open(archive_path)?)), archive_path, &staging_dir)
        }
        ArchiveFormat::Zip => unpack_zip(archive_path, &staging_dir),
    };

    if let Err(e) = unpacked {
        debug!(path = %staging_dir.display(), error = %e, "Extraction failed, removing staging directory");
        let _ = remove_dir_all(&staging_dir);
        return Err(e);
    }

    debug!(app = %app_name, path = %staging_dir.display(), "Extracted archive");
    Ok(ExtractedArchive {
        app_name,
        staging_dir,
    })
}

/// [`extract`] on tokio's blocking thread pool.
///
/// # Errors
///
/// Any error of [`extract`], or [`AppError::Other`] if the task panicked.
pub async fn extract_async(
    archive_path: PathBuf,
    apps_root: AppsRoot,
) -> Result<ExtractedArchive, AppError> {
    tokio::task::spawn_blocking(move || extract(&archive_path, &apps_root))
        .await
        .map_err(|e| AppError::Other {
            message: format!("Archive extraction task failed: {e}"),
        })?
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::FileNotFound {
                what: "Archive".to_string(),
                path: path.to_path_buf(),
            }
        } else {
            AppError::io("open archive", path, e)
        }
    })
}

fn unsupported(path: &Path) -> AppError {
    AppError::UnsupportedFormat {
        path: path.to_path_buf(),
    }
}

fn is_tar_header(block: &[u8]) -> bool {
    has_ustar_magic(block) || has_valid_checksum(block)
}

fn has_ustar_magic(block: &[u8]) -> bool {
    block.len() >= USTAR_MAGIC_OFFSET + USTAR_MAGIC.len()
        && &block[USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + USTAR_MAGIC.len()] == USTAR_MAGIC
}

/// The stored checksum is the byte sum of the header with the checksum field
/// itself counted as spaces. Some writers summed signed bytes.
fn has_valid_checksum(block: &[u8]) -> bool {
    if block.len() < TAR_BLOCK {
        return false;
    }
    let field = &block[TAR_CHECKSUM_RANGE];
    let digits = String::from_utf8_lossy(field);
    let Ok(stored) = u32::from_str_radix(digits.trim_matches(|c: char| c == '\0' || c == ' '), 8) else {
        return false;
    };

    let spaces = TAR_CHECKSUM_RANGE.len() as u32 * u32::from(b' ');
    let outside = |i: &usize| !TAR_CHECKSUM_RANGE.contains(i);
    let unsigned: u32 = block[..TAR_BLOCK]
        .iter()
        .enumerate()
        .filter(|(i, _)| outside(i))
        .map(|(_, b)| u32::from(*b))
        .sum::<u32>()
        + spaces;
    let signed: i64 = block[..TAR_BLOCK]
        .iter()
        .enumerate()
        .filter(|(i, _)| outside(i))
        .map(|(_, b)| i64::from(*b as i8))
        .sum::<i64>()
        + i64::from(spaces);
    stored == unsigned || i64::from(stored) == signed
}

/// Fills `buf` as far as the reader allows, returning the number of bytes read.
fn read_prefix<R: Read>(mut reader: R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn list_tar<R: Read>(reader: R, path: &Path) -> Result<Vec<ArchiveEntry>, AppError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|e| AppError::io("read archive", path, e))?;

    let mut listing = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::io("read archive", path, e))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_pax_global_extensions() {
            continue;
        }
        let kind = if entry_type.is_dir() {
            EntryKind::Directory
        } else if entry_type.is_symlink() || entry_type.is_hard_link() {
            EntryKind::Link
        } else if entry_type.is_file() || entry_type.is_contiguous() {
            EntryKind::File
        } else {
            EntryKind::Special
        };
        listing.push(ArchiveEntry {
            path: String::from_utf8_lossy(&entry.path_bytes()).into_owned(),
            kind,
        });
    }
    Ok(listing)
}

fn unpack_tar<R: Read>(reader: R, path: &Path, staging_dir: &Path) -> Result<(), AppError> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(false);
    archive.unpack(staging_dir).map_err(|e| AppError::io("extract archive", path, e))
}

fn zip_error(path: &Path, error: zip::result::ZipError) -> AppError {
    match error {
        zip::result::ZipError::Io(e) => AppError::io("read archive", path, e),
        other => AppError::Other {
            message: format!("Failed to read zip archive {}: {other}", path.display()),
        },
    }
}

fn is_symlink_mode(mode: Option<u32>) -> bool {
    const S_IFMT: u32 = 0o170_000;
    const S_IFLNK: u32 = 0o120_000;
    mode.is_some_and(|m| m & S_IFMT == S_IFLNK)
}

fn list_zip(path: &Path) -> Result<Vec<ArchiveEntry>, AppError> {
    let mut archive = zip::ZipArchive::new(BufReader::new(open(path)?)).map_err(|e| zip_error(path, e))?;

    let mut listing = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index_raw(i).map_err(|e| zip_error(path, e))?;
        let kind = if file.is_dir() {
            EntryKind::Directory
        } else if is_symlink_mode(file.unix_mode()) {
            EntryKind::Link
        } else {
            EntryKind::File
        };
        listing.push(ArchiveEntry {
            path: file.name().to_string(),
            kind,
        });
    }
    Ok(listing)
}

fn unpack_zip(path: &Path, staging_dir: &Path) -> Result<(), AppError> {
    let mut archive = zip::ZipArchive::new(BufReader::new(open(path)?)).map_err(|e| zip_error(path, e))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| zip_error(path, e))?;
        let target = join_relative(staging_dir, file.name().trim_end_matches(['/', '\\']));

        if file.is_dir() {
            ensure_dir(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        let mut out = File::create(&target).map_err(|e| AppError::io("create file", &target, e))?;
        std::io::copy(&mut file, &mut out).map_err(|e| AppError::io("extract file", &target, e))?;
    }
    Ok(())
}
