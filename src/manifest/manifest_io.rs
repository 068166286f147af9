//! Reading and writing manifest files.

use super::AppManifest;
use crate::core::AppError;
use crate::utils::fs::atomic_write;
use serde_json::Value;
use std::path::Path;

/// Reads a manifest file as a raw JSON document, without validating it.
///
/// Listings need the raw document to report manifests that fail validation.
///
/// # Errors
///
/// - [`AppError::FileNotFound`] if the file does not exist
/// - [`AppError::Io`] if it cannot be read
/// - [`AppError::InvalidManifest`] if it is not valid JSON
pub fn read_manifest_document(path: &Path) -> Result<Value, AppError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::FileNotFound {
                what: "App meta file".to_string(),
                path: path.to_path_buf(),
            }
        } else {
            AppError::io("read meta file", path, e)
        }
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Loads and validates a manifest file.
///
/// # Errors
///
/// Any error of [`read_manifest_document`] or [`AppManifest::from_value`].
pub fn load_manifest(path: &Path) -> Result<AppManifest, AppError> {
    AppManifest::from_value(read_manifest_document(path)?)
}

/// Writes a manifest atomically as indented JSON.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the write or rename fails.
pub fn write_manifest(path: &Path, manifest: &AppManifest) -> Result<(), AppError> {
    write_manifest_document(path, &manifest.to_value())
}

/// Writes a raw manifest document atomically as indented JSON.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the write or rename fails.
pub fn write_manifest_document(path: &Path, document: &Value) -> Result<(), AppError> {
    let mut json = serde_json::to_vec_pretty(document)?;
    json.push(b'\n');
    atomic_write(path, &json)
}
