//! Read-side operations on the apps root: listing, file lists and manifest
//! editing. None of these take the install lock.

use crate::constants::{META_PLACEHOLDER, META_URL_KEY, NO_UPDATE_URL, STAGING_PREFIX};
use crate::core::{AppError, AppsRoot};
use crate::manifest::{AppManifest, check_required_fields, read_manifest_document, write_manifest};
use crate::utils::fs::list_relative_files;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use std::fs;
use tracing::debug;

/// One entry of the installed-apps listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppListing {
    /// Directory name of the app
    pub name: String,
    /// The manifest document, or `false` when it could not be read
    #[serde(serialize_with = "meta_or_false")]
    pub meta: Option<Value>,
    /// Why the manifest is unusable or cannot be updated
    #[serde(rename = "meta-error", skip_serializing_if = "Option::is_none")]
    pub meta_error: Option<String>,
}

fn meta_or_false<S: Serializer>(meta: &Option<Value>, serializer: S) -> Result<S::Ok, S::Error> {
    match meta {
        Some(value) => value.serialize(serializer),
        None => serializer.serialize_bool(false),
    }
}

/// A manifest as shown for editing.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaView {
    /// The manifest document
    pub meta: Value,
    /// `true` when no manifest exists and `meta` was synthesized
    pub created: bool,
}

/// Lists installed apps sorted by name.
///
/// Hidden (`.`) and staging (`_`) directories and plain files such as the
/// lock marker are skipped. A missing apps root lists as empty.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the apps root cannot be read.
pub fn list_apps(root: &AppsRoot) -> Result<Vec<AppListing>, AppError> {
    let entries = match fs::read_dir(root.path()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AppError::io("read apps root", root.path(), e)),
    };

    let mut apps = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::io("read apps root", root.path(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.starts_with(STAGING_PREFIX) || !entry.path().is_dir() {
            continue;
        }
        apps.push(describe_app(root, name));
    }

    apps.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(count = apps.len(), "Listed installed apps");
    Ok(apps)
}

fn describe_app(root: &AppsRoot, name: String) -> AppListing {
    let path = root.manifest_path(&name);
    if !path.is_file() {
        return AppListing {
            name,
            meta: None,
            meta_error: None,
        };
    }

    let document = match read_manifest_document(&path) {
        Ok(document) => document,
        Err(e) => {
            let meta_error = Some(format!("Failed to load meta file for '{name}' : {e}"));
            return AppListing {
                name,
                meta: None,
                meta_error,
            };
        }
    };

    let meta_error = match check_required_fields(&document) {
        Err(missing) => Some(AppError::from(missing).to_string()),
        Ok(()) if document.get(META_URL_KEY).is_none() => Some(NO_UPDATE_URL.to_string()),
        Ok(()) => None,
    };
    AppListing {
        name,
        meta: Some(document),
        meta_error,
    }
}

/// Every file of an installed app, `/`-separated and sorted.
///
/// # Errors
///
/// - [`AppError::AppNotFound`] if the app is not installed
/// - [`AppError::Io`] if the directory cannot be walked
pub fn file_list(root: &AppsRoot, name: &str) -> Result<Vec<String>, AppError> {
    require_installed(root, name)?;
    list_relative_files(&root.app_dir(name))
}

/// The manifest of an installed app, synthesized when absent.
///
/// # Errors
///
/// - [`AppError::AppNotFound`] if the app is not installed
/// - any load or validation error of an existing manifest
pub fn get_meta(root: &AppsRoot, name: &str) -> Result<MetaView, AppError> {
    require_installed(root, name)?;
    let path = root.manifest_path(name);
    if !path.is_file() {
        debug!(app = name, "No meta file, synthesizing one");
        return Ok(MetaView {
            meta: json!({ "name": name, "files": file_list(root, name)? }),
            created: true,
        });
    }

    let document = read_manifest_document(&path)?;
    check_required_fields(&document)?;
    Ok(MetaView {
        meta: document,
        created: false,
    })
}

/// Validates and stores an edited manifest, returning the app name.
///
/// The first `files` entry containing the `(Will be created)` placeholder is
/// replaced with the manifest's own file name.
///
/// # Errors
///
/// - [`AppError::InvalidManifest`] if `raw` is not JSON
/// - [`AppError::MissingField`] if a mandatory field is absent
/// - [`AppError::AppNotFound`] if the named app is not installed
/// - [`AppError::Io`] if the write fails
pub fn save_meta(root: &AppsRoot, raw: &str) -> Result<String, AppError> {
    let mut document: Value = serde_json::from_str(raw)?;
    check_required_fields(&document)?;

    let name = document.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let manifest_file = root.manifest_file_name(&name);
    if let Some(files) = document.get_mut("files").and_then(Value::as_array_mut) {
        let placeholder = files
            .iter_mut()
            .find(|file| file.as_str().is_some_and(|f| f.contains(META_PLACEHOLDER)));
        if let Some(entry) = placeholder {
            *entry = Value::String(manifest_file);
        }
    }

    let manifest = AppManifest::from_value(document)?;
    require_installed(root, &manifest.name)?;
    write_manifest(&root.manifest_path(&manifest.name), &manifest)?;
    debug!(app = %manifest.name, "Saved meta file");
    Ok(manifest.name)
}

fn require_installed(root: &AppsRoot, name: &str) -> Result<(), AppError> {
    if root.is_installed(name) {
        Ok(())
    } else {
        Err(AppError::AppNotFound {
            name: name.to_string(),
        })
    }
}
