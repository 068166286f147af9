//! App manifest model.
//!
//! Every app carries a JSON manifest named `<name>.<ext>` at the root of its
//! directory. The manifest declares the app's identity and the files that make
//! it up:
//!
//! ```json
//! {
//!     "name": "clock",
//!     "version": "1.2",
//!     "files": ["clock.manifest", "app.js", "assets/face.png"],
//!     "app-meta-url": "https://github.com/acme/apps/blob/master/clock/clock.manifest",
//!     "description": "Keys the installer does not know are preserved"
//! }
//! ```
//!
//! `name`, `version` and `files` are mandatory. `app-meta-url` is optional and
//! records where later update checks fetch the manifest from.
//!
//! # Parsing at the boundary
//!
//! Manifests arrive from archives, local files, GitHub and arbitrary web
//! servers. All of them go through [`AppManifest::from_value`], which first runs
//! the transport-agnostic required-field check in [`manifest_validation`] and
//! then converts the document into the typed record, rejecting unsafe names and
//! paths and unparsable versions. Nothing downstream ever sees an unchecked
//! document.

pub mod manifest_io;
pub mod manifest_validation;


use crate::constants::META_URL_KEY;
use crate::core::AppError;
use crate::utils::path_validation::{is_safe_relative_file, is_valid_app_name};
use crate::version::DottedVersion;
use serde::Serialize;
use serde_json::{Map, Value};

pub use manifest_io::{load_manifest, read_manifest_document, write_manifest};
pub use manifest_validation::{MissingField, check_required_fields, validate};

/// A validated app manifest.
///
/// Instances are only produced by [`AppManifest::from_value`] (or the loaders
/// built on it), so the invariants below always hold:
/// - `name` is a single path segment not starting with `.` or `_`
/// - every entry of `files` is a relative path that cannot escape the app directory
/// - `version` is a valid [`DottedVersion`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppManifest {
    /// App name; also the name of its directory under the apps root.
    pub name: String,

    /// Installed or advertised version.
    pub version: DottedVersion,

    /// Files making up the app, relative to its directory, in declaration order.
    pub files: Vec<String>,

    /// URL the manifest is re-fetched from for update checks.
    #[serde(rename = "app-meta-url", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Keys the installer does not interpret, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppManifest {
    /// Validates a raw JSON document and converts it into an [`AppManifest`].
    ///
    /// `version` must be a JSON string. A number such as `1.10` has already
    /// lost its trailing zero when parsed, so it is rejected.
    ///
    /// # Errors
    ///
    /// - [`AppError::MissingField`] when `name`, `version` or `files` is absent
    /// - [`AppError::InvalidManifest`] when a field has the wrong type, the name
    ///   is not a valid app name, or a file path is unsafe
    /// - [`AppError::InvalidVersion`] when the version does not parse
    pub fn from_value(document: Value) -> Result<Self, AppError> {
        validate(&document)?;

        let Value::Object(mut map) = document else {
            return Err(invalid("meta file must contain a JSON object"));
        };

        let name = match map.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err(invalid("'name' must be a string")),
        };
        if !is_valid_app_name(&name) {
            return Err(invalid(&format!(
                "'{name}' is not a valid app name; it must be a single path segment not starting with '.' or '_'"
            )));
        }

        let version: DottedVersion = match map.remove("version") {
            Some(Value::String(version)) => version.parse::<DottedVersion>()?,
            Some(Value::Number(number)) => {
                return Err(invalid(&format!("'version' must be a string such as \"{number}\", not a number")));
            }
            _ => return Err(invalid("'version' must be a string")),
        };

        let files = match map.remove("files") {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .map(|entry| match entry {
                    Value::String(path) if is_safe_relative_file(&path) => Ok(path),
                    Value::String(path) => Err(invalid(&format!(
                        "file path '{path}' must be relative and must not contain hidden or '..' segments"
                    ))),
                    other => Err(invalid(&format!("'files' entries must be strings, found {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(invalid("'files' must be a list of paths")),
        };

        let source_url = match map.remove(META_URL_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(url)) if url.trim().is_empty() => None,
            Some(Value::String(url)) => Some(url),
            Some(_) => return Err(invalid(&format!("'{META_URL_KEY}' must be a string"))),
        };

        Ok(Self {
            name,
            version,
            files,
            source_url,
            extra: map,
        })
    }

    /// Parses and validates a manifest from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidManifest`] for malformed JSON and any error
    /// of [`AppManifest::from_value`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AppError> {
        let document: Value = serde_json::from_slice(bytes)?;
        Self::from_value(document)
    }

    /// Converts the manifest back into a JSON document.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("version".to_string(), Value::String(self.version.to_string()));
        map.insert(
            "files".to_string(),
            Value::Array(self.files.iter().cloned().map(Value::String).collect()),
        );
        if let Some(url) = &self.source_url {
            map.insert(META_URL_KEY.to_string(), Value::String(url.clone()));
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Files that have to be fetched or copied, i.e. everything except the
    /// manifest itself (matched case-insensitively).
    pub fn payload_files<'a>(&'a self, manifest_file_name: &'a str) -> impl Iterator<Item = &'a str> {
        self.files
            .iter()
            .map(String::as_str)
            .filter(move |file| !file.eq_ignore_ascii_case(manifest_file_name))
    }

    /// Records `url` as the update URL unless the manifest already names one.
    pub fn with_default_source_url(mut self, url: &str) -> Self {
        if self.source_url.is_none() {
            self.source_url = Some(url.to_string());
        }
        self
    }
}

fn invalid(reason: &str) -> AppError {
    AppError::InvalidManifest {
        reason: reason.to_string(),
    }
}
