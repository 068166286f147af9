//! Required-field check for manifest documents.
//!
//! This check is pure: it inspects a parsed JSON document and reports the
//! first mandatory field that is absent. It is the same check for manifests
//! listed from disk, loaded from a local path, extracted from an archive or
//! fetched from any remote source.

use crate::core::AppError;
use serde_json::Value;

/// Fields every manifest must carry, checked in this order.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "version", "files"];

/// A mandatory field absent from a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl MissingField {
    /// Name of the absent field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.0
    }
}

impl From<MissingField> for AppError {
    fn from(missing: MissingField) -> Self {
        Self::MissingField {
            field: missing.0.to_string(),
        }
    }
}

/// Returns the first required field `document` lacks.
///
/// A document that is not a JSON object lacks every field, so `name` is
/// reported.
pub fn check_required_fields(document: &Value) -> Result<(), MissingField> {
    let Some(map) = document.as_object() else {
        return Err(MissingField(REQUIRED_FIELDS[0]));
    };
    match REQUIRED_FIELDS.iter().find(|field| !map.contains_key(**field)) {
        Some(field) => Err(MissingField(*field)),
        None => Ok(()),
    }
}

/// [`check_required_fields`] mapped onto [`AppError::MissingField`].
///
/// # Errors
///
/// Returns [`AppError::MissingField`] naming the first absent field.
pub fn validate(document: &Value) -> Result<(), AppError> {
    check_required_fields(document).map_err(AppError::from)
}
