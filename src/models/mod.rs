//! Result objects returned to callers in `--json` mode.
//!
//! Every command answers with one JSON object: `success` plus the payload keys
//! of its operation, `wait: true` when the install lock is held, or `error`
//! when the operation failed. The constructors below are the complete set of
//! shapes a caller can receive.
//!
//! ```json
//! {"success": true, "appList": [{"name": "clock", "meta": {...}}]}
//! {"success": true, "updateInfo": {"new-version": "1.1", "meta": {...}}}
//! {"success": false, "wait": true}
//! {"success": false, "error": "'clock' app is already installed"}
//! ```

use crate::core::AppError;
use crate::installer::{AppListing, InstallOutcome, LockStatus, MetaView, UpdateInfo, UpdateOutcome};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// A result object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    success: bool,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Response {
    fn success() -> Self {
        Self {
            success: true,
            fields: Map::new(),
        }
    }

    fn failure() -> Self {
        Self {
            success: false,
            fields: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Another install or update holds the lock.
    #[must_use]
    pub fn busy() -> Self {
        Self::failure().with("wait", true)
    }

    /// `listApps`
    #[must_use]
    pub fn app_list(apps: &[AppListing]) -> Self {
        let apps = serde_json::to_value(apps).unwrap_or_else(|_| Value::Array(Vec::new()));
        Self::success().with("appList", apps)
    }

    /// `checkAppUpdate`
    #[must_use]
    pub fn update_info(info: &UpdateInfo) -> Self {
        let mut body = Map::new();
        body.insert(
            "new-version".to_string(),
            info.new_version.clone().map_or(Value::Bool(false), Value::String),
        );
        if let Some(meta) = &info.meta {
            body.insert("meta".to_string(), meta.to_value());
        }
        Self::success().with("updateInfo", body)
    }

    /// `fetchFileList`
    #[must_use]
    pub fn file_list(files: &[String]) -> Self {
        Self::success().with("fileList", files.to_vec())
    }

    /// `getMeta`
    #[must_use]
    pub fn meta(view: &MetaView) -> Self {
        let response = Self::success().with("meta", view.meta.clone());
        if view.created {
            response.with("metaCreate", true)
        } else {
            response
        }
    }

    /// `saveMeta`
    #[must_use]
    pub fn meta_saved(app_name: &str) -> Self {
        Self::success().with("appName", app_name)
    }

    /// `installApp`
    #[must_use]
    pub fn installed(outcome: &InstallOutcome) -> Self {
        match outcome {
            InstallOutcome::Installed {
                name,
                ..
            } => Self::success().with("appName", name.as_str()),
            InstallOutcome::Busy => Self::busy(),
        }
    }

    /// `updateApp`
    #[must_use]
    pub fn updated(outcome: &UpdateOutcome) -> Self {
        match outcome {
            UpdateOutcome::Updated {
                name,
                version,
            } => Self::success().with("appName", name.as_str()).with("new-version", version.as_str()),
            UpdateOutcome::UpToDate {
                ..
            } => Self::success().with("up-to-date", true),
            UpdateOutcome::Busy => Self::busy(),
        }
    }

    /// `checkInstallLock`
    #[must_use]
    pub fn lock_status(status: &LockStatus) -> Self {
        if !status.held {
            return Self::success();
        }
        let response = Self::busy();
        match status.holder.as_ref().and_then(|holder| serde_json::to_value(holder).ok()) {
            Some(holder) => response.with("holder", holder),
            None => response,
        }
    }

    /// `lock clear`
    #[must_use]
    pub fn lock_cleared(removed: bool) -> Self {
        Self::success().with("removed", removed)
    }

    /// A failed operation.
    ///
    /// A missing manifest field additionally carries `metaError` so editors
    /// can point at the offending field.
    #[must_use]
    pub fn error(error: &anyhow::Error) -> Self {
        let app_error = error.chain().find_map(|e| e.downcast_ref::<AppError>());
        let message = app_error.map_or_else(|| format!("{error:#}"), ToString::to_string);
        let response = Self::failure().with("error", message.as_str());
        match app_error {
            Some(AppError::MissingField {
                field,
            }) => response.with("metaError", json!({ "error": message, "name": field })),
            _ => response,
        }
    }

    /// Whether the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Value of a payload key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Compact JSON text of the object.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            json!({ "success": false, "error": format!("Failed to encode response: {e}") }).to_string()
        })
    }
}
