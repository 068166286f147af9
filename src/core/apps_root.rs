//! Layout of the managed apps root.
//!
//! ```text
//! <apps_root>/
//! ├── install.lock              # present while an install/update runs
//! ├── clock/                    # installed app "clock"
//! │   ├── clock.manifest
//! │   └── app.js
//! ├── _weather/                 # staging directory of an install in flight
//! └── .clock.previous/          # previous version parked during an update swap
//! ```
//!
//! An app is installed if and only if its name is a valid app name and its
//! directory exists. All path arithmetic for this layout lives in [`AppsRoot`].

use crate::constants::{BACKUP_SUFFIX, LOCK_FILE_NAME, STAGING_PREFIX};
use crate::core::AppError;
use crate::utils::fs::ensure_dir;
use crate::utils::path_validation::is_valid_app_name;
use std::path::{Path, PathBuf};

/// The directory holding one subdirectory per installed app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppsRoot {
    root: PathBuf,
    manifest_extension: String,
}

impl AppsRoot {
    /// Create a handle for `root` whose manifests use `manifest_extension`.
    ///
    /// A leading dot on the extension is tolerated and stripped.
    pub fn new(root: impl Into<PathBuf>, manifest_extension: impl Into<String>) -> Self {
        let extension: String = manifest_extension.into();
        Self {
            root: root.into(),
            manifest_extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// The apps root directory itself.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Extension of manifest files, without the dot.
    #[must_use]
    pub fn manifest_extension(&self) -> &str {
        &self.manifest_extension
    }

    /// `<name>.<ext>`
    #[must_use]
    pub fn manifest_file_name(&self, name: &str) -> String {
        format!("{name}.{}", self.manifest_extension)
    }

    /// Strips the manifest extension from a file name, returning the app name.
    ///
    /// The comparison is case-insensitive. Returns `None` when the name does
    /// not carry the extension or the stem is empty.
    #[must_use]
    pub fn app_name_from_manifest_file<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let suffix_len = self.manifest_extension.len() + 1;
        if file_name.len() <= suffix_len || !file_name.is_char_boundary(file_name.len() - suffix_len) {
            return None;
        }
        let (stem, suffix) = file_name.split_at(file_name.len() - suffix_len);
        let expected = format!(".{}", self.manifest_extension);
        suffix.eq_ignore_ascii_case(&expected).then_some(stem)
    }

    /// Final directory of an installed app.
    #[must_use]
    pub fn app_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Staging directory `_<name>` an app is assembled in.
    #[must_use]
    pub fn staging_dir(&self, name: &str) -> PathBuf {
        self.root.join(format!("{STAGING_PREFIX}{name}"))
    }

    /// Directory the installed version is parked in while an update is promoted.
    #[must_use]
    pub fn backup_dir(&self, name: &str) -> PathBuf {
        self.root.join(format!(".{name}{BACKUP_SUFFIX}"))
    }

    /// Path of an installed app's manifest.
    #[must_use]
    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.app_dir(name).join(self.manifest_file_name(name))
    }

    /// Path of the root-level install lock marker.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    /// Whether an app directory exists for `name`.
    ///
    /// Names that are not a single app segment (`..`, `a/b`, `_x`, `.x`) are
    /// never installed.
    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        is_valid_app_name(name) && self.app_dir(name).is_dir()
    }

    /// Creates the apps root if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be created.
    pub fn ensure_exists(&self) -> Result<(), AppError> {
        ensure_dir(&self.root)
    }
}
