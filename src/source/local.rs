//! Local-disk sources: app archives and loose manifests.
//!
//! A local install path is either an archive (recognized by content) that is
//! extracted wholesale, or a manifest file `<app>.<ext>` whose listed files sit
//! next to it. The second case is an ordinary [`AppSource`] reading from disk,
//! so it goes through the same staging code as the remote sources.

use super::{AppSource, FetchedManifest, SourceKind};
use crate::archive::{self, ArchiveFormat, ExtractedArchive};
use crate::core::{AppError, AppsRoot};
use crate::manifest::{AppManifest, load_manifest};
use crate::utils::fs::join_relative;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What a local install path turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalKind {
    /// A tar, tar.gz or zip archive
    Archive(ArchiveFormat),
    /// A manifest file for the named app
    Manifest {
        /// App name taken from the file name
        app_name: String,
    },
}

/// Classifies a local install path.
///
/// # Errors
///
/// - [`AppError::FileNotFound`] if `path` does not exist or is not a file
/// - [`AppError::UnsupportedFormat`] if it is neither an archive nor a `.<ext>` file
pub fn classify(path: &Path, apps_root: &AppsRoot) -> Result<LocalKind, AppError> {
    if !path.is_file() {
        return Err(AppError::FileNotFound {
            what: "Install source".to_string(),
            path: path.to_path_buf(),
        });
    }

    match archive::detect_format(path) {
        Ok(format) => return Ok(LocalKind::Archive(format)),
        Err(AppError::UnsupportedFormat { .. }) => {}
        Err(e) => return Err(e),
    }

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    match apps_root.app_name_from_manifest_file(&file_name) {
        Some(app_name) => Ok(LocalKind::Manifest {
            app_name: app_name.to_string(),
        }),
        None => Err(AppError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Loads and checks the manifest of an extracted archive.
///
/// The manifest must sit at `<app>/<app>.<ext>`, must name the same app as the
/// archive's top-level directory, and every file it lists must have been
/// extracted.
///
/// # Errors
///
/// - [`AppError::FileNotFound`] if the manifest or a listed file is missing
/// - [`AppError::InvalidManifest`] if the manifest names a different app
/// - any validation error of the manifest itself
pub fn load_extracted_manifest(
    apps_root: &AppsRoot,
    extracted: &ExtractedArchive,
) -> Result<AppManifest, AppError> {
    let app_dir = extracted.app_dir();
    let manifest_path = app_dir.join(apps_root.manifest_file_name(&extracted.app_name));
    let manifest = load_manifest(&manifest_path)?;

    if manifest.name != extracted.app_name {
        return Err(AppError::InvalidManifest {
            reason: format!(
                "meta file names app '{}' but the archive contains '{}'",
                manifest.name, extracted.app_name
            ),
        });
    }

    for file in &manifest.files {
        let path = join_relative(&app_dir, file);
        if !path.is_file() {
            return Err(AppError::FileNotFound {
                what: "App file".to_string(),
                path,
            });
        }
    }

    Ok(manifest)
}

/// Reads a loose manifest and the files listed next to it.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    dir: PathBuf,
}

impl LocalDirSource {
    /// Source for the manifest at `manifest_path`; files are read from its directory.
    #[must_use]
    pub fn for_manifest(manifest_path: &Path) -> Self {
        Self {
            dir: manifest_path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        }
    }
}

#[async_trait]
impl AppSource for LocalDirSource {
    fn kind(&self) -> SourceKind {
        SourceKind::LocalDisk
    }

    async fn fetch_manifest(
        &self,
        locator: &str,
        _last_modified: Option<SystemTime>,
    ) -> Result<FetchedManifest, AppError> {
        let path = PathBuf::from(locator);
        let manifest = tokio::task::spawn_blocking(move || load_manifest(&path))
            .await
            .map_err(|e| AppError::Other {
                message: format!("Reading meta file failed: {e}"),
            })??;
        Ok(FetchedManifest::Manifest(manifest))
    }

    async fn fetch_file(&self, _locator: &str, relative_path: &str) -> Result<Vec<u8>, AppError> {
        let path = join_relative(&self.dir, relative_path);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::FileNotFound {
                    what: "App file".to_string(),
                    path: path.clone(),
                }
            } else {
                AppError::io("read file", &path, e)
            }
        })
    }
}
