//! Install and update engine.
//!
//! [`AppManager`] is the single entry point for every operation on an apps
//! root. Writing operations (installs and updates) run as an
//! [`InstallSession`]: they take the global install lock, fetch a validated
//! manifest from the matching [`AppSource`], assemble the app in a `_<app>`
//! staging directory and promote it with a rename. Whatever happens, the
//! session's cleanup removes the staging directory and releases the lock.
//!
//! # Installation Process
//!
//! 1. **Lock**: a second concurrent attempt gets [`InstallOutcome::Busy`]
//! 2. **Fetch**: archives are extracted into staging; remote and loose
//!    manifests are fetched and validated
//! 3. **Stage**: the manifest is written first, then every listed file
//! 4. **Validate**: the staged manifest is re-read; fresh installs refuse an
//!    existing app directory
//! 5. **Promote**: fresh installs rename staging into place; updates swap
//!    the old directory out and roll back if the swap fails
//!
//! # Modules
//!
//! - [`install_lock`] - the filesystem marker behind global mutual exclusion
//! - [`session`] - per-attempt state machine and cleanup
//! - [`staging`] - directory creation, file staging and promotion
//! - [`inventory`] - listing, file lists and manifest editing

pub mod install_lock;
pub mod inventory;
pub mod session;
pub mod staging;


pub use install_lock::{InstallLock, InstallLockGuard, LockMarker};
pub use inventory::{AppListing, MetaView};
pub use session::{InstallPhase, InstallSession};

use crate::archive;
use crate::config::{AppsConfig, Settings};
use crate::core::{AppError, AppsRoot};
use crate::manifest::{AppManifest, load_manifest};
use crate::source::local::{LocalKind, classify, load_extracted_manifest};
use crate::source::{
    AppSource, FetchedManifest, GithubSource, HttpClient, LocalDirSource, ReqwestClient, WebSource,
    remote_source_for, url_file_name,
};
use crate::utils::fs::modified_time;
use crate::version::DottedVersion;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use staging::{promote_fresh, promote_replace, stage_from_source};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The app was installed
    Installed {
        /// App name
        name: String,
        /// Installed version as written in the manifest
        version: String,
    },
    /// Another install or update holds the lock; retry later
    Busy,
}

/// Result of an update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A newer version was installed
    Updated {
        /// App name
        name: String,
        /// The version now installed
        version: String,
    },
    /// The installed version is current; nothing on disk changed
    UpToDate {
        /// App name
        name: String,
    },
    /// Another install or update holds the lock; retry later
    Busy,
}

/// Answer of an update check.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInfo {
    /// The remote version when it is newer than the installed one
    pub new_version: Option<String>,
    /// The remote manifest, absent when the server reported no change
    pub meta: Option<AppManifest>,
}

/// State of the install lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStatus {
    /// Whether a marker exists
    pub held: bool,
    /// Marker contents when readable
    pub holder: Option<LockMarker>,
}

/// Installs, updates and inspects the apps of one apps root.
///
/// # Example
///
/// ```rust,no_run
/// use appdock::config::{Overrides, Settings};
/// use appdock::installer::{AppManager, InstallOutcome};
///
/// # async fn example() -> anyhow::Result<()> {
/// let settings = Settings::resolve(&Overrides::default(), |key| std::env::var(key).ok()).await?;
/// let manager = AppManager::from_settings(settings)?;
///
/// match manager.install_web("https://apps.example.com/clock/clock.manifest").await? {
///     InstallOutcome::Installed { name, version } => println!("installed {name} {version}"),
///     InstallOutcome::Busy => println!("another install is running"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct AppManager {
    root: AppsRoot,
    config: AppsConfig,
    client: Arc<dyn HttpClient>,
    lock: InstallLock,
}

impl AppManager {
    /// Manager over `root` using `client` for remote sources.
    pub fn new(root: AppsRoot, config: AppsConfig, client: Arc<dyn HttpClient>) -> Self {
        let lock = InstallLock::new(&root).with_ttl(config.lock_ttl());
        Self {
            root,
            config,
            client,
            lock,
        }
    }

    /// Manager with the production HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Other`] if the HTTP client cannot be built.
    pub fn from_settings(settings: Settings) -> Result<Self, AppError> {
        let client = ReqwestClient::from_config(&settings.config)?;
        Ok(Self::new(settings.apps_root, settings.config, Arc::new(client)))
    }

    /// The managed apps root.
    #[must_use]
    pub const fn apps_root(&self) -> &AppsRoot {
        &self.root
    }

    /// The install lock of the apps root.
    #[must_use]
    pub const fn install_lock(&self) -> &InstallLock {
        &self.lock
    }

    fn begin(&self) -> Result<Option<InstallSession>, AppError> {
        InstallSession::begin(&self.root, &self.lock)
    }

    fn ensure_not_installed(&self, name: &str) -> Result<(), AppError> {
        if self.root.is_installed(name) {
            return Err(AppError::AlreadyInstalled {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// App name encoded in a manifest URL (`.../<app>.<ext>`).
    fn app_name_from_url(&self, url: &str) -> Result<String, AppError> {
        let file_name = url_file_name(url)?;
        match self.root.app_name_from_manifest_file(&file_name) {
            Some(name) => Ok(name.to_string()),
            None => Err(AppError::locator(
                url,
                format!(
                    "Cannot extract app name from URL. Make sure the URL points to an app .{} file",
                    self.root.manifest_extension()
                ),
            )),
        }
    }

    /// Installs from a path on disk: a tar, tar.gz or zip archive, or a
    /// manifest file whose listed files sit next to it.
    ///
    /// # Errors
    ///
    /// - [`AppError::FileNotFound`] if `path` does not exist
    /// - [`AppError::UnsupportedFormat`] if it is neither archive nor manifest
    /// - [`AppError::AlreadyInstalled`] if the app exists
    /// - any extraction, validation or I/O error
    pub async fn install_local(&self, path: &Path) -> Result<InstallOutcome, AppError> {
        let Some(mut session) = self.begin()? else {
            return Ok(InstallOutcome::Busy);
        };
        session.advance(InstallPhase::Fetching);

        match classify(path, &self.root)? {
            LocalKind::Archive(format) => {
                debug!(path = %path.display(), ?format, "Installing from local archive");
                self.install_archive(session, path.to_path_buf()).await
            }
            LocalKind::Manifest {
                app_name,
            } => {
                debug!(path = %path.display(), app = %app_name, "Installing from local meta file");
                self.ensure_not_installed(&app_name)?;
                let source = LocalDirSource::for_manifest(path);
                let locator = path.to_string_lossy();
                let manifest = expect_manifest(source.fetch_manifest(&locator, None).await?)?;
                if manifest.name != app_name {
                    return Err(AppError::InvalidManifest {
                        reason: format!(
                            "meta file names app '{}' but its file name is for '{app_name}'",
                            manifest.name
                        ),
                    });
                }
                self.install_from_source(session, &source, &locator, manifest).await
            }
        }
    }

    /// Installs an archive delivered base64-encoded.
    ///
    /// The decoded bytes are written to a temporary file inside the apps root,
    /// which is removed however the install ends.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidLocator`] if `encoded` is not valid base64
    /// - any error of an archive install
    pub async fn install_payload(&self, encoded: &str) -> Result<InstallOutcome, AppError> {
        let Some(mut session) = self.begin()? else {
            return Ok(InstallOutcome::Busy);
        };
        session.advance(InstallPhase::Fetching);

        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| AppError::locator("b64file", format!("Invalid base64 archive payload: {e}")))?;

        let mut temp = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(self.root.path())
            .map_err(|e| AppError::io("create temporary archive in", self.root.path(), e))?;
        if let Err(e) = temp.write_all(&bytes).and_then(|()| temp.flush()) {
            return Err(AppError::io("write temporary archive", temp.path(), e));
        }

        let temp_path = temp.into_temp_path();
        let archive_path = temp_path.to_path_buf();
        session.hold_temp_archive(temp_path);
        debug!(path = %archive_path.display(), bytes = bytes.len(), "Wrote payload archive");

        self.install_archive(session, archive_path).await
    }

    /// Installs from a `github.com` manifest URL.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidLocator`] for a malformed URL
    /// - [`AppError::AlreadyInstalled`] if the app exists
    /// - any fetch, validation or I/O error
    pub async fn install_github(&self, url: &str) -> Result<InstallOutcome, AppError> {
        let source = GithubSource::new(self.client.clone(), self.config.github_token.clone());
        self.install_remote(&source, url).await
    }

    /// Installs from a manifest URL on a plain web server.
    ///
    /// # Errors
    ///
    /// See [`AppManager::install_github`].
    pub async fn install_web(&self, url: &str) -> Result<InstallOutcome, AppError> {
        let source = WebSource::new(self.client.clone(), self.config.web_auth.clone());
        self.install_remote(&source, url).await
    }

    async fn install_remote(&self, source: &dyn AppSource, url: &str) -> Result<InstallOutcome, AppError> {
        let Some(mut session) = self.begin()? else {
            return Ok(InstallOutcome::Busy);
        };
        session.advance(InstallPhase::Fetching);

        let url_app = self.app_name_from_url(url)?;
        self.ensure_not_installed(&url_app)?;

        info!(url, source = %source.kind(), "Installing app");
        let manifest = expect_manifest(source.fetch_manifest(url, None).await?)?;
        self.install_from_source(session, source, url, manifest).await
    }

    async fn install_archive(
        &self,
        mut session: InstallSession,
        archive_path: PathBuf,
    ) -> Result<InstallOutcome, AppError> {
        let extracted = archive::extract_async(archive_path, self.root.clone()).await?;
        session.adopt_staging(&extracted.app_name, extracted.staging_dir.clone());

        session.advance(InstallPhase::Validating);
        let manifest = load_extracted_manifest(&self.root, &extracted)?;
        self.ensure_not_installed(&manifest.name)?;

        session.advance(InstallPhase::Promoting);
        promote_fresh(&extracted.app_dir(), &self.root.app_dir(&manifest.name), &manifest.name)?;
        session.finish();

        info!(app = %manifest.name, version = %manifest.version, "Installed app from archive");
        Ok(InstallOutcome::Installed {
            name: manifest.name,
            version: manifest.version.to_string(),
        })
    }

    async fn install_from_source(
        &self,
        mut session: InstallSession,
        source: &dyn AppSource,
        locator: &str,
        manifest: AppManifest,
    ) -> Result<InstallOutcome, AppError> {
        self.ensure_not_installed(&manifest.name)?;
        let staged = self.stage(&mut session, source, locator, &manifest).await?;

        session.advance(InstallPhase::Promoting);
        promote_fresh(&staged, &self.root.app_dir(&manifest.name), &manifest.name)?;
        session.finish();

        info!(app = %manifest.name, version = %manifest.version, source = %source.kind(), "Installed app");
        Ok(InstallOutcome::Installed {
            name: manifest.name,
            version: manifest.version.to_string(),
        })
    }

    /// Stages `manifest` from `source` and re-validates what was written.
    async fn stage(
        &self,
        session: &mut InstallSession,
        source: &dyn AppSource,
        locator: &str,
        manifest: &AppManifest,
    ) -> Result<PathBuf, AppError> {
        let staged = session.bind_app(&manifest.name)?;
        session.advance(InstallPhase::Staging);
        let manifest_file = self.root.manifest_file_name(&manifest.name);
        stage_from_source(source, locator, manifest, &staged, &manifest_file).await?;

        session.advance(InstallPhase::Validating);
        load_manifest(&staged.join(&manifest_file))?;
        Ok(staged)
    }

    /// Updates an installed app from the URL recorded in its manifest.
    ///
    /// Only a strictly newer remote version is installed. The request is made
    /// conditional on the local manifest's modification time.
    ///
    /// # Errors
    ///
    /// - [`AppError::AppNotFound`] if the app is not installed
    /// - [`AppError::InvalidLocator`] if its manifest has no `app-meta-url`
    /// - [`AppError::InvalidManifest`] if the remote manifest names another app
    /// - any fetch or I/O error; the installed version is left untouched
    pub async fn update(&self, name: &str) -> Result<UpdateOutcome, AppError> {
        let Some(mut session) = self.begin()? else {
            return Ok(UpdateOutcome::Busy);
        };
        session.advance(InstallPhase::Fetching);

        if !self.root.is_installed(name) {
            return Err(AppError::AppNotFound {
                name: name.to_string(),
            });
        }
        let manifest_path = self.root.manifest_path(name);
        let installed = load_manifest(&manifest_path)?;
        let url = installed.source_url.clone().ok_or_else(|| {
            AppError::locator("", format!("Cannot update '{name}', missing 'app-meta-url' from meta file"))
        })?;

        let source = remote_source_for(&url, self.client.clone(), &self.config)?;
        let remote = match source.fetch_manifest(&url, modified_time(&manifest_path)).await? {
            FetchedManifest::NotModified => {
                session.finish();
                info!(app = name, "Manifest not modified, app is up to date");
                return Ok(UpdateOutcome::UpToDate {
                    name: name.to_string(),
                });
            }
            FetchedManifest::Manifest(remote) => remote,
        };

        if remote.version <= installed.version {
            session.finish();
            info!(app = name, installed = %installed.version, remote = %remote.version, "App is up to date");
            return Ok(UpdateOutcome::UpToDate {
                name: name.to_string(),
            });
        }
        if remote.name != name {
            return Err(AppError::InvalidManifest {
                reason: format!("remote meta file names app '{}' instead of '{name}'", remote.name),
            });
        }

        let staged = self.stage(&mut session, source.as_ref(), &url, &remote).await?;
        session.advance(InstallPhase::Promoting);
        promote_replace(&staged, &self.root.app_dir(name), &self.root.backup_dir(name))?;
        session.finish();

        info!(app = name, from = %installed.version, to = %remote.version, "Updated app");
        Ok(UpdateOutcome::Updated {
            name: name.to_string(),
            version: remote.version.to_string(),
        })
    }

    /// Checks whether `url` offers a version newer than `installed_version`.
    ///
    /// When the app named by the URL is installed, the request is conditional
    /// on its manifest's modification time.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidLocator`] if `url` is empty or malformed
    /// - [`AppError::InvalidVersion`] if either version does not parse
    /// - any fetch error
    pub async fn check_update(&self, url: &str, installed_version: &str) -> Result<UpdateInfo, AppError> {
        let installed: DottedVersion = installed_version.parse()?;
        let source = remote_source_for(url, self.client.clone(), &self.config)?;
        let since = self
            .app_name_from_url(url)
            .ok()
            .and_then(|name| modified_time(&self.root.manifest_path(&name)));

        match source.fetch_manifest(url, since).await? {
            FetchedManifest::NotModified => Ok(UpdateInfo {
                new_version: None,
                meta: None,
            }),
            FetchedManifest::Manifest(remote) => {
                let new_version = (remote.version > installed).then(|| remote.version.to_string());
                debug!(url, installed = %installed, remote = %remote.version, ?new_version, "Checked for update");
                Ok(UpdateInfo {
                    new_version,
                    meta: Some(remote),
                })
            }
        }
    }

    /// Installed apps; see [`inventory::list_apps`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the apps root cannot be read.
    pub fn list_apps(&self) -> Result<Vec<AppListing>, AppError> {
        inventory::list_apps(&self.root)
    }

    /// Files of an installed app; see [`inventory::file_list`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AppNotFound`] for an unknown app.
    pub fn file_list(&self, name: &str) -> Result<Vec<String>, AppError> {
        inventory::file_list(&self.root, name)
    }

    /// Manifest of an installed app; see [`inventory::get_meta`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AppNotFound`] for an unknown app, or the
    /// validation error of a broken manifest.
    pub fn get_meta(&self, name: &str) -> Result<MetaView, AppError> {
        inventory::get_meta(&self.root, name)
    }

    /// Stores an edited manifest; see [`inventory::save_meta`].
    ///
    /// # Errors
    ///
    /// Returns the validation error, [`AppError::AppNotFound`], or an I/O error.
    pub fn save_meta(&self, raw: &str) -> Result<String, AppError> {
        inventory::save_meta(&self.root, raw)
    }

    /// Whether an install is in progress.
    #[must_use]
    pub fn lock_status(&self) -> LockStatus {
        LockStatus {
            held: self.lock.check(),
            holder: self.lock.holder(),
        }
    }

    /// Removes the install lock, returning whether one was present.
    ///
    /// Operator recovery for a lock left behind by a crashed process.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the marker cannot be removed.
    pub fn clear_lock(&self) -> Result<bool, AppError> {
        let held = self.lock.check();
        self.lock.release(None)?;
        if held {
            info!(path = %self.lock.marker_path(None).display(), "Cleared install lock");
        }
        Ok(held)
    }
}

fn expect_manifest(fetched: FetchedManifest) -> Result<AppManifest, AppError> {
    match fetched {
        FetchedManifest::Manifest(manifest) => Ok(manifest),
        FetchedManifest::NotModified => Err(AppError::Other {
            message: "Server answered 'not modified' to an unconditional request".to_string(),
        }),
    }
}
