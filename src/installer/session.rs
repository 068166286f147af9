//! One install or update attempt.
//!
//! An [`InstallSession`] owns everything an attempt creates: the install lock,
//! the `_<app>` staging directory and, for payload installs, the temporary
//! archive. Its phase moves forward through
//! `LockPending → Fetching → Staging → Validating → Promoting → Done`.
//!
//! Dropping a session that has not reached `Done` marks it `Failed` and undoes
//! the attempt: the staging directory is removed, the temporary archive is
//! deleted and the lock is released last. Because cleanup lives in `Drop`, any
//! `?` in the orchestrator takes the failure path without further bookkeeping.

use super::install_lock::{InstallLock, InstallLockGuard};
use crate::core::{AppError, AppsRoot};
use crate::utils::fs::remove_dir_all;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Phase of an install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// Waiting for the install lock
    LockPending,
    /// Obtaining the manifest (and, for archives, extracting)
    Fetching,
    /// Writing files into the staging directory
    Staging,
    /// Checking the staged app
    Validating,
    /// Moving the staged app into place
    Promoting,
    /// Finished successfully
    Done,
    /// Aborted; cleanup ran
    Failed,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LockPending => "lock-pending",
            Self::Fetching => "fetching",
            Self::Staging => "staging",
            Self::Validating => "validating",
            Self::Promoting => "promoting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Live state of one install or update attempt.
#[derive(Debug)]
pub struct InstallSession {
    apps_root: AppsRoot,
    phase: InstallPhase,
    app_name: Option<String>,
    staging_dir: Option<PathBuf>,
    temp_archive: Option<TempPath>,
    lock: Option<InstallLockGuard>,
}

impl InstallSession {
    /// Starts an attempt by taking the install lock.
    ///
    /// Returns `Ok(None)` when another attempt holds the lock.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the apps root or the lock marker cannot be
    /// created.
    pub fn begin(apps_root: &AppsRoot, lock: &InstallLock) -> Result<Option<Self>, AppError> {
        debug!(phase = %InstallPhase::LockPending, "Install attempt starting");
        apps_root.ensure_exists()?;
        let Some(guard) = lock.try_guard()? else {
            info!("Install lock busy");
            return Ok(None);
        };

        Ok(Some(Self {
            apps_root: apps_root.clone(),
            phase: InstallPhase::LockPending,
            app_name: None,
            staging_dir: None,
            temp_archive: None,
            lock: Some(guard),
        }))
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> InstallPhase {
        self.phase
    }

    /// App this attempt works on, once known.
    #[must_use]
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// Staging directory owned by this attempt, once bound.
    #[must_use]
    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging_dir.as_deref()
    }

    /// Moves to `phase`.
    pub fn advance(&mut self, phase: InstallPhase) {
        debug!(
            app = self.app_name.as_deref().unwrap_or("?"),
            from = %self.phase,
            to = %phase,
            "Install phase"
        );
        self.phase = phase;
    }

    /// Binds the attempt to `app_name` and takes ownership of its staging
    /// directory, removing any leftover from an earlier crash.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if a leftover directory cannot be removed.
    pub fn bind_app(&mut self, app_name: &str) -> Result<PathBuf, AppError> {
        let staging = self.apps_root.staging_dir(app_name);
        if self.staging_dir.as_deref() != Some(staging.as_path()) && staging.exists() {
            debug!(path = %staging.display(), "Removing leftover staging directory");
            remove_dir_all(&staging)?;
        }
        self.app_name = Some(app_name.to_string());
        self.staging_dir = Some(staging.clone());
        Ok(staging)
    }

    /// Takes ownership of an already populated staging directory (archive
    /// extraction creates its own).
    pub fn adopt_staging(&mut self, app_name: &str, staging_dir: PathBuf) {
        self.app_name = Some(app_name.to_string());
        self.staging_dir = Some(staging_dir);
    }

    /// Takes ownership of a temporary archive; it is deleted when the session ends.
    pub fn hold_temp_archive(&mut self, path: TempPath) {
        self.temp_archive = Some(path);
    }

    /// Completes the attempt: leftover staging is removed and the lock released.
    pub fn finish(mut self) {
        self.advance(InstallPhase::Done);
        self.cleanup();
        info!(app = self.app_name.as_deref().unwrap_or("?"), "Install attempt done");
    }

    fn cleanup(&mut self) {
        if let Some(staging) = self.staging_dir.take() {
            if staging.exists() {
                debug!(path = %staging.display(), "Removing staging directory");
                if let Err(e) = remove_dir_all(&staging) {
                    warn!(path = %staging.display(), error = %e, "Failed to remove staging directory");
                }
            }
        }
        if let Some(temp) = self.temp_archive.take() {
            debug!(path = %temp.display(), "Removing temporary archive");
            if let Err(e) = temp.close() {
                warn!(error = %e, "Failed to remove temporary archive");
            }
        }
        // Released last so no other attempt sees our staging directory
        self.lock.take();
    }
}

impl Drop for InstallSession {
    fn drop(&mut self) {
        if self.phase != InstallPhase::Done {
            warn!(
                app = self.app_name.as_deref().unwrap_or("?"),
                phase = %self.phase,
                "Install attempt failed, cleaning up"
            );
            self.phase = InstallPhase::Failed;
            self.cleanup();
        }
    }
}
