//! Filesystem marker guarding the apps root against concurrent installs.
//!
//! Exactly one install or update may run per apps root. The guard is a marker
//! file created with `create_new`, so only one caller can win the race; a second
//! caller sees the marker and backs off with a busy signal instead of waiting.
//!
//! The marker records the holder's pid and creation time as JSON. When a lease
//! is configured, a marker older than the lease is treated as abandoned by a
//! crashed process and reclaimed. Without a lease a stale marker stays until an
//! operator clears it.

use crate::constants::{APP_LOCK_SUFFIX, LOCK_FILE_NAME};
use crate::core::{AppError, AppsRoot};
use crate::utils::fs::{ensure_dir, modified_time};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Contents of the lock marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMarker {
    /// Process that created the marker
    pub pid: u32,
    /// When the marker was created
    pub created_at: DateTime<Utc>,
}

impl LockMarker {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            created_at: Utc::now(),
        }
    }
}

/// The install lock of one apps root.
///
/// # Example
///
/// ```rust,no_run
/// use appdock::core::AppsRoot;
/// use appdock::installer::InstallLock;
///
/// # fn example() -> Result<(), appdock::core::AppError> {
/// let root = AppsRoot::new("/srv/apps", "manifest");
/// let lock = InstallLock::new(&root);
///
/// if let Some(_guard) = lock.try_guard()? {
///     // install...
/// } else {
///     println!("another install is running, try again later");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct InstallLock {
    dir: PathBuf,
    ttl: Option<Duration>,
}

impl InstallLock {
    /// Lock over `apps_root` without a stale-lock lease.
    #[must_use]
    pub fn new(apps_root: &AppsRoot) -> Self {
        Self {
            dir: apps_root.path().to_path_buf(),
            ttl: None,
        }
    }

    /// Sets the age after which an existing marker is reclaimed.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Path of the root marker, or of the per-app marker for `app_name`.
    #[must_use]
    pub fn marker_path(&self, app_name: Option<&str>) -> PathBuf {
        match app_name {
            Some(name) => self.dir.join(format!("{name}{APP_LOCK_SUFFIX}")),
            None => self.dir.join(LOCK_FILE_NAME),
        }
    }

    /// Creates the root marker if none exists.
    ///
    /// Returns `Ok(false)` when another holder owns the lock.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] when the marker cannot be created for any
    /// reason other than already existing.
    pub fn acquire(&self) -> Result<bool, AppError> {
        ensure_dir(&self.dir)?;
        if self.try_create()? {
            return Ok(true);
        }

        if self.is_stale() {
            let path = self.marker_path(None);
            warn!(
                path = %path.display(),
                holder = ?self.holder(),
                "Reclaiming stale install lock"
            );
            remove_marker(&path)?;
            return self.try_create();
        }

        debug!(holder = ?self.holder(), "Install lock is held");
        Ok(false)
    }

    fn try_create(&self) -> Result<bool, AppError> {
        let path = self.marker_path(None);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(AppError::io("create install lock", &path, e)),
        };

        let body = serde_json::to_vec(&LockMarker::current()).map_err(|e| AppError::Other {
            message: format!("Failed to encode install lock: {e}"),
        })?;
        if let Err(e) = file.write_all(&body) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(AppError::io("write install lock", &path, e));
        }

        debug!(path = %path.display(), "Install lock acquired");
        Ok(true)
    }

    fn is_stale(&self) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };

        let created = match self.holder() {
            Some(marker) => SystemTime::from(marker.created_at),
            None => match modified_time(&self.marker_path(None)) {
                Some(time) => time,
                None => return false,
            },
        };
        SystemTime::now().duration_since(created).is_ok_and(|age| age > ttl)
    }

    /// Removes the per-app marker for `app_name` if present, otherwise the
    /// root marker. Missing markers are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] when an existing marker cannot be removed.
    pub fn release(&self, app_name: Option<&str>) -> Result<(), AppError> {
        if let Some(name) = app_name {
            let app_marker = self.marker_path(Some(name));
            if app_marker.exists() {
                return remove_marker(&app_marker);
            }
        }
        remove_marker(&self.marker_path(None))
    }

    /// Whether the root marker currently exists.
    #[must_use]
    pub fn check(&self) -> bool {
        self.marker_path(None).exists()
    }

    /// Who holds the lock, when the marker is readable.
    #[must_use]
    pub fn holder(&self) -> Option<LockMarker> {
        let body = fs::read(self.marker_path(None)).ok()?;
        serde_json::from_slice(&body).ok()
    }

    /// Acquires the lock and returns a guard releasing it on drop.
    ///
    /// `Ok(None)` means the lock is busy.
    ///
    /// # Errors
    ///
    /// See [`InstallLock::acquire`].
    pub fn try_guard(&self) -> Result<Option<InstallLockGuard>, AppError> {
        if self.acquire()? {
            Ok(Some(InstallLockGuard {
                lock: self.clone(),
            }))
        } else {
            Ok(None)
        }
    }
}

fn remove_marker(path: &Path) -> Result<(), AppError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Install lock released");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::io("remove install lock", path, e)),
    }
}

/// Holds the install lock until dropped.
#[derive(Debug)]
pub struct InstallLockGuard {
    lock: InstallLock,
}

impl Drop for InstallLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.lock.release(None) {
            warn!(error = %e, "Failed to release install lock");
        }
    }
}
