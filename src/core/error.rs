//! Error handling for appdock
//!
//! This module provides the error taxonomy shared by every layer of the app
//! manager and the user-facing error reporting used by the CLI. The system is
//! built around two types:
//! - [`AppError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! # Error Categories
//!
//! Each variant belongs to exactly one [`ErrorKind`]:
//! - **Validation**: malformed manifests, bad versions, unsafe or unsupported archives
//! - **NotFound**: missing apps, manifests or files
//! - **Transport**: non-2xx HTTP responses and connection failures
//! - **Conflict**: the app is already installed
//! - **Io**: filesystem failures while creating, writing or renaming
//! - **Other**: anything unclassified, surfaced verbatim
//!
//! `Busy` (install lock held) and "already up to date" are deliberately not
//! errors; they are outcome values returned by the installer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use appdock::core::{AppError, ErrorKind, user_friendly_error};
//!
//! let error = AppError::AlreadyInstalled {
//!     name: "clock".to_string(),
//! };
//! assert_eq!(error.kind(), ErrorKind::Conflict);
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse classification of an [`AppError`].
///
/// The installer and the CLI branch on the kind rather than on individual
/// variants when they only care about the category of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input: manifests, versions, archives, locators
    Validation,
    /// An app, manifest or file does not exist
    NotFound,
    /// The remote side answered with an error or could not be reached
    Transport,
    /// The app is already installed
    Conflict,
    /// Local filesystem failure
    Io,
    /// Unclassified failure
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "ValidationError",
            Self::NotFound => "NotFoundError",
            Self::Transport => "TransportError",
            Self::Conflict => "ConflictError",
            Self::Io => "IOError",
            Self::Other => "Error",
        };
        f.write_str(name)
    }
}

/// The main error type for app manager operations
///
/// Every fetch, extract and write step returns this type to its caller; the
/// installer is the single place that performs cleanup and decides what the
/// user sees.
///
/// # Examples
///
/// ```rust,no_run
/// use appdock::core::AppError;
///
/// fn handle(error: AppError) {
///     match error {
///         AppError::MissingField { field } => eprintln!("manifest lacks '{field}'"),
///         AppError::Transport { status: Some(404), .. } => eprintln!("not published yet"),
///         other => eprintln!("{other}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// A mandatory manifest field is absent
    ///
    /// The message matches the wording clients already parse.
    #[error("meta file missing mandatory field '{field}'")]
    MissingField {
        /// Name of the missing field (`name`, `version` or `files`)
        field: String,
    },

    /// The manifest document is present but malformed
    #[error("Invalid manifest: {reason}")]
    InvalidManifest {
        /// What is wrong with the document
        reason: String,
    },

    /// A version string is not a dotted sequence of non-negative integers
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The offending version string
        version: String,
        /// Why it was rejected
        reason: String,
    },

    /// An archive entry (or manifest file path) could escape the target directory
    #[error("Archive contains invalid filename : {path}")]
    UnsafeArchivePath {
        /// The rejected entry path as stored in the archive
        path: String,
    },

    /// The archive is neither tar (optionally gzip-compressed) nor zip
    #[error("Unsupported archive type, only tar and zip allowed")]
    UnsupportedFormat {
        /// Path of the rejected archive
        path: PathBuf,
    },

    /// The archive holds no app files
    #[error("Archive does not contain any app files")]
    EmptyArchive {
        /// Path of the rejected archive
        path: PathBuf,
    },

    /// A URL, path or request field cannot identify an app
    #[error("{reason}")]
    InvalidLocator {
        /// The locator as supplied by the caller
        locator: String,
        /// What is wrong with it
        reason: String,
    },

    /// The named app has no directory under the apps root
    #[error("App '{name}' is not installed")]
    AppNotFound {
        /// Name of the app
        name: String,
    },

    /// A required file does not exist
    #[error("{what} not found: {}", path.display())]
    FileNotFound {
        /// What kind of file was expected (e.g. "App meta file")
        what: String,
        /// Where it was expected
        path: PathBuf,
    },

    /// The remote side returned an error status or could not be reached
    ///
    /// When the upstream body carried an API error message (GitHub does), it is
    /// surfaced verbatim instead of the bare status line.
    #[error("{}", transport_message(.status, .reason, .message))]
    Transport {
        /// URL that was requested
        url: String,
        /// HTTP status, absent for connection-level failures
        status: Option<u16>,
        /// Reason phrase or connection error text
        reason: String,
        /// Decoded upstream error message, when available
        message: Option<String>,
    },

    /// The app is already installed
    #[error("'{name}' app is already installed")]
    AlreadyInstalled {
        /// Name of the app
        name: String,
    },

    /// Filesystem operation failed
    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        /// What was being attempted (e.g. "create directory")
        operation: String,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Anything else, reported with full detail
    #[error("{message}")]
    Other {
        /// Description of the failure
        message: String,
    },
}

fn transport_message(status: &Option<u16>, reason: &str, message: &Option<String>) -> String {
    match (message, status) {
        (Some(message), _) => format!("Github API error: {message}"),
        (None, Some(status)) => format!("HTTP error : {status} {reason}"),
        (None, None) => format!("HTTP error : {reason}"),
    }
}

impl AppError {
    /// Classify this error into the taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. }
            | Self::InvalidManifest { .. }
            | Self::InvalidVersion { .. }
            | Self::UnsafeArchivePath { .. }
            | Self::UnsupportedFormat { .. }
            | Self::EmptyArchive { .. }
            | Self::InvalidLocator { .. } => ErrorKind::Validation,
            Self::AppNotFound { .. } | Self::FileNotFound { .. } => ErrorKind::NotFound,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::AlreadyInstalled { .. } => ErrorKind::Conflict,
            Self::Io { .. } => ErrorKind::Io,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Build an [`AppError::Io`] from an I/O error and the path it concerns.
    pub fn io(operation: impl Into<String>, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build an [`AppError::InvalidLocator`].
    pub fn locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            Self::MissingField { field } => Self::MissingField { field: field.clone() },
            Self::InvalidManifest { reason } => Self::InvalidManifest { reason: reason.clone() },
            Self::InvalidVersion { version, reason } => Self::InvalidVersion {
                version: version.clone(),
                reason: reason.clone(),
            },
            Self::UnsafeArchivePath { path } => Self::UnsafeArchivePath { path: path.clone() },
            Self::UnsupportedFormat { path } => Self::UnsupportedFormat { path: path.clone() },
            Self::EmptyArchive { path } => Self::EmptyArchive { path: path.clone() },
            Self::InvalidLocator { locator, reason } => Self::InvalidLocator {
                locator: locator.clone(),
                reason: reason.clone(),
            },
            Self::AppNotFound { name } => Self::AppNotFound { name: name.clone() },
            Self::FileNotFound { what, path } => Self::FileNotFound {
                what: what.clone(),
                path: path.clone(),
            },
            Self::Transport { url, status, reason, message } => Self::Transport {
                url: url.clone(),
                status: *status,
                reason: reason.clone(),
                message: message.clone(),
            },
            Self::AlreadyInstalled { name } => Self::AlreadyInstalled { name: name.clone() },
            // io::Error is not Clone; keep kind and text
            Self::Io { operation, path, source } => Self::Io {
                operation: operation.clone(),
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::Other { message } => Self::Other { message: message.clone() },
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidManifest {
            reason: format!("Failed to parse meta file : {error}"),
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps an [`AppError`] and adds optional details and a
/// suggestion for resolution. This is how the CLI presents errors.
///
/// # Examples
///
/// ```rust,no_run
/// use appdock::core::{AppError, ErrorContext};
///
/// let context = ErrorContext::new(AppError::AppNotFound { name: "clock".into() })
///     .with_suggestion("Run 'appdock list' to see installed apps");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: AppError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no details or suggestion.
    #[must_use]
    pub const fn new(error: AppError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`AppError`] (anywhere in the chain) and [`std::io::Error`];
/// everything else is reported with its full cause chain so no diagnostic
/// detail is lost.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(app_error) = error.chain().find_map(|e| e.downcast_ref::<AppError>()) {
        return create_error_context(app_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(AppError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check ownership and permissions of the apps root directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(AppError::Other {
                    message: format!("Not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(AppError::Other {
        message,
    })
}

/// Attach tailored suggestions to the error variants users hit most often.
fn create_error_context(error: AppError) -> ErrorContext {
    match &error {
        AppError::MissingField { field } => {
            let details = format!("Every app manifest needs 'name', 'version' and 'files'; '{field}' is absent");
            ErrorContext::new(error)
                .with_suggestion("Add the missing field to the app's manifest and retry")
                .with_details(details)
        }

        AppError::InvalidVersion { .. } => ErrorContext::new(error)
            .with_suggestion("Use a dotted numeric version such as 1.2 or 1.2.0"),

        AppError::UnsafeArchivePath { .. } => ErrorContext::new(error)
            .with_suggestion("Rebuild the archive with relative paths under a single top-level app directory")
            .with_details("Entries that are absolute, hidden, or contain '..' are rejected before anything is extracted"),

        AppError::UnsupportedFormat { .. } => ErrorContext::new(error)
            .with_suggestion("Package the app as a .tar, .tgz or .zip archive"),

        AppError::AppNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'appdock list' to see the installed apps"),

        AppError::AlreadyInstalled { name } => {
            let suggestion = format!("Use 'appdock update {name}' to move to a newer version");
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        AppError::Transport { url, status, .. } => {
            let details = format!("Request to {url} failed");
            let suggestion = match status {
                Some(401 | 403) => "Check the github_token in your config; the API may also be rate limiting you",
                Some(404) => "Verify the URL points at the app's manifest file",
                Some(_) => "The server rejected the request; retry later",
                None => "Check your network connection and the URL",
            };
            ErrorContext::new(error).with_details(details).with_suggestion(suggestion)
        }

        AppError::Io { .. } => ErrorContext::new(error)
            .with_suggestion("Check permissions and free space in the apps root directory"),

        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AppError::MissingField {
            field: "version".to_string(),
        };
        assert_eq!(error.to_string(), "meta file missing mandatory field 'version'");

        let error = AppError::AlreadyInstalled {
            name: "clock".to_string(),
        };
        assert_eq!(error.to_string(), "'clock' app is already installed");

        let error = AppError::UnsafeArchivePath {
            path: "../etc/passwd".to_string(),
        };
        assert_eq!(error.to_string(), "Archive contains invalid filename : ../etc/passwd");
    }

    #[test]
    fn test_transport_display_prefers_api_message() {
        let error = AppError::Transport {
            url: "https://api.github.com/repos/o/r/contents/x".to_string(),
            status: Some(403),
            reason: "Forbidden".to_string(),
            message: Some("API rate limit exceeded".to_string()),
        };
        assert_eq!(error.to_string(), "Github API error: API rate limit exceeded");

        let error = AppError::Transport {
            url: "http://example.com/a".to_string(),
            status: Some(500),
            reason: "Internal Server Error".to_string(),
            message: None,
        };
        assert_eq!(error.to_string(), "HTTP error : 500 Internal Server Error");

        let error = AppError::Transport {
            url: "http://example.com/a".to_string(),
            status: None,
            reason: "connection refused".to_string(),
            message: None,
        };
        assert_eq!(error.to_string(), "HTTP error : connection refused");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(AppError::MissingField { field: "name".into() }.kind(), ErrorKind::Validation);
        assert_eq!(AppError::AppNotFound { name: "a".into() }.kind(), ErrorKind::NotFound);
        assert_eq!(AppError::AlreadyInstalled { name: "a".into() }.kind(), ErrorKind::Conflict);
        assert_eq!(
            AppError::io("write", "/tmp/x", std::io::Error::other("boom")).kind(),
            ErrorKind::Io
        );
        assert_eq!(ErrorKind::Conflict.to_string(), "ConflictError");
    }

    #[test]
    fn test_clone_preserves_io_kind() {
        let error = AppError::io(
            "rename",
            "/apps/_clock",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        match error.clone() {
            AppError::Io { source, operation, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
                assert_eq!(operation, "rename");
            }
            other => panic!("Expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn test_user_friendly_error_finds_app_error_in_chain() {
        let error = anyhow::Error::from(AppError::AppNotFound {
            name: "clock".to_string(),
        })
        .context("updating app");

        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, AppError::AppNotFound { .. }));
        assert!(ctx.suggestion.unwrap().contains("appdock list"));
    }

    #[test]
    fn test_user_friendly_error_generic_keeps_chain() {
        let error = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(error);
        let text = ctx.to_string();
        assert!(text.contains("outer"));
        assert!(text.contains("root cause"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(AppError::AppNotFound {
            name: "clock".to_string(),
        })
        .with_suggestion("Install it first");

        let display = format!("{ctx}");
        assert!(display.contains("App 'clock' is not installed"));
        assert!(display.contains("Install it first"));
    }
}
