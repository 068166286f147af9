//! Test utilities for appdock
//!
//! Compiled for unit tests and, through the `test-utils` feature, for the
//! integration tests.
//!
//! - [`archives`]: tar and zip builders, including malicious entry names
//! - [`http`]: [`MockHttpClient`] plus canned GitHub and JSON responses
//! - [`init_test_logging`]: opt-in tracing output while debugging a test
//!
//! # Example
//!
//! ```rust,no_run
//! use appdock::test_utils::{MockHttpClient, sample_app_tar};
//! use appdock::test_utils::http::json_response;
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let archive = sample_app_tar("clock", "1.0", "manifest").write_to(dir.path(), "clock.tar");
//! let client = MockHttpClient::new().with(
//!     "http://apps.example.com/clock/clock.manifest",
//!     json_response(&json!({"name": "clock", "version": "1.1", "files": []})),
//! );
//! # let _ = (archive, client);
//! ```

pub mod archives;
pub mod http;

pub use archives::{TarBuilder, ZipBuilder, manifest_json, sample_app_tar, sample_app_zip};
pub use http::{MockHttpClient, github_blob, github_error, json_response};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set that level is used;
/// otherwise `RUST_LOG` is honored, and without either nothing is logged.
///
/// ```bash
/// RUST_LOG=appdock=debug cargo test install
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
