//! Sources apps are installed and updated from.
//!
//! Every source offers the same two capabilities, captured by [`AppSource`]:
//! fetch (and validate) the app's manifest, then fetch each file it lists. The
//! installer is written once against this trait.
//!
//! # Implementations
//!
//! - [`github::GithubSource`] - `github.com/<owner>/<repo>/<type>/<branch>/<path>` URLs,
//!   fetched through the GitHub content API
//! - [`web::WebSource`] - any other HTTP(S) directory, fetched directly
//! - [`local::LocalDirSource`] - a manifest file on disk next to the app's files
//!
//! Archives on disk are not an [`AppSource`]: they are extracted wholesale by
//! [`crate::archive`] and checked with [`local::load_extracted_manifest`].
//!
//! # Conditional fetches
//!
//! Remote sources accept the modification time of the locally installed
//! manifest and send it as `If-Modified-Since`. A `304 Not Modified` answer
//! yields [`FetchedManifest::NotModified`] without downloading anything.

pub mod github;
pub mod http;
pub mod local;
pub mod web;

#[cfg(test)]
mod tests;

use crate::config::AppsConfig;
use crate::constants::{GITHUB_HOST, HTTP_DATE_FORMAT};
use crate::core::AppError;
use crate::manifest::AppManifest;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

pub use github::GithubSource;
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
pub use local::LocalDirSource;
pub use web::WebSource;

/// Where an app comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// Archive or manifest on the local disk
    LocalDisk,
    /// GitHub repository
    Github,
    /// Arbitrary web server
    WebServer,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LocalDisk => "localDisk",
            Self::Github => "github",
            Self::WebServer => "webServer",
        };
        f.write_str(name)
    }
}

/// Result of a manifest fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedManifest {
    /// A validated manifest
    Manifest(AppManifest),
    /// The server reported that the manifest did not change
    NotModified,
}

/// A place apps can be fetched from.
#[async_trait]
pub trait AppSource: Send + Sync {
    /// Which kind of source this is.
    fn kind(&self) -> SourceKind;

    /// Fetches and validates the manifest at `locator`.
    ///
    /// When `last_modified` is given, remote sources make the request
    /// conditional and may answer [`FetchedManifest::NotModified`]. A fetched
    /// manifest without `app-meta-url` gets `locator` recorded as its update URL.
    async fn fetch_manifest(
        &self,
        locator: &str,
        last_modified: Option<SystemTime>,
    ) -> Result<FetchedManifest, AppError>;

    /// Fetches one file of an app, relative to the directory of the manifest
    /// that was fetched from `locator`.
    ///
    /// The manifest's own `app-meta-url` plays no part here; it may name a
    /// different host that is only used for update checks.
    async fn fetch_file(&self, locator: &str, relative_path: &str) -> Result<Vec<u8>, AppError>;
}

/// Picks the remote source for `url`: GitHub for `github.com`, the plain web
/// source otherwise.
///
/// # Errors
///
/// Returns [`AppError::InvalidLocator`] when `url` is empty or not an absolute
/// HTTP(S) URL.
pub fn remote_source_for(
    url: &str,
    client: Arc<dyn HttpClient>,
    config: &AppsConfig,
) -> Result<Box<dyn AppSource>, AppError> {
    if is_github_url(url)? {
        Ok(Box::new(GithubSource::new(client, config.github_token.clone())))
    } else {
        Ok(Box::new(WebSource::new(client, config.web_auth.clone())))
    }
}

/// Whether `url` points at `github.com`.
///
/// # Errors
///
/// Returns [`AppError::InvalidLocator`] when `url` does not parse.
pub fn is_github_url(url: &str) -> Result<bool, AppError> {
    Ok(parse_url(url)?.host_str() == Some(GITHUB_HOST))
}

/// Parses an absolute HTTP(S) URL.
///
/// # Errors
///
/// Returns [`AppError::InvalidLocator`] for empty, relative or non-HTTP URLs.
pub fn parse_url(url: &str) -> Result<reqwest::Url, AppError> {
    if url.trim().is_empty() {
        return Err(AppError::locator(url, "Missing url field"));
    }
    let parsed =
        reqwest::Url::parse(url.trim()).map_err(|e| AppError::locator(url, format!("Invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::locator(url, format!("Unsupported URL scheme '{scheme}' in '{url}'"))),
    }
}

/// The directory part of `url`, always ending in `/`, without query or fragment.
///
/// # Errors
///
/// Returns [`AppError::InvalidLocator`] when `url` does not parse.
pub fn dir_url(url: &str) -> Result<String, AppError> {
    let mut parsed = parse_url(url)?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    let dir = match parsed.path().rfind('/') {
        Some(index) => parsed.path()[..=index].to_string(),
        None => "/".to_string(),
    };
    parsed.set_path(&dir);
    Ok(parsed.to_string())
}

/// The last path segment of `url`, percent-decoding not applied.
///
/// # Errors
///
/// Returns [`AppError::InvalidLocator`] when `url` does not parse.
pub fn url_file_name(url: &str) -> Result<String, AppError> {
    let parsed = parse_url(url)?;
    Ok(parsed.path().rsplit('/').next().unwrap_or_default().to_string())
}

/// Formats a timestamp as an HTTP date (`Mon, 01 Jan 2024 00:00:00 GMT`).
#[must_use]
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE_FORMAT).to_string()
}

/// `Authorization` header value for HTTP basic auth.
#[must_use]
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Transport error for a non-success response without a decodable message.
pub(crate) fn status_error(url: &str, response: &HttpResponse) -> AppError {
    AppError::Transport {
        url: url.to_string(),
        status: Some(response.status),
        reason: response.reason.clone(),
        message: None,
    }
}
