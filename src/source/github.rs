//! GitHub source.
//!
//! Users paste the browser URL of an app's manifest, e.g.
//! `https://github.com/acme/apps/blob/main/clock/clock.manifest`. Each such URL
//! is rewritten to the content API
//! (`https://api.github.com/repos/acme/apps/contents/clock/clock.manifest?ref=main`),
//! whose JSON answer carries the file as base64 in its `content` field. Files
//! listed in the manifest are resolved relative to the manifest's directory and
//! fetched the same way.

use super::http::{HttpClient, HttpRequest, HttpResponse};
use super::{AppSource, FetchedManifest, SourceKind, dir_url, http_date, parse_url};
use crate::constants::{GITHUB_API_BASE, GITHUB_DEFAULT_BRANCH, GITHUB_HOST};
use crate::core::AppError;
use crate::manifest::AppManifest;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Fetches apps through the GitHub content API.
pub struct GithubSource {
    client: Arc<dyn HttpClient>,
    token: Option<String>,
}

impl GithubSource {
    /// Creates a source; `token` is sent as `Authorization: token <t>`.
    pub fn new(client: Arc<dyn HttpClient>, token: Option<String>) -> Self {
        Self {
            client,
            token: token.filter(|t| !t.is_empty()),
        }
    }

    fn request(&self, api_url: &str) -> HttpRequest {
        HttpRequest::json(api_url).header_opt("Authorization", self.token.as_ref().map(|t| format!("token {t}")))
    }
}

/// Rewrites a `github.com` file URL into its content API URL.
///
/// `?ref=<branch>` is appended unless the branch is `master`.
///
/// ```rust,no_run
/// use appdock::source::github::github_api_url;
///
/// # fn example() -> Result<(), appdock::core::AppError> {
/// let api = github_api_url("https://github.com/acme/apps/blob/dev/clock/clock.manifest")?;
/// assert_eq!(api, "https://api.github.com/repos/acme/apps/contents/clock/clock.manifest?ref=dev");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`AppError::InvalidLocator`] when the URL is not on `github.com`
/// or lacks any of owner, repository, type, branch and path.
pub fn github_api_url(url: &str) -> Result<String, AppError> {
    let parsed = parse_url(url)?;
    if parsed.host_str() != Some(GITHUB_HOST) {
        return Err(AppError::locator(url, "Enter a valid Github URL for the file"));
    }

    let path = parsed.path().trim_start_matches('/');
    let parts: Vec<&str> = path.splitn(5, '/').collect();
    let [owner, repo, _kind, branch, file_path] = parts.as_slice() else {
        return Err(AppError::locator(
            url,
            format!("Failed to get Github API URL : expected /<owner>/<repo>/<type>/<branch>/<path> in '{url}'"),
        ));
    };
    if [owner, repo, branch, file_path].iter().any(|part| part.is_empty()) {
        return Err(AppError::locator(url, format!("Failed to get Github API URL : incomplete path in '{url}'")));
    }

    let mut api = format!("{GITHUB_API_BASE}/{owner}/{repo}/contents/{file_path}");
    if *branch != GITHUB_DEFAULT_BRANCH {
        api.push_str("?ref=");
        api.push_str(branch);
    }
    Ok(api)
}

/// Builds the transport error for a failed GitHub API call.
///
/// GitHub error bodies are JSON with `message` and `documentation_url`; when
/// present they are combined into the surfaced message.
fn github_error(url: &str, response: &HttpResponse) -> AppError {
    let body: Option<Value> = serde_json::from_slice(&response.body).ok();
    let message = body.as_ref().and_then(|body| {
        let message = body.get("message").and_then(Value::as_str);
        let docs = body.get("documentation_url").and_then(Value::as_str);
        match (message, docs) {
            (Some(m), Some(d)) => Some(format!("{m} More info : {d}")),
            (Some(m), None) => Some(m.to_string()),
            (None, Some(d)) => Some(format!("More info : {d}")),
            (None, None) => None,
        }
    });

    AppError::Transport {
        url: url.to_string(),
        status: Some(response.status),
        reason: response.reason.clone(),
        message,
    }
}

/// Decodes the file bytes out of a content API response body.
///
/// # Errors
///
/// - [`AppError::InvalidLocator`] if the response describes something other
///   than a file (a directory listing, a symlink, a submodule)
/// - [`AppError::InvalidManifest`] if `content` is missing or not base64
pub fn decode_content_blob(url: &str, body: &[u8]) -> Result<Vec<u8>, AppError> {
    let blob: Value = serde_json::from_slice(body).map_err(|e| AppError::InvalidManifest {
        reason: format!("Unexpected Github API response from {url}: {e}"),
    })?;

    let kind = match &blob {
        Value::Object(map) => map.get("type").and_then(Value::as_str).unwrap_or("unknown"),
        Value::Array(_) => "dir",
        _ => "unknown",
    };
    if kind != "file" {
        return Err(AppError::locator(url, format!("URL does not point to a file : type => {kind}")));
    }

    let content = blob.get("content").and_then(Value::as_str).ok_or_else(|| AppError::InvalidManifest {
        reason: format!("Missing file content in response from {url}"),
    })?;

    // The API wraps base64 at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact.as_bytes()).map_err(|e| AppError::InvalidManifest {
        reason: format!("Failed to parse file content : {e}"),
    })
}

#[async_trait]
impl AppSource for GithubSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Github
    }

    async fn fetch_manifest(
        &self,
        locator: &str,
        last_modified: Option<SystemTime>,
    ) -> Result<FetchedManifest, AppError> {
        let api_url = github_api_url(locator)?;
        let request = self
            .request(&api_url)
            .header_opt("If-Modified-Since", last_modified.map(http_date));

        debug!(url = %api_url, conditional = last_modified.is_some(), "Fetching manifest from GitHub");
        let response = self.client.get(request).await?;

        if response.is_not_modified() {
            debug!(url = %api_url, "Manifest not modified");
            return Ok(FetchedManifest::NotModified);
        }
        if !response.is_success() {
            return Err(github_error(&api_url, &response));
        }

        let bytes = decode_content_blob(&api_url, &response.body)?;
        let manifest = AppManifest::from_slice(&bytes)?.with_default_source_url(locator);
        Ok(FetchedManifest::Manifest(manifest))
    }

    async fn fetch_file(&self, locator: &str, relative_path: &str) -> Result<Vec<u8>, AppError> {
        let file_url = format!("{}{relative_path}", dir_url(locator)?);
        let api_url = github_api_url(&file_url)?;

        debug!(url = %api_url, file = relative_path, "Fetching file from GitHub");
        let response = self.client.get(self.request(&api_url)).await?;
        if !response.is_success() {
            return Err(github_error(&api_url, &response));
        }
        decode_content_blob(&api_url, &response.body)
    }
}
