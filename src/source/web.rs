//! Plain web-server source.
//!
//! The manifest URL is fetched as JSON as-is, and every listed file is fetched
//! from the manifest's directory URL. Optional basic-auth credentials are sent
//! with every request.

use super::http::{HttpClient, HttpRequest};
use super::{AppSource, FetchedManifest, SourceKind, basic_auth_header, dir_url, http_date, status_error};
use crate::config::WebAuth;
use crate::core::AppError;
use crate::manifest::AppManifest;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Fetches apps directly from a web server directory.
pub struct WebSource {
    client: Arc<dyn HttpClient>,
    auth: Option<WebAuth>,
}

impl WebSource {
    /// Creates a source sending `auth` as HTTP basic auth when present.
    pub fn new(client: Arc<dyn HttpClient>, auth: Option<WebAuth>) -> Self {
        Self {
            client,
            auth,
        }
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request.header_opt(
            "Authorization",
            self.auth.as_ref().map(|auth| basic_auth_header(&auth.username, &auth.password)),
        )
    }
}

#[async_trait]
impl AppSource for WebSource {
    fn kind(&self) -> SourceKind {
        SourceKind::WebServer
    }

    async fn fetch_manifest(
        &self,
        locator: &str,
        last_modified: Option<SystemTime>,
    ) -> Result<FetchedManifest, AppError> {
        super::parse_url(locator)?;
        let request = self
            .authorize(HttpRequest::json(locator))
            .header_opt("If-Modified-Since", last_modified.map(http_date));

        debug!(url = %locator, conditional = last_modified.is_some(), "Fetching manifest from web server");
        let response = self.client.get(request).await?;

        if response.is_not_modified() {
            return Ok(FetchedManifest::NotModified);
        }
        if !response.is_success() {
            return Err(status_error(locator, &response));
        }

        let manifest = AppManifest::from_slice(&response.body)?.with_default_source_url(locator);
        Ok(FetchedManifest::Manifest(manifest))
    }

    async fn fetch_file(&self, locator: &str, relative_path: &str) -> Result<Vec<u8>, AppError> {
        let url = format!("{}{relative_path}", dir_url(locator)?);

        debug!(url = %url, "Fetching file from web server");
        let response = self.client.get(self.authorize(HttpRequest::text(&url))).await?;
        if !response.is_success() {
            return Err(status_error(&url, &response));
        }
        Ok(response.body)
    }
}
