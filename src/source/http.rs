//! HTTP transport seam used by the remote fetchers.
//!
//! Fetchers only need "GET a URL with some headers, give me status, headers
//! and body". [`HttpClient`] captures exactly that, so tests substitute a
//! scripted client and the fetchers never see `reqwest` types. Non-2xx
//! responses are returned as ordinary values; deciding whether a status is an
//! error belongs to the fetcher, which knows how to decode the upstream error
//! body.

use crate::config::AppsConfig;
use crate::core::AppError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Expected response body type, sent as the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// `application/json`
    Json,
    /// `text/plain`
    Text,
}

impl Accept {
    /// Header value for this accept kind.
    #[must_use]
    pub const fn header_value(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain",
        }
    }
}

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL
    pub url: String,
    /// Expected body type
    pub accept: Accept,
    /// Additional headers, in insertion order
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// GET expecting JSON.
    pub fn json(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: Accept::Json,
            headers: Vec::new(),
        }
    }

    /// GET expecting plain content.
    pub fn text(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept: Accept::Text,
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a header when `value` is present.
    #[must_use]
    pub fn header_opt(self, name: &str, value: Option<String>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// Value of the first header named `name` (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase (e.g. `Not Found`)
    pub reason: String,
    /// Headers with lower-cased names
    pub headers: BTreeMap<String, String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with the canonical reason phrase for `status`.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            reason,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 304 Not Modified.
    #[must_use]
    pub const fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// Header value by lower-case name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Performs GET requests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends `request`.
    ///
    /// Only connection-level failures are errors; every status code is
    /// returned as an [`HttpResponse`].
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, AppError>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client with the given timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Other`] if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Other {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
        })
    }

    /// Builds a client from the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// See [`ReqwestClient::new`].
    pub fn from_config(config: &AppsConfig) -> Result<Self, AppError> {
        Self::new(config.http_timeout(), &config.user_agent())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        let mut builder = self.client.get(&request.url).header("Accept", request.accept.header_value());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| AppError::Transport {
            url: request.url.clone(),
            status: None,
            reason: e.to_string(),
            message: None,
        })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| AppError::Transport {
            url: request.url.clone(),
            status: Some(status.as_u16()),
            reason: format!("failed to read response body: {e}"),
            message: None,
        })?;

        debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "HTTP GET");

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body: body.to_vec(),
        })
    }
}
