//! A scripted [`HttpClient`] for tests.
//!
//! Responses are registered per exact URL; requests to unregistered URLs get a
//! `404 Not Found`. Every request is recorded so tests can assert on the
//! headers a fetcher sent.

use crate::core::AppError;
use crate::source::http::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory HTTP client with canned responses.
#[derive(Default)]
pub struct MockHttpClient {
    routes: Mutex<HashMap<String, HttpResponse>>,
    unreachable: Mutex<HashSet<String>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    /// A client with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `response` for `url`, replacing any earlier one.
    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.routes.lock().expect("routes lock").insert(url.to_string(), response);
    }

    /// Builder form of [`MockHttpClient::respond`].
    #[must_use]
    pub fn with(self, url: &str, response: HttpResponse) -> Self {
        self.respond(url, response);
        self
    }

    /// Makes requests to `url` fail at the connection level.
    pub fn unreachable(&self, url: &str) {
        self.unreachable.lock().expect("unreachable lock").insert(url.to_string());
    }

    /// Every request sent so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// URLs of every request sent so far, in order.
    #[must_use]
    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        self.requests.lock().expect("requests lock").push(request.clone());

        if self.unreachable.lock().expect("unreachable lock").contains(&request.url) {
            return Err(AppError::Transport {
                url: request.url,
                status: None,
                reason: "connection refused".to_string(),
                message: None,
            });
        }

        let response = self.routes.lock().expect("routes lock").get(&request.url).cloned();
        Ok(response.unwrap_or_else(|| HttpResponse::new(404, b"Not Found".to_vec())))
    }
}

/// A `200 OK` JSON response.
#[must_use]
pub fn json_response(value: &serde_json::Value) -> HttpResponse {
    HttpResponse::new(200, serde_json::to_vec(value).expect("serialize JSON body"))
}

/// A GitHub content API answer for a file holding `content`.
///
/// The base64 is wrapped at 60 columns like the real API does.
#[must_use]
pub fn github_blob(content: &[u8]) -> HttpResponse {
    let encoded = STANDARD.encode(content);
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    json_response(&serde_json::json!({
        "type": "file",
        "encoding": "base64",
        "content": wrapped,
    }))
}

/// A GitHub API error answer.
#[must_use]
pub fn github_error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(
        status,
        serde_json::to_vec(&serde_json::json!({
            "message": message,
            "documentation_url": "https://docs.github.com/rest",
        }))
        .expect("serialize JSON body"),
    )
}
