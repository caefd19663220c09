//! HTTP plumbing shared by both MCP transports.
//!
//! Every client carries the caller's MCP bearer as a default header. Every
//! response passes through [`check_status`], which turns a status of 400 or
//! above into an [`HttpStatusError`] before any MCP framing is read.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use crate::config::McpClientConfig;

/// A non-success response from an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("HTTP {status}: {detail}")]
pub struct HttpStatusError {
    pub status: u16,
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] HttpStatusError),

    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("invalid MCP bearer token")]
    InvalidToken,

    #[error("{0}")]
    Protocol(String),

    #[error("transport closed")]
    Closed,
}

/// Pull a readable message out of an error body.
///
/// JSON bodies are searched for `error`, `message` and `detail` in that
/// order; anything else is returned trimmed.
pub fn extract_error_detail(body: &str) -> String {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "detail"] {
            match object.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Object(inner)) => {
                    if let Some(Value::String(s)) = inner.get("message") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
    }
    body.trim().to_string()
}

/// Pass successful responses through; read the body of failed ones.
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HttpStatusError> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = extract_error_detail(&body);
    Err(HttpStatusError {
        status: status.as_u16(),
        detail: if detail.is_empty() {
            status.canonical_reason().unwrap_or("").to_string()
        } else {
            detail
        },
    })
}

/// First HTTP failure seen during one session.
///
/// rmcp keeps transport errors out of the `source()` chain, so a status
/// returned mid-handshake cannot be recovered from the error it reports.
/// Both transports record here instead and the session reads it back.
#[derive(Debug, Clone, Default)]
pub struct StatusLog(Arc<Mutex<Option<HttpStatusError>>>);

impl StatusLog {
    /// [`check_status`], remembering the first failure.
    pub async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, HttpStatusError> {
        check_status(response).await.inspect_err(|err| {
            self.0.lock().get_or_insert_with(|| err.clone());
        })
    }

    pub fn first(&self) -> Option<HttpStatusError> {
        self.0.lock().clone()
    }
}

/// Fresh client for one session.
pub fn build_http_client(
    config: &McpClientConfig,
    bearer: Option<&str>,
) -> Result<reqwest::Client, TransportError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = bearer.filter(|t| !t.is_empty()) {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| TransportError::InvalidToken)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .tcp_keepalive(config.keep_alive)
        .pool_max_idle_per_host(config.max_idle_connections)
        .pool_idle_timeout(config.idle_timeout)
        .danger_accept_invalid_certs(config.insecure_skip_verify)
        .build()?)
}
