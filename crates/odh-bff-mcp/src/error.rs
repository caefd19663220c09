//! MCP failure taxonomy.
//!
//! Typed failures (HTTP status from [`HttpStatusError`], connect and timeout
//! flags from `reqwest`) are classified first by walking the error chain.
//! Whatever remains is classified from the rendered message.

use std::error::Error as StdError;
use std::fmt;

use odh_bff_core::ErrorDetails;

use crate::http::{HttpStatusError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    BadRequest,
    ConnectionError,
    Timeout,
    ServerError,
    InternalError,
}

impl McpErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            McpErrorCode::Unauthorized => "unauthorized",
            McpErrorCode::Forbidden => "forbidden",
            McpErrorCode::NotFound => "not_found",
            McpErrorCode::BadRequest => "bad_request",
            McpErrorCode::ConnectionError => "connection_error",
            McpErrorCode::Timeout => "timeout",
            McpErrorCode::ServerError => "server_error",
            McpErrorCode::InternalError => "internal_error",
        }
    }

    /// HTTP status reported when an error carries none of its own.
    pub fn default_status(&self) -> u16 {
        match self {
            McpErrorCode::Unauthorized => 401,
            McpErrorCode::Forbidden => 403,
            McpErrorCode::NotFound => 404,
            McpErrorCode::BadRequest => 400,
            McpErrorCode::ConnectionError => 503,
            McpErrorCode::Timeout => 408,
            McpErrorCode::ServerError | McpErrorCode::InternalError => 500,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            McpErrorCode::Unauthorized => "Authentication failed",
            McpErrorCode::Forbidden => "Access denied",
            McpErrorCode::NotFound => "Server endpoint not found",
            McpErrorCode::BadRequest => "Invalid request format or parameters",
            McpErrorCode::ConnectionError => "Server is not reachable",
            McpErrorCode::Timeout => "Request to MCP server timed out",
            McpErrorCode::ServerError => "MCP server internal error",
            McpErrorCode::InternalError => "MCP operation failed",
        }
    }
}

impl fmt::Display for McpErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct McpError {
    pub code: McpErrorCode,
    pub message: String,
    pub server_url: String,
    pub status_code: u16,
}

impl McpError {
    /// The code's fixed message; raw text only ever goes to `raw_error`.
    pub fn of(code: McpErrorCode, server_url: &str) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            server_url: server_url.to_string(),
            status_code: code.default_status(),
        }
    }

    pub fn timeout(server_url: &str) -> Self {
        Self::of(McpErrorCode::Timeout, server_url)
    }

    pub fn from_status(status: u16, server_url: &str) -> Self {
        match status {
            401 => Self::of(McpErrorCode::Unauthorized, server_url),
            403 => Self::of(McpErrorCode::Forbidden, server_url),
            404 => Self::of(McpErrorCode::NotFound, server_url),
            400 => Self::of(McpErrorCode::BadRequest, server_url),
            408 => Self::timeout(server_url),
            500..=599 => Self::of(McpErrorCode::ServerError, server_url),
            _ => Self::of(McpErrorCode::InternalError, server_url),
        }
    }

    /// Classify from the rendered error text.
    pub fn from_message(raw: &str, server_url: &str) -> Self {
        let msg = raw.to_ascii_lowercase();
        let has = |needle: &str| msg.contains(needle);

        let code = if has("connection refused") {
            McpErrorCode::ConnectionError
        } else if has("timeout") || has("timed out") || has("deadline") {
            McpErrorCode::Timeout
        } else if has("dns error")
            || has("failed to lookup address")
            || has("error trying to connect")
            || has("tcp connect error")
            || has("error sending request")
            || has("connection reset")
        {
            McpErrorCode::ConnectionError
        } else if has("http 401") || has("401") {
            McpErrorCode::Unauthorized
        } else if has("http 403") || has("403") {
            McpErrorCode::Forbidden
        } else if has("http 404") || has("404") {
            McpErrorCode::NotFound
        } else if has("http 400") || has("400") {
            McpErrorCode::BadRequest
        } else if has("http 5") || has("internal server error") {
            McpErrorCode::ServerError
        } else if has("unauthorized") || has("auth required") {
            McpErrorCode::Unauthorized
        } else if has("forbidden") {
            McpErrorCode::Forbidden
        } else if has("not found") {
            McpErrorCode::NotFound
        } else if has("bad request") {
            McpErrorCode::BadRequest
        } else {
            McpErrorCode::InternalError
        };
        Self::of(code, server_url)
    }

    /// Classify any error, typed causes first.
    pub fn classify(err: &(dyn StdError + 'static), server_url: &str) -> Self {
        let mut current = Some(err);
        while let Some(e) = current {
            if let Some(classified) = classify_typed(e, server_url) {
                return classified;
            }
            current = e.source();
        }
        Self::from_message(&render_chain(err), server_url)
    }

    pub fn details(&self, raw_error: impl Into<String>) -> ErrorDetails {
        ErrorDetails {
            code: self.code.as_str().to_string(),
            status_code: self.status_code,
            raw_error: raw_error.into(),
        }
    }
}

fn classify_typed(e: &(dyn StdError + 'static), server_url: &str) -> Option<McpError> {
    if let Some(http) = e.downcast_ref::<HttpStatusError>() {
        return Some(McpError::from_status(http.status, server_url));
    }
    if let Some(TransportError::Http(http)) = e.downcast_ref::<TransportError>() {
        return Some(McpError::from_status(http.status, server_url));
    }
    if let Some(req) = e.downcast_ref::<reqwest::Error>() {
        if req.is_timeout() {
            return Some(McpError::timeout(server_url));
        }
        if req.is_connect() {
            return Some(McpError::of(McpErrorCode::ConnectionError, server_url));
        }
        if let Some(status) = req.status() {
            return Some(McpError::from_status(status.as_u16(), server_url));
        }
    }
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        if matches!(
            io.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
        ) {
            return Some(McpError::of(McpErrorCode::ConnectionError, server_url));
        }
    }
    None
}

/// `outer: inner: root`, skipping causes already contained in their parent.
pub fn render_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        let text = e.to_string();
        if !text.is_empty() && !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        current = e.source();
    }
    rendered
}
