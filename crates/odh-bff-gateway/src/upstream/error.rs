//! Upstream failure mapping.
//!
//! Every upstream client maps its failures here, once, at the client boundary.
//! `message` is safe to show; `detail` only reaches the logs.

use odh_bff_core::{ApiError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{service} {code}: {message} ({detail})")]
pub struct UpstreamError {
    pub service: &'static str,
    pub code: ErrorCode,
    pub message: String,
    pub detail: String,
}

impl UpstreamError {
    pub fn new(
        service: &'static str,
        code: ErrorCode,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            service,
            code,
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Map a non-success upstream response.
    pub fn from_status(service: &'static str, status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let (code, message) = match status {
            401 => (ErrorCode::Unauthorized, format!("{service} authentication failed")),
            403 => (ErrorCode::Forbidden, format!("access to {service} denied")),
            404 => (ErrorCode::NotFound, format!("{service} resource not found")),
            400 | 422 => (
                ErrorCode::InvalidRequest,
                if detail.is_empty() {
                    format!("invalid request to {service}")
                } else {
                    detail.clone()
                },
            ),
            408 | 503 | 504 => (
                ErrorCode::ServerUnavailable,
                format!("{service} is currently unavailable"),
            ),
            _ => (ErrorCode::InternalError, format!("{service} request failed")),
        };
        Self::new(service, code, message, format!("HTTP {status}: {detail}"))
    }

    /// Map a transport failure from `reqwest`.
    pub fn from_request(service: &'static str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::new(
                service,
                ErrorCode::Timeout,
                format!("{service} request timed out"),
                err.to_string(),
            );
        }
        if err.is_connect() {
            return Self::new(
                service,
                ErrorCode::ConnectionFailed,
                format!("failed to connect to {service}"),
                err.to_string(),
            );
        }
        if let Some(status) = err.status() {
            return Self::from_status(service, status.as_u16(), err.to_string());
        }
        Self::new(
            service,
            ErrorCode::InternalError,
            format!("{service} request failed"),
            err.to_string(),
        )
    }

    /// A 2xx body that does not decode.
    pub fn malformed(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::new(
            service,
            ErrorCode::InternalError,
            format!("{service} returned an unexpected response"),
            err.to_string(),
        )
    }

    /// The service cannot be located or a client cannot be built for it.
    pub fn unavailable(service: &'static str, detail: impl Into<String>) -> Self {
        Self::new(
            service,
            ErrorCode::ServerUnavailable,
            format!("{service} is currently unavailable"),
            detail,
        )
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        ApiError::new(err.code, err.message)
    }
}
