//! HTTP rendering of pipeline errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::{error, warn};

use odh_bff_core::{ApiError, ErrorCode, IdentityError};
use odh_bff_kube::KubeError;

use crate::upstream::UpstreamError;

/// An [`ApiError`] on its way out as an `{ "error": ... }` envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(transparent)]
pub struct HttpError(pub ApiError);

impl HttpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self(ApiError::new(code, message))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(ApiError::bad_request(message))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(ApiError::not_found(message))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(ApiError::forbidden(message))
    }

    pub fn server_problem() -> Self {
        Self(ApiError::server_problem())
    }

    /// Log `cause` and hide it behind the generic 500 message.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        error!(error = %cause, "Request failed");
        Self::server_problem()
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<IdentityError> for HttpError {
    fn from(err: IdentityError) -> Self {
        Self(err.into())
    }
}

impl From<KubeError> for HttpError {
    fn from(err: KubeError) -> Self {
        match &err {
            KubeError::Client(_) | KubeError::Internal(_) => {
                error!(error = %err, "Kubernetes request failed")
            }
            _ => warn!(error = %err, "Kubernetes request rejected"),
        }
        Self(err.into())
    }
}

impl From<UpstreamError> for HttpError {
    fn from(err: UpstreamError) -> Self {
        warn!(error = %err, "Upstream request failed");
        Self(err.into())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0.to_envelope())).into_response()
    }
}
