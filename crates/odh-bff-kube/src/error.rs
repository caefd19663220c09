//! Kubernetes error mapping.
//!
//! Raw API errors are classified once here. Only the code and a safe message
//! cross into [`ApiError`]; the raw detail stays in the logs.

use std::future::Future;
use std::time::Duration;

use odh_bff_core::{ApiError, ErrorCode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KubeError {
    #[error("authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("permission denied{}", .namespace.as_deref().map(|ns| format!(" in namespace {ns}")).unwrap_or_default())]
    PermissionDenied { namespace: Option<String> },

    #[error("{message}")]
    NotFound {
        message: String,
        namespace: Option<String>,
    },

    #[error("missing identity")]
    MissingIdentity,

    #[error("{0} timed out")]
    Timeout(String),

    #[error("operation cancelled")]
    Cancelled,

    /// A resource exists but is unusable. The message is safe to show.
    #[error("{0}")]
    InvalidResource(String),

    #[error("failed to create Kubernetes client: {0}")]
    Client(String),

    #[error("kubernetes request failed: {0}")]
    Internal(String),
}

impl KubeError {
    /// Classify a `kube` error, remembering the namespace it concerned.
    pub fn from_kube(err: kube::Error, namespace: Option<&str>) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                401 => KubeError::Unauthorized,
                403 => KubeError::PermissionDenied {
                    namespace: namespace.map(str::to_string),
                },
                404 => KubeError::NotFound {
                    message: response.message,
                    namespace: namespace.map(str::to_string),
                },
                _ => KubeError::Internal(format!("{} ({})", response.message, response.code)),
            },
            other => KubeError::Internal(other.to_string()),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, KubeError::PermissionDenied { .. })
    }
}

/// Bound `fut` by `limit`, reporting expiry as [`KubeError::Timeout`].
pub(crate) async fn with_deadline<T, F>(what: &str, limit: Duration, fut: F) -> Result<T, KubeError>
where
    F: Future<Output = Result<T, KubeError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(KubeError::Timeout(what.to_string())))
}

impl From<KubeError> for ApiError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Unauthorized => ApiError::new(ErrorCode::Unauthorized, err.to_string()),
            KubeError::PermissionDenied { .. } => {
                ApiError::new(ErrorCode::PermissionDenied, err.to_string())
            }
            KubeError::NotFound { .. } => ApiError::not_found(err.to_string()),
            KubeError::MissingIdentity => ApiError::bad_request("missing RequestIdentity in context"),
            KubeError::Timeout(_) => ApiError::new(ErrorCode::Timeout, err.to_string()),
            KubeError::Cancelled => ApiError::new(ErrorCode::ServerUnavailable, err.to_string()),
            KubeError::InvalidResource(message) => ApiError::internal(message),
            KubeError::Client(_) | KubeError::Internal(_) => ApiError::server_problem(),
        }
    }
}
