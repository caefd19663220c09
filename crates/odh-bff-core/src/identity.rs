//! Caller identity extracted from request headers.
//!
//! Extraction is pure: it only reads the header map and the configured header
//! names. The resulting [`RequestIdentity`] is stored in request extensions and
//! dropped with the request.

use http::HeaderMap;
use std::fmt;

use crate::config::AuthMethod;
use crate::constants::{MCP_TOKEN_HEADER, MCP_TOKEN_PREFIX};
use crate::error::ApiError;

/// Who is calling.
///
/// `Debug` never prints the tokens.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    /// Bearer for Kubernetes and upstream calls. Empty means no-identity mode.
    pub token: String,
    /// Set when a fronting proxy injects the user header.
    pub user_id: Option<String>,
    pub groups: Vec<String>,
    /// Separate bearer for external MCP servers.
    pub mcp_token: Option<String>,
}

impl RequestIdentity {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_user(user_id: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            groups,
            ..Default::default()
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

impl fmt::Debug for RequestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestIdentity")
            .field("token", &if self.token.is_empty() { "" } else { "[REDACTED]" })
            .field("user_id", &self.user_id)
            .field("groups", &self.groups)
            .field("mcp_token", &self.mcp_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Header names and prefix used by [`extract_identity`].
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub auth_method: AuthMethod,
    pub token_header: String,
    pub token_prefix: String,
    pub user_id_header: String,
    pub groups_header: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("missing required Header: {0}")]
    MissingHeader(String),

    #[error("expected {header} to start with prefix {prefix:?}")]
    ExpectedPrefix { header: String, prefix: String },

    #[error("invalid value in Header: {0}")]
    InvalidHeader(String),

    #[error("{0}")]
    Invalid(String),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, IdentityError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| IdentityError::InvalidHeader(name.to_string())),
    }
}

fn strip_prefix(value: &str, header: &str, prefix: &str) -> Result<String, IdentityError> {
    if prefix.is_empty() {
        return Ok(value.trim().to_string());
    }
    let stripped = value
        .strip_prefix(prefix)
        .ok_or_else(|| IdentityError::ExpectedPrefix {
            header: header.to_string(),
            prefix: prefix.to_string(),
        })?
        .trim();
    if stripped.is_empty() {
        return Err(IdentityError::InvalidHeader(header.to_string()));
    }
    Ok(stripped.to_string())
}

/// Build a [`RequestIdentity`] from the inbound headers.
///
/// Under `user` auth the token header is mandatory. Under `internal` auth the
/// user-id header is mandatory and the token is optional.
pub fn extract_identity(
    headers: &HeaderMap,
    config: &IdentityConfig,
) -> Result<RequestIdentity, IdentityError> {
    let mut identity = RequestIdentity::default();

    match header_str(headers, &config.token_header)? {
        Some(raw) => {
            identity.token = strip_prefix(raw, &config.token_header, &config.token_prefix)?;
        }
        None if config.auth_method == AuthMethod::User => {
            return Err(IdentityError::MissingHeader(config.token_header.clone()));
        }
        None => {}
    }

    identity.user_id = header_str(headers, &config.user_id_header)?.map(str::to_string);
    if config.auth_method == AuthMethod::Internal && identity.user_id.is_none() {
        return Err(IdentityError::MissingHeader(config.user_id_header.clone()));
    }

    identity.groups = header_str(headers, &config.groups_header)?
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if let Some(raw) = header_str(headers, MCP_TOKEN_HEADER)? {
        identity.mcp_token = Some(strip_prefix(raw, MCP_TOKEN_HEADER, MCP_TOKEN_PREFIX)?);
    }

    Ok(identity)
}

/// Check an already extracted identity against the configured auth method.
pub fn validate_identity(
    identity: &RequestIdentity,
    auth_method: AuthMethod,
) -> Result<(), IdentityError> {
    match auth_method {
        AuthMethod::User if !identity.has_token() => Err(IdentityError::Invalid(
            "token is required for user authentication".to_string(),
        )),
        AuthMethod::Internal if identity.user_id.as_deref().unwrap_or("").is_empty() => Err(
            IdentityError::Invalid("user id is required for internal authentication".to_string()),
        ),
        _ => Ok(()),
    }
}
