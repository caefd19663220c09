//! MCP server catalog and status routes.
//!
//! The catalog is a ConfigMap: each key names a server, each value is either
//! JSON `{url, transport?, description?}` or a bare URL.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::Uri,
    response::Json,
    Extension,
};
use tracing::{debug, warn};

use odh_bff_core::constants::SERVER_URL_QUERY_PARAM;
use odh_bff_core::{ConnectionStatus, Envelope, McpServerConfig, RequestIdentity, ToolsStatus};
use odh_bff_kube::KubeError;

use super::middleware::query_param;
use super::AppState;
use crate::error::HttpError;

/// Servers declared in a catalog ConfigMap, sorted by key.
pub fn parse_catalog(data: &BTreeMap<String, String>) -> Vec<McpServerConfig> {
    data.iter()
        .filter_map(|(name, raw)| parse_entry(name, raw))
        .collect()
}

fn parse_entry(name: &str, raw: &str) -> Option<McpServerConfig> {
    let raw = raw.trim();
    if raw.starts_with('{') {
        return match serde_json::from_str::<McpServerConfig>(raw) {
            Ok(mut server) if !server.url.trim().is_empty() => {
                server.name = name.to_string();
                Some(server)
            }
            Ok(_) => {
                warn!(server = name, "MCP catalog entry has no url, skipping");
                None
            }
            Err(e) => {
                warn!(server = name, error = %e, "Unparsable MCP catalog entry, skipping");
                None
            }
        };
    }
    if is_http_url(raw) {
        return Some(McpServerConfig::new(name, raw, ""));
    }
    warn!(server = name, "MCP catalog entry is neither JSON nor a URL, skipping");
    None
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// Read the catalog with the caller's client. A missing ConfigMap is an
/// empty catalog.
async fn load_catalog(
    state: &AppState,
    identity: &RequestIdentity,
) -> Result<Vec<McpServerConfig>, HttpError> {
    let namespace = state.mcp_configmap_namespace();
    let name = &state.config.mcp_configmap_name;
    let client = state.k8s.get_client(Some(identity))?;
    match client.get_config_map(namespace, name).await {
        Ok(data) => Ok(parse_catalog(&data)),
        Err(KubeError::NotFound { .. }) => {
            debug!(namespace, configmap = %name, "No MCP catalog ConfigMap");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// The catalog entry named by `server_url`.
async fn lookup_server(
    state: &AppState,
    identity: &RequestIdentity,
    uri: &Uri,
) -> Result<McpServerConfig, HttpError> {
    let raw = query_param(uri, SERVER_URL_QUERY_PARAM).ok_or_else(|| {
        HttpError::bad_request(format!(
            "missing required query parameter: {SERVER_URL_QUERY_PARAM}"
        ))
    })?;
    let server_url = urlencoding::decode(&raw)
        .map_err(|_| HttpError::bad_request(format!("invalid {SERVER_URL_QUERY_PARAM} parameter")))?;

    load_catalog(state, identity)
        .await?
        .into_iter()
        .find(|s| s.url == server_url)
        .ok_or_else(|| HttpError::not_found(format!("MCP server not found: {server_url}")))
}

/// Validate an inline server description.
fn inline_server(
    payload: Result<Json<McpServerConfig>, JsonRejection>,
) -> Result<McpServerConfig, HttpError> {
    let Json(mut server) = payload.map_err(|e| HttpError::bad_request(e.body_text()))?;
    server.url = server.url.trim().to_string();
    if !is_http_url(&server.url) {
        return Err(HttpError::bad_request("url must be an http or https URL"));
    }
    if server.name.trim().is_empty() {
        server.name = server.url.clone();
    }
    Ok(server)
}

/// `GET /api/v1/mcp/servers`.
pub async fn list_servers(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<Json<Envelope<Vec<McpServerConfig>>>, HttpError> {
    Ok(Json(Envelope::new(load_catalog(&state, &identity).await?)))
}

/// `GET /api/v1/mcp/status?server_url=`.
pub async fn server_status(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    uri: Uri,
) -> Result<Json<Envelope<ConnectionStatus>>, HttpError> {
    let server = lookup_server(&state, &identity, &uri).await?;
    let status = state.mcp.check_connection_status(&identity, &server).await;
    Ok(Json(Envelope::new(status)))
}

/// `GET /api/v1/mcp/tools?server_url=`.
pub async fn server_tools(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    uri: Uri,
) -> Result<Json<Envelope<ToolsStatus>>, HttpError> {
    let server = lookup_server(&state, &identity, &uri).await?;
    let tools = state.mcp.list_tools_with_status(&identity, &server).await;
    Ok(Json(Envelope::new(tools)))
}

/// `POST /api/v1/mcp/status` with `{name?, url, transport?}`.
pub async fn inline_status(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    payload: Result<Json<McpServerConfig>, JsonRejection>,
) -> Result<Json<Envelope<ConnectionStatus>>, HttpError> {
    let server = inline_server(payload)?;
    let status = state.mcp.check_connection_status(&identity, &server).await;
    Ok(Json(Envelope::new(status)))
}

/// `POST /api/v1/mcp/tools` with `{name?, url, transport?}`.
pub async fn inline_tools(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
    payload: Result<Json<McpServerConfig>, JsonRejection>,
) -> Result<Json<Envelope<ToolsStatus>>, HttpError> {
    let server = inline_server(payload)?;
    let tools = state.mcp.list_tools_with_status(&identity, &server).await;
    Ok(Json(Envelope::new(tools)))
}
