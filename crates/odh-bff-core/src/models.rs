//! Payloads that cross component boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `GET /healthcheck` and `GET /api/v1/health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub system_info: SystemInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub version: String,
}

impl HealthResponse {
    pub fn available() -> Self {
        Self {
            status: "available".to_string(),
            system_info: SystemInfo {
                version: crate::constants::HEALTH_VERSION.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceModel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserModel {
    pub user_id: String,
    pub cluster_admin: bool,
}

/// MCP transport kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum McpTransport {
    Sse,
    #[default]
    StreamableHttp,
}

impl McpTransport {
    /// Parse a configured transport. Empty and unknown values resolve to
    /// streamable HTTP; the flag reports whether an unknown value was replaced.
    pub fn resolve(raw: &str) -> (Self, bool) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sse" => (McpTransport::Sse, false),
            "streamable-http" | "streamable_http" | "" => (McpTransport::StreamableHttp, false),
            _ => (McpTransport::StreamableHttp, true),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            McpTransport::Sse => "sse",
            McpTransport::StreamableHttp => "streamable-http",
        }
    }
}

impl fmt::Display for McpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One MCP server entry, read from the MCP ConfigMap or an inline request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// ConfigMap key. Used as the server name when the server cannot be reached.
    #[serde(default)]
    pub name: String,
    pub url: String,
    /// Raw configured value; see [`McpTransport::resolve`].
    #[serde(default)]
    pub transport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport: transport.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub status_code: u16,
    pub raw_error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: serde_json::Map<String, serde_json::Value>,
}

/// Result of a connection check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub server_url: String,
    /// `connected` or `error`.
    pub status: String,
    pub message: String,
    pub last_checked: i64,
    pub server_info: McpServerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_response_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
}

/// Result of a tools listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsStatus {
    pub server_url: String,
    /// `success` or `error`.
    pub status: String,
    pub message: String,
    pub last_checked: i64,
    pub server_info: McpServerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_count: Option<usize>,
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
}
