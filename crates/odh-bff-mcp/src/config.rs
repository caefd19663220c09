//! Client identity and transport options for MCP sessions.

use std::time::Duration;
use tracing::info;

use odh_bff_core::{McpServerConfig, McpTransport};

#[derive(Debug, Clone)]
pub struct McpClientConfig {
    /// Reported to servers in `initialize`.
    pub client_name: String,
    pub client_version: String,
    /// Total per-request timeout, also bounds the handshake.
    pub timeout: Duration,
    pub keep_alive: Duration,
    pub max_idle_connections: usize,
    pub idle_timeout: Duration,
    pub insecure_skip_verify: bool,
}

impl Default for McpClientConfig {
    fn default() -> Self {
        Self {
            client_name: "odh-bff".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout: Duration::from_secs(60),
            keep_alive: Duration::from_secs(30),
            max_idle_connections: 5,
            idle_timeout: Duration::from_secs(30),
            insecure_skip_verify: false,
        }
    }
}

impl McpClientConfig {
    pub fn with_insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_verify = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Pick the transport for `server`, falling back to streamable HTTP.
pub fn select_transport(server: &McpServerConfig) -> McpTransport {
    let (transport, fell_back) = McpTransport::resolve(&server.transport);
    if fell_back {
        info!(
            server_url = %server.url,
            requested = %server.transport,
            using = %transport,
            "Unrecognized MCP transport, falling back"
        );
    }
    transport
}
