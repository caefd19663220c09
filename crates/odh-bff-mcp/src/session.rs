//! One-shot MCP sessions.
//!
//! Every call opens a fresh session, runs one capability request and closes
//! the session again, whatever the outcome. Failures are never returned as
//! errors: they are folded into the status payload with `error_details` set.

use async_trait::async_trait;
use rmcp::model::{
    ClientCapabilities, ClientInfo, ClientRequest, Implementation, InitializeResult, PingRequest,
};
use rmcp::service::RunningService;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::{ClientHandler, RoleClient, ServiceExt};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use odh_bff_core::{
    ConnectionStatus, McpServerConfig, McpServerInfo, McpTool, McpTransport, RequestIdentity,
    ToolsStatus,
};

use crate::config::{select_transport, McpClientConfig};
use crate::error::{render_chain, McpError, McpErrorCode};
use crate::http::{build_http_client, HttpStatusError, StatusLog};
use crate::schema::convert_input_schema;
use crate::sse::SseClientTransport;
use crate::streamable::CheckedHttpClient;

/// Version shown when the server never identified itself.
const UNKNOWN_VERSION: &str = "N/A";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub type McpSession = RunningService<RoleClient, BffClientHandler>;

#[derive(Clone)]
pub struct BffClientHandler {
    info: ClientInfo,
}

impl BffClientHandler {
    pub fn new(config: &McpClientConfig) -> Self {
        Self {
            info: ClientInfo {
                protocol_version: Default::default(),
                capabilities: ClientCapabilities::default(),
                client_info: Implementation {
                    name: config.client_name.clone(),
                    version: config.client_version.clone(),
                    title: Some("ODH BFF".to_string()),
                    icons: None,
                    website_url: None,
                    ..Default::default()
                },
                meta: None,
            },
        }
    }
}

impl ClientHandler for BffClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }
}

/// Health and tool introspection against remote MCP servers.
#[async_trait]
pub trait McpClient: Send + Sync {
    /// `initialize` + `ping`.
    async fn check_connection_status(
        &self,
        identity: &RequestIdentity,
        server: &McpServerConfig,
    ) -> ConnectionStatus;

    /// `initialize` + `tools/list`.
    async fn list_tools_with_status(
        &self,
        identity: &RequestIdentity,
        server: &McpServerConfig,
    ) -> ToolsStatus;
}

struct Failure {
    error: McpError,
    raw: String,
}

impl Failure {
    fn from_error(err: &(dyn StdError + 'static), server_url: &str) -> Self {
        Self {
            error: McpError::classify(err, server_url),
            raw: render_chain(err),
        }
    }

    /// A status the server answered with outranks whatever rmcp reported.
    fn from_status(http: HttpStatusError, server_url: &str) -> Self {
        Self {
            error: McpError::from_status(http.status, server_url),
            raw: http.to_string(),
        }
    }

    fn from_session_error(err: &(dyn StdError + 'static), log: &StatusLog, server_url: &str) -> Self {
        match log.first() {
            Some(http) => Self::from_status(http, server_url),
            None => Self::from_error(err, server_url),
        }
    }

    fn timed_out(server_url: &str, what: &str, config: &McpClientConfig) -> Self {
        Self {
            error: McpError::timeout(server_url),
            raw: format!("{what} timed out after {:?}", config.timeout),
        }
    }
}

pub struct SessionMcpClient {
    config: McpClientConfig,
}

impl SessionMcpClient {
    pub fn new(config: McpClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &McpClientConfig {
        &self.config
    }

    async fn connect(
        &self,
        identity: &RequestIdentity,
        server: &McpServerConfig,
    ) -> Result<(McpSession, StatusLog), Failure> {
        let transport = select_transport(server);
        let http = build_http_client(&self.config, identity.mcp_token.as_deref())
            .map_err(|e| Failure::from_error(&e, &server.url))?;
        let handler = BffClientHandler::new(&self.config);
        let log = StatusLog::default();

        let connect = async {
            match transport {
                McpTransport::StreamableHttp => {
                    let transport = StreamableHttpClientTransport::with_client(
                        CheckedHttpClient::new(http, log.clone()),
                        StreamableHttpClientTransportConfig::with_uri(server.url.as_str()),
                    );
                    handler
                        .serve(transport)
                        .await
                        .map_err(|e| Failure::from_session_error(&e, &log, &server.url))
                }
                McpTransport::Sse => {
                    let transport = SseClientTransport::connect(http, &server.url, log.clone())
                        .await
                        .map_err(|e| Failure::from_error(&e, &server.url))?;
                    handler
                        .serve(transport)
                        .await
                        .map_err(|e| Failure::from_session_error(&e, &log, &server.url))
                }
            }
        };

        let session = match tokio::time::timeout(self.config.timeout, connect).await {
            Ok(Ok(session)) => session,
            Ok(Err(failure)) => return Err(self.refine(failure, &server.url).await),
            Err(_) => return Err(Failure::timed_out(&server.url, "connect", &self.config)),
        };
        debug!(server_url = %server.url, transport = %transport, "MCP session opened");
        Ok((session, log))
    }

    /// A handshake failure the transport could not explain is re-checked at
    /// the TCP level so unreachable servers are reported as such.
    async fn refine(&self, failure: Failure, server_url: &str) -> Failure {
        if failure.error.code != McpErrorCode::InternalError {
            return failure;
        }
        match probe_reachability(server_url, PROBE_TIMEOUT).await {
            Ok(()) => failure,
            Err(e) => Failure {
                error: McpError::classify(&e, server_url),
                raw: format!("{}: {}", failure.raw, e),
            },
        }
    }
}

/// Resolve the server's host and open (then drop) a TCP connection.
async fn probe_reachability(server_url: &str, limit: Duration) -> Result<(), std::io::Error> {
    let url = url::Url::parse(server_url)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let host = url
        .host_str()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "URL has no host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = url.port_or_known_default().unwrap_or(80);

    let probe = async {
        let addrs: Vec<_> = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("dns error: {e}"))
            })?
            .collect();
        let mut last = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "no addresses resolved");
        for addr in addrs {
            match tokio::net::TcpStream::connect(addr).await {
                Ok(_) => return Ok(()),
                Err(e) => last = e,
            }
        }
        Err(last)
    };
    tokio::time::timeout(limit, probe)
        .await
        .unwrap_or_else(|_| Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "probe timed out")))
}

async fn close(session: McpSession, server_url: &str) {
    if let Err(e) = session.cancel().await {
        debug!(server_url, error = %e, "MCP session did not shut down cleanly");
    }
}

fn protocol_version(init: &InitializeResult) -> String {
    serde_json::to_value(&init.protocol_version)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Server info from `initialize`, with the ConfigMap key as name fallback.
fn server_info(init: Option<&InitializeResult>, server: &McpServerConfig) -> McpServerInfo {
    let Some(init) = init else {
        return unreachable_server_info(server);
    };
    McpServerInfo {
        name: Some(init.server_info.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| server.name.clone()),
        version: Some(init.server_info.version.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
        protocol_version: protocol_version(init),
    }
}

fn unreachable_server_info(server: &McpServerConfig) -> McpServerInfo {
    McpServerInfo {
        name: server.name.clone(),
        version: UNKNOWN_VERSION.to_string(),
        protocol_version: String::new(),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn connection_error(server: &McpServerConfig, info: McpServerInfo, failure: Failure) -> ConnectionStatus {
    ConnectionStatus {
        server_url: server.url.clone(),
        status: "error".to_string(),
        message: failure.error.message.clone(),
        last_checked: now(),
        server_info: info,
        ping_response_time_ms: None,
        error_details: Some(failure.error.details(failure.raw)),
    }
}

fn tools_error(server: &McpServerConfig, info: McpServerInfo, failure: Failure) -> ToolsStatus {
    ToolsStatus {
        server_url: server.url.clone(),
        status: "error".to_string(),
        message: failure.error.message.clone(),
        last_checked: now(),
        server_info: info,
        tools_count: None,
        tools: Vec::new(),
        error_details: Some(failure.error.details(failure.raw)),
    }
}

#[async_trait]
impl McpClient for SessionMcpClient {
    async fn check_connection_status(
        &self,
        identity: &RequestIdentity,
        server: &McpServerConfig,
    ) -> ConnectionStatus {
        debug!(server_url = %server.url, "Checking MCP server connection status");

        let (session, log) = match self.connect(identity, server).await {
            Ok(opened) => opened,
            Err(failure) => {
                error!(server_url = %server.url, error = %failure.raw, "Failed to open MCP session for status check");
                return connection_error(server, unreachable_server_info(server), failure);
            }
        };
        let info = server_info(session.peer_info(), server);

        let started = Instant::now();
        let ping = tokio::time::timeout(
            self.config.timeout,
            session.send_request(ClientRequest::PingRequest(PingRequest::default())),
        )
        .await;
        let elapsed = started.elapsed();
        close(session, &server.url).await;

        let failure = match ping {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(Failure::from_session_error(&e, &log, &server.url)),
            Err(_) => Some(Failure::timed_out(&server.url, "ping", &self.config)),
        };
        if let Some(failure) = failure {
            error!(server_url = %server.url, error = %failure.raw, "MCP ping failed");
            return connection_error(server, info, failure);
        }

        let ping_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        info!(server_url = %server.url, ping_ms, "MCP server reachable");
        ConnectionStatus {
            server_url: server.url.clone(),
            status: "connected".to_string(),
            message: "Connection successful".to_string(),
            last_checked: now(),
            server_info: info,
            ping_response_time_ms: Some(ping_ms),
            error_details: None,
        }
    }

    async fn list_tools_with_status(
        &self,
        identity: &RequestIdentity,
        server: &McpServerConfig,
    ) -> ToolsStatus {
        debug!(server_url = %server.url, "Listing tools from MCP server");

        let (session, log) = match self.connect(identity, server).await {
            Ok(opened) => opened,
            Err(failure) => {
                error!(server_url = %server.url, error = %failure.raw, "Failed to open MCP session for tools listing");
                return tools_error(server, unreachable_server_info(server), failure);
            }
        };
        let info = server_info(session.peer_info(), server);

        let listed = tokio::time::timeout(self.config.timeout, session.list_all_tools()).await;
        close(session, &server.url).await;

        let tools = match listed {
            Ok(Ok(tools)) => tools,
            Ok(Err(e)) => {
                let failure = Failure::from_session_error(&e, &log, &server.url);
                error!(server_url = %server.url, error = %failure.raw, "Failed to list MCP tools");
                return tools_error(server, info, failure);
            }
            Err(_) => {
                return tools_error(
                    server,
                    info,
                    Failure::timed_out(&server.url, "tools/list", &self.config),
                )
            }
        };

        let tools: Vec<McpTool> = tools
            .into_iter()
            .map(|tool| McpTool {
                name: tool.name.to_string(),
                description: tool.description.as_deref().unwrap_or_default().to_string(),
                input_schema: convert_input_schema(&tool.input_schema),
            })
            .collect();
        let count = tools.len();
        debug!(server_url = %server.url, tool_count = count, "Listed MCP tools");

        ToolsStatus {
            server_url: server.url.clone(),
            status: "success".to_string(),
            message: format!("Successfully retrieved {count} tools"),
            last_checked: now(),
            server_info: info,
            tools_count: Some(count),
            tools,
            error_details: None,
        }
    }
}
