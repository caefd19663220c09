//! MCP servers bound to `127.0.0.1:0` for the duration of a test.
//!
//! The streamable HTTP server is a real rmcp service. The SSE server speaks
//! just enough of the legacy protocol for a handshake, a ping and a tools
//! listing.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use rmcp::{
    model::*,
    service::RequestContext,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

pub const SERVER_NAME: &str = "k8s-mcp";
pub const SERVER_VERSION: &str = "2.0.1";
pub const TOOL_NAME: &str = "kubectl_get_pods";

/// Input schema of the single tool both servers expose.
pub fn pods_schema() -> serde_json::Map<String, Value> {
    serde_json::from_value(json!({
        "type": "object",
        "properties": { "namespace": { "type": "string" } },
        "required": ["namespace"]
    }))
    .unwrap()
}

/// A running server. Dropping it shuts the server down.
pub struct TestServer {
    pub url: String,
    cancel: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn serve(router: Router, path: &str) -> TestServer {
    let cancel = CancellationToken::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind to random port");
    let addr = listener.local_addr().unwrap();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });

    // Give server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        url: format!("http://127.0.0.1:{}{path}", addr.port()),
        cancel,
    }
}

/// A URL nothing listens on.
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/mcp")
}

#[derive(Clone)]
struct KubernetesTools;

impl ServerHandler for KubernetesTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Default::default()
            },
            instructions: None,
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(vec![Tool::new(
            TOOL_NAME,
            "List pods in a namespace",
            Arc::new(pods_schema()),
        )]))
    }
}

/// Streamable HTTP server at `/mcp`.
pub async fn start_streamable_server() -> TestServer {
    let cancel = CancellationToken::new();
    let service = StreamableHttpService::new(
        || Ok(KubernetesTools),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
            cancellation_token: cancel.child_token(),
        },
    );
    let server = serve(Router::new().nest_service("/mcp", service), "/mcp").await;
    // Tie the rmcp sessions to the listener's lifetime.
    let listener = server.cancel.clone();
    tokio::spawn(async move {
        listener.cancelled().await;
        cancel.cancel();
    });
    server
}

/// The open event stream, if a client is connected.
#[derive(Clone, Default)]
struct SseSession {
    stream: Arc<Mutex<Option<mpsc::Sender<Event>>>>,
}

async fn open_stream(
    State(session): State<SseSession>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(16);
    tx.try_send(Event::default().event("endpoint").data("/messages?session=1"))
        .unwrap();
    *session.stream.lock().await = Some(tx);

    Sse::new(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    }))
}

fn reply(message: &Value) -> Value {
    let id = message["id"].clone();
    let result = match message["method"].as_str().unwrap_or_default() {
        "initialize" => json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION }
        }),
        "ping" => json!({}),
        "tools/list" => json!({
            "tools": [{
                "name": TOOL_NAME,
                "description": "List pods in a namespace",
                "inputSchema": pods_schema()
            }]
        }),
        other => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("method not found: {other}") }
            })
        }
    };
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

async fn post_message(
    State(session): State<SseSession>,
    Json(message): Json<Value>,
) -> StatusCode {
    // Notifications carry no id and get no answer.
    if message.get("id").is_none() {
        return StatusCode::ACCEPTED;
    }
    let answer = reply(&message);
    match session.stream.lock().await.as_ref() {
        Some(tx) => {
            let event = Event::default().event("message").data(answer.to_string());
            if tx.send(event).await.is_err() {
                return StatusCode::GONE;
            }
            StatusCode::ACCEPTED
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Legacy SSE server with the stream at `/sse`.
pub async fn start_sse_server() -> TestServer {
    let router = Router::new()
        .route("/sse", get(open_stream))
        .route("/messages", post(post_message))
        .with_state(SseSession::default());
    serve(router, "/sse").await
}
