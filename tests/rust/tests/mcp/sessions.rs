//! Direct sessions over both transports.

use std::time::Duration;

use odh_bff_core::{McpServerConfig, RequestIdentity};
use odh_bff_mcp::{McpClient, McpClientConfig, SessionMcpClient};
use odh_bff_tests::servers::{pods_schema, SERVER_NAME, SERVER_VERSION, TOOL_NAME};
use odh_bff_tests::{refused_url, start_sse_server, start_streamable_server};
use pretty_assertions::assert_eq;

fn client() -> SessionMcpClient {
    SessionMcpClient::new(McpClientConfig::default().with_timeout(Duration::from_secs(5)))
}

fn identity() -> RequestIdentity {
    RequestIdentity {
        token: "tok".to_string(),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_streamable_http_connection_status() {
    let server = start_streamable_server().await;
    let config = McpServerConfig::new("k8s", server.url.clone(), "streamable-http");

    let status = client().check_connection_status(&identity(), &config).await;

    assert_eq!(status.status, "connected", "{}", status.message);
    assert_eq!(status.server_url, server.url);
    assert_eq!(status.server_info.name, SERVER_NAME);
    assert_eq!(status.server_info.version, SERVER_VERSION);
    assert_eq!(status.server_info.protocol_version, "2024-11-05");
    assert!(status.ping_response_time_ms.is_some());
    assert!(status.error_details.is_none());
    assert!(status.last_checked > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_streamable_http_tools_keep_input_schema() {
    let server = start_streamable_server().await;
    let config = McpServerConfig::new("k8s", server.url.clone(), "");

    let tools = client().list_tools_with_status(&identity(), &config).await;

    assert_eq!(tools.status, "success", "{}", tools.message);
    assert_eq!(tools.tools_count, Some(1));
    assert_eq!(tools.tools.len(), 1);
    assert_eq!(tools.tools[0].name, TOOL_NAME);
    assert_eq!(tools.tools[0].description, "List pods in a namespace");
    assert_eq!(tools.tools[0].input_schema, pods_schema());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sse_transport_session() {
    let server = start_sse_server().await;
    let config = McpServerConfig::new("legacy", server.url.clone(), "sse");

    let status = client().check_connection_status(&identity(), &config).await;
    assert_eq!(status.status, "connected", "{}", status.message);
    assert_eq!(status.server_info.name, SERVER_NAME);
    assert_eq!(status.server_info.protocol_version, "2024-11-05");

    let tools = client().list_tools_with_status(&identity(), &config).await;
    assert_eq!(tools.status, "success", "{}", tools.message);
    assert_eq!(tools.tools_count, Some(1));
    assert_eq!(tools.tools[0].input_schema, pods_schema());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refused_connection_is_classified() {
    let url = refused_url().await;
    let config = McpServerConfig::new("gone", url.clone(), "streamable-http");

    let tools = client().list_tools_with_status(&identity(), &config).await;

    assert_eq!(tools.status, "error");
    assert!(tools.tools.is_empty());
    assert!(tools.tools_count.is_none());
    assert_eq!(tools.server_info.name, "gone");
    assert_eq!(tools.server_info.version, "N/A");
    let details = tools.error_details.unwrap();
    assert_eq!(details.code, "connection_error");
    assert_eq!(details.status_code, 503);
}
