//! MCP status and tools routes through the full pipeline.

use axum::http::StatusCode;
use odh_bff_core::EnvConfig;
use odh_bff_kube::MockCluster;
use odh_bff_tests::servers::{pods_schema, SERVER_NAME, TOOL_NAME};
use odh_bff_tests::{
    get_as, mock_router, post_json_as, refused_url, send, start_streamable_server, user_config,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const CATALOG_NAMESPACE: &str = "opendatahub";
const CATALOG_NAME: &str = "gen-ai-aa-mcp-servers";

fn catalog_config() -> EnvConfig {
    EnvConfig {
        mcp_configmap_namespace: Some(CATALOG_NAMESPACE.to_string()),
        ..user_config()
    }
}

fn cluster_with_catalog(entries: &[(&str, &str)]) -> MockCluster {
    MockCluster::new()
        .allow("tok", &["project-a"])
        .with_config_map(CATALOG_NAMESPACE, CATALOG_NAME, entries)
}

fn catalog_uri(route: &str, server_url: &str) -> String {
    format!(
        "/api/v1/mcp/{route}?namespace=project-a&server_url={}",
        urlencoding::encode(server_url)
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catalog_server_tools() {
    let server = start_streamable_server().await;
    let entry = json!({"url": &server.url, "transport": "streamable-http"}).to_string();
    let cluster = cluster_with_catalog(&[("k8s", entry.as_str())]);

    let (status, body) = send(
        mock_router(catalog_config(), cluster),
        get_as(&catalog_uri("tools", &server.url), "tok"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "success", "{data}");
    assert_eq!(data["server_url"], Value::String(server.url.clone()));
    assert_eq!(data["tools_count"], 1);
    assert_eq!(data["server_info"]["name"], SERVER_NAME);
    assert_eq!(data["tools"][0]["name"], TOOL_NAME);
    assert_eq!(data["tools"][0]["input_schema"], Value::Object(pods_schema()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catalog_server_status() {
    let server = start_streamable_server().await;
    let cluster = cluster_with_catalog(&[("k8s", server.url.as_str())]);

    let (status, body) = send(
        mock_router(catalog_config(), cluster),
        get_as(&catalog_uri("status", &server.url), "tok"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "connected", "{body}");
    assert_eq!(body["data"]["server_info"]["protocol_version"], "2024-11-05");
    assert!(body["data"].get("error_details").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_catalog_lists_configured_servers() {
    let cluster = cluster_with_catalog(&[
        ("k8s", "http://k8s-mcp.tools.svc:8080/mcp"),
        (
            "github",
            r#"{"url": "https://mcp.github.example/sse", "transport": "sse", "description": "GitHub"}"#,
        ),
    ]);

    let (status, body) = send(
        mock_router(catalog_config(), cluster),
        get_as("/api/v1/mcp/servers?namespace=project-a", "tok"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["github", "k8s"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_catalog_is_empty() {
    let cluster = MockCluster::new().allow("tok", &["project-a"]);
    let (status, body) = send(
        mock_router(catalog_config(), cluster),
        get_as("/api/v1/mcp/servers?namespace=project-a", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": []}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_inline_server_reports_error_in_body() {
    let url = refused_url().await;
    let (status, body) = send(
        mock_router(user_config(), MockCluster::new()),
        post_json_as("/api/v1/mcp/status", "tok", &json!({"url": &url})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["status"], "error");
    assert_eq!(data["server_info"]["name"], Value::String(url.clone()));
    assert_eq!(data["error_details"]["code"], "connection_error");
    assert_eq!(data["error_details"]["status_code"], 503);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_inline_tools_against_live_server() {
    let server = start_streamable_server().await;
    let (status, body) = send(
        mock_router(user_config(), MockCluster::new()),
        post_json_as(
            "/api/v1/mcp/tools",
            "tok",
            &json!({"name": "k8s", "url": &server.url}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "success", "{body}");
    assert_eq!(body["data"]["tools_count"], 1);
}

#[tokio::test]
async fn test_inline_body_must_carry_http_url() {
    let (status, body) = send(
        mock_router(user_config(), MockCluster::new()),
        post_json_as("/api/v1/mcp/tools", "tok", &json!({"url": "stdio://local"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}
