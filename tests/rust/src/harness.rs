use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use odh_bff_core::{AuthMethod, EnvConfig};
use odh_bff_gateway::{build_router, AppState, Upstreams};
use odh_bff_kube::{KubernetesClientFactory, MockClientFactory, MockCluster};
use odh_bff_mcp::{McpClientConfig, SessionMcpClient};

/// Bearer-token auth with default headers.
pub fn user_config() -> EnvConfig {
    EnvConfig {
        auth_method: AuthMethod::User,
        ..Default::default()
    }
}

/// The full router over any Kubernetes client factory.
pub fn router_with_factory(
    config: EnvConfig,
    k8s: Arc<dyn KubernetesClientFactory>,
    upstreams: Upstreams,
) -> Router {
    let mcp = Arc::new(SessionMcpClient::new(
        McpClientConfig::default().with_timeout(Duration::from_secs(5)),
    ));
    build_router(AppState::new(config, k8s, mcp, upstreams))
}

/// The full router over a mock cluster and the given upstream factories.
pub fn router(config: EnvConfig, cluster: MockCluster, upstreams: Upstreams) -> Router {
    let k8s = Arc::new(MockClientFactory::new(config.identity_config(), cluster));
    router_with_factory(config, k8s, upstreams)
}

/// The full router with canned upstream clients.
pub fn mock_router(config: EnvConfig, cluster: MockCluster) -> Router {
    router(config, cluster, Upstreams::mock())
}

/// Send one request and decode the JSON body, `Null` when it is not JSON.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (
        status,
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    )
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_as(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json_as(uri: &str, token: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
