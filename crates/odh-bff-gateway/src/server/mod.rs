//! BFF HTTP server.
//!
//! Global layers, outermost first: panic recovery, telemetry, `TraceLayer`,
//! CORS (when origins are configured), identity injection. Routes then add
//! their own namespace, access and upstream middleware.

mod handlers;
pub mod mcp;
pub mod middleware;
mod services;
mod state;
pub mod telemetry;

pub use middleware::{AccessGate, Namespace, UpstreamGate};
pub use state::AppState;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use odh_bff_core::constants::API_PATH_PREFIX;
use odh_bff_core::EnvConfig;
use odh_bff_kube::resources::LLAMA_STACK_DISTRIBUTION;
use odh_bff_kube::CustomResourceKind;

use crate::upstream::UpstreamKind;

/// Resource checked for routes that do not target a specific upstream.
const DEFAULT_ACCESS_RESOURCE: &CustomResourceKind = &LLAMA_STACK_DISTRIBUTION;

/// Identity validation only.
fn with_access(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(axum_middleware::from_fn_with_state(
        AccessGate {
            state: state.clone(),
            resource: DEFAULT_ACCESS_RESOURCE,
        },
        middleware::require_access,
    ))
}

/// `attach_namespace -> require_access`.
fn with_namespace_access(
    router: Router<AppState>,
    state: &AppState,
    resource: &'static CustomResourceKind,
) -> Router<AppState> {
    router
        .route_layer(axum_middleware::from_fn_with_state(
            AccessGate {
                state: state.clone(),
                resource,
            },
            middleware::require_access,
        ))
        .route_layer(axum_middleware::from_fn(middleware::attach_namespace))
}

/// `attach_namespace -> require_access -> attach_upstream`.
fn with_upstream(router: Router<AppState>, state: &AppState, kind: UpstreamKind) -> Router<AppState> {
    let router = router.route_layer(axum_middleware::from_fn_with_state(
        UpstreamGate {
            state: state.clone(),
            kind,
        },
        middleware::attach_upstream,
    ));
    with_namespace_access(
        router,
        state,
        kind.custom_resource().unwrap_or(DEFAULT_ACCESS_RESOURCE),
    )
}

fn api_routes(state: &AppState) -> Router<AppState> {
    let account = with_access(
        Router::new()
            .route("/namespaces", get(handlers::list_namespaces))
            .route("/user", get(handlers::current_user)),
        state,
    );

    let mcp_catalog = with_namespace_access(
        Router::new()
            .route("/mcp/servers", get(mcp::list_servers))
            .route("/mcp/status", get(mcp::server_status))
            .route("/mcp/tools", get(mcp::server_tools)),
        state,
        DEFAULT_ACCESS_RESOURCE,
    );
    let mcp_inline = with_access(
        Router::new()
            .route("/mcp/status", post(mcp::inline_status))
            .route("/mcp/tools", post(mcp::inline_tools)),
        state,
    );

    let evaluations = with_upstream(
        Router::new()
            .route("/evaluations/health", get(services::evaluation_health))
            .route("/evaluations/jobs", get(services::list_evaluation_jobs))
            .route("/evaluations/providers", get(services::list_evaluation_providers))
            .route("/evaluations/collections", get(services::list_evaluation_collections)),
        state,
        UpstreamKind::EvalHub,
    );
    let llama_stack = with_upstream(
        Router::new()
            .route("/lsd/models", get(services::list_lsd_models))
            .route("/lsd/vectorstores", get(services::list_lsd_vector_stores)),
        state,
        UpstreamKind::LlamaStack,
    );
    let mlflow = with_upstream(
        Router::new().route("/mlflow/prompts", get(services::list_mlflow_prompts)),
        state,
        UpstreamKind::Mlflow,
    );
    let maas = with_upstream(
        Router::new()
            .route("/maas/models", get(services::list_maas_models))
            .route("/maas/tiers", get(services::list_maas_tiers)),
        state,
        UpstreamKind::Maas,
    );

    Router::new()
        .route("/health", get(handlers::health))
        .merge(account)
        .merge(mcp_catalog)
        .merge(mcp_inline)
        .merge(evaluations)
        .merge(llama_stack)
        .merge(mlflow)
        .merge(maas)
}

/// Assemble the full router for `state`.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthcheck", get(handlers::health))
        .nest(API_PATH_PREFIX, api_routes(&state))
        .fallback(handlers::not_found)
        .layer(axum_middleware::map_response(
            middleware::envelope_method_not_allowed,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::inject_identity,
        ))
        .with_state(state.clone());

    if let Some(cors) = middleware::cors_layer(&state.config) {
        router = router.layer(cors);
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(telemetry::telemetry_middleware))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
}

/// Bind and serve until the process is stopped.
pub async fn run(config: EnvConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::from_config(config).await?;

    info!("Starting on {}", addr);
    info!("Auth method: {}", state.config.auth_method);
    info!(
        "CORS: {}",
        if state.config.cors_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );
    if !state.ca_pool.is_empty() {
        info!(certificates = state.ca_pool.len(), "Loaded CA bundles");
    }

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Ready to accept connections");
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use odh_bff_core::AuthMethod;
    use odh_bff_kube::{MockClientFactory, MockCluster};
    use odh_bff_mcp::{McpClientConfig, SessionMcpClient};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::upstream::Upstreams;

    fn router(config: EnvConfig, cluster: MockCluster) -> Router {
        let k8s = Arc::new(MockClientFactory::new(config.identity_config(), cluster));
        let mcp = Arc::new(SessionMcpClient::new(McpClientConfig::default()));
        build_router(AppState::new(config, k8s, mcp, Upstreams::mock()))
    }

    fn user_config() -> EnvConfig {
        EnvConfig {
            auth_method: AuthMethod::User,
            ..Default::default()
        }
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_as(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_identity() {
        for path in ["/healthcheck", "/api/v1/health"] {
            let (status, body) = send(router(user_config(), MockCluster::new()), get(path)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body,
                serde_json::json!({"status": "available", "system_info": {"version": "1.0.0"}})
            );
        }
    }

    #[tokio::test]
    async fn test_missing_token_is_bad_request() {
        let (status, body) =
            send(router(user_config(), MockCluster::new()), get("/api/v1/namespaces")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({"error": {"code": "INVALID_REQUEST", "message": "missing required Header: Authorization"}})
        );
    }

    #[tokio::test]
    async fn test_wrong_prefix_is_bad_request() {
        let request = Request::builder()
            .uri("/api/v1/namespaces")
            .header("Authorization", "Token abc")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(user_config(), MockCluster::new()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_namespaces_filtered_by_access() {
        let cluster = MockCluster::new()
            .with_namespaces(&["a", "b", "c"])
            .allow("tok", &["a", "c"]);
        let (status, body) =
            send(router(user_config(), cluster), get_as("/api/v1/namespaces", "tok")).await;
        assert_eq!(status, StatusCode::OK);
        let mut names: Vec<String> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_user_route() {
        let cluster = MockCluster::new().with_user("tok", "alice").admin("tok");
        let (status, body) = send(router(user_config(), cluster), get_as("/api/v1/user", "tok")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({"data": {"userId": "alice", "clusterAdmin": true}})
        );
    }

    #[tokio::test]
    async fn test_mock_upstream_route() {
        let cluster = MockCluster::new().allow("tok", &["project-a"]);
        let (status, body) = send(
            router(user_config(), cluster),
            get_as("/api/v1/lsd/models?namespace=project-a", "tok"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_upstream_route_denied() {
        let cluster = MockCluster::new().allow("tok", &["project-a"]);
        let (status, body) = send(
            router(user_config(), cluster),
            get_as("/api/v1/evaluations/jobs?namespace=project-b", "tok"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_invalid_vector_store_limit() {
        let cluster = MockCluster::new().allow("tok", &["project-a"]);
        let (status, body) = send(
            router(user_config(), cluster),
            get_as("/api/v1/lsd/vectorstores?namespace=project-a&limit=500", "tok"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_mcp_servers_from_catalog() {
        let config = EnvConfig {
            mcp_configmap_namespace: Some("opendatahub".to_string()),
            ..user_config()
        };
        let cluster = MockCluster::new()
            .allow("tok", &["project-a"])
            .with_config_map(
                "opendatahub",
                "gen-ai-aa-mcp-servers",
                &[("k8s", "http://k8s-mcp:8080/mcp")],
            );
        let (status, body) = send(
            router(config, cluster),
            get_as("/api/v1/mcp/servers?namespace=project-a", "tok"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "k8s");
        assert_eq!(body["data"][0]["url"], "http://k8s-mcp:8080/mcp");
    }

    #[tokio::test]
    async fn test_mcp_status_unknown_server() {
        let cluster = MockCluster::new().allow("tok", &["project-a"]);
        let (status, body) = send(
            router(user_config(), cluster),
            get_as(
                "/api/v1/mcp/status?namespace=project-a&server_url=http%3A%2F%2Fnowhere%2Fmcp",
                "tok",
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_mcp_status_requires_server_url() {
        let cluster = MockCluster::new().allow("tok", &["project-a"]);
        let (status, _) = send(
            router(user_config(), cluster),
            get_as("/api/v1/mcp/status?namespace=project-a", "tok"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_enveloped() {
        let (status, body) = send(
            router(user_config(), MockCluster::new()),
            get_as("/api/v1/nope", "tok"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_wrong_method_is_enveloped() {
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/v1/namespaces")
            .header("Authorization", "Bearer tok")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(user_config(), MockCluster::new()), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"]["code"], "METHOD_NOT_ALLOWED");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let config = EnvConfig {
            allowed_origins: vec!["https://dashboard.example.com".to_string()],
            ..user_config()
        };
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/v1/namespaces")
            .header("Origin", "https://dashboard.example.com")
            .header("Access-Control-Request-Method", "GET")
            .header("Access-Control-Request-Headers", "kubeflow-userid")
            .body(Body::empty())
            .unwrap();
        let response = router(config, MockCluster::new()).oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://dashboard.example.com"
        );
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
        let allowed = response.headers()["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_string();
        assert!(allowed.contains("kubeflow-userid"));
        assert!(allowed.contains("x-mcp-bearer"));
    }
}
