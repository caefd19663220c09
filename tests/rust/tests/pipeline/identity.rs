//! Identity extraction across auth modes.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use odh_bff_core::{AuthMethod, EnvConfig};
use odh_bff_kube::MockCluster;
use odh_bff_tests::{get, get_as, mock_router, send, user_config};
use pretty_assertions::assert_eq;
use serde_json::json;

fn internal_config() -> EnvConfig {
    EnvConfig {
        auth_method: AuthMethod::Internal,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_health_answers_without_identity() {
    for path in ["/healthcheck", "/api/v1/health"] {
        let (status, body) = send(mock_router(user_config(), MockCluster::new()), get(path)).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(
            body,
            json!({"status": "available", "system_info": {"version": "1.0.0"}})
        );
    }
}

#[tokio::test]
async fn test_missing_authorization_is_rejected_before_handlers() {
    let cluster = MockCluster::new().with_namespaces(&["a"]);
    let (status, body) = send(mock_router(user_config(), cluster), get("/api/v1/namespaces")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": {"code": "INVALID_REQUEST", "message": "missing required Header: Authorization"}})
    );
}

#[tokio::test]
async fn test_bearer_prefix_is_required() {
    let request = Request::builder()
        .uri("/api/v1/user")
        .header("Authorization", "tok")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(mock_router(user_config(), MockCluster::new()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_token_resolves_to_username() {
    let cluster = MockCluster::new().with_user("tok", "alice");
    let (status, body) = send(mock_router(user_config(), cluster), get_as("/api/v1/user", "tok")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": {"userId": "alice", "clusterAdmin": false}}));
}

#[tokio::test]
async fn test_internal_auth_reads_user_header() {
    let request = Request::builder()
        .uri("/api/v1/user")
        .header("kubeflow-userid", "bob@example.com")
        .header("kubeflow-groups", "team-a, team-b")
        .body(Body::empty())
        .unwrap();
    let cluster = MockCluster::new().admin("bob@example.com");
    let (status, body) = send(mock_router(internal_config(), cluster), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"data": {"userId": "bob@example.com", "clusterAdmin": true}})
    );
}

#[tokio::test]
async fn test_internal_auth_without_user_header() {
    let (status, body) = send(
        mock_router(internal_config(), MockCluster::new()),
        get("/api/v1/user"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "missing required Header: kubeflow-userid"
    );
}

#[tokio::test]
async fn test_disabled_auth_needs_no_headers() {
    let config = EnvConfig {
        auth_method: AuthMethod::Disabled,
        ..Default::default()
    };
    let cluster = MockCluster::new().with_namespaces(&["a", "b"]);
    let (status, body) = send(mock_router(config, cluster), get("/api/v1/namespaces")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": [{"name": "a"}, {"name": "b"}]}));
}
