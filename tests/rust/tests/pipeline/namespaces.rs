//! Namespace fan-out and the per-namespace authorization gate.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use odh_bff_core::{AuthMethod, EnvConfig};
use odh_bff_kube::MockCluster;
use odh_bff_tests::{get_as, mock_router, send, user_config};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn names(body: &Value) -> Vec<String> {
    let mut names: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_only_accessible_namespaces_are_listed() {
    let cluster = MockCluster::new()
        .with_namespaces(&["a", "b", "c"])
        .allow("tok", &["a", "c"]);
    let (status, body) = send(mock_router(user_config(), cluster), get_as("/api/v1/namespaces", "tok")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["a", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_reviews_fail_instead_of_returning_partial_list() {
    let cluster = MockCluster::new()
        .with_namespaces(&["a", "b", "c"])
        .allow("tok", &["a", "b", "c"])
        .with_review_delay(std::time::Duration::from_secs(60));
    let (status, body) = send(mock_router(user_config(), cluster), get_as("/api/v1/namespaces", "tok")).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"]["code"], "TIMEOUT");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_no_access_is_an_empty_list() {
    let cluster = MockCluster::new().with_namespaces(&["a", "b"]);
    let (status, body) = send(mock_router(user_config(), cluster), get_as("/api/v1/namespaces", "tok")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": []}));
}

#[tokio::test]
async fn test_failed_review_omits_namespace() {
    let cluster = MockCluster::new()
        .with_namespaces(&["a", "b", "c"])
        .allow("tok", &["a", "b", "c"])
        .failing("b");
    let (status, body) = send(mock_router(user_config(), cluster), get_as("/api/v1/namespaces", "tok")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["a", "c"]);
}

#[tokio::test]
async fn test_cluster_admin_sees_everything() {
    let config = EnvConfig {
        auth_method: AuthMethod::Internal,
        ..Default::default()
    };
    let request = Request::builder()
        .uri("/api/v1/namespaces")
        .header("kubeflow-userid", "admin")
        .body(Body::empty())
        .unwrap();
    let cluster = MockCluster::new()
        .with_namespaces(&["a", "b", "c"])
        .admin("admin");
    let (status, body) = send(mock_router(config, cluster), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_namespace_parameter_is_required() {
    let cluster = MockCluster::new().allow("tok", &["a"]);
    let (status, body) = send(mock_router(user_config(), cluster), get_as("/api/v1/lsd/models", "tok")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"error": {"code": "INVALID_REQUEST", "message": "missing required query parameter: namespace"}})
    );
}

#[tokio::test]
async fn test_namespace_must_be_a_dns_label() {
    let cluster = MockCluster::new().allow("tok", &["a"]);
    let (status, body) = send(
        mock_router(user_config(), cluster),
        get_as("/api/v1/lsd/models?namespace=Not_Valid", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_namespace_without_access_is_forbidden() {
    let cluster = MockCluster::new().allow("tok", &["a"]);
    let (status, body) = send(
        mock_router(user_config(), cluster),
        get_as("/api/v1/maas/models?namespace=b", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({"error": {
            "code": "FORBIDDEN",
            "message": "user does not have permission to access services in this namespace"
        }})
    );
}

#[tokio::test]
async fn test_granted_namespace_reaches_handler() {
    let cluster = MockCluster::new().allow("tok", &["a"]);
    let (status, body) = send(
        mock_router(user_config(), cluster),
        get_as("/api/v1/evaluations/jobs?namespace=a", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].is_array());
}
