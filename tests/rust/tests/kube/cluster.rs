use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use odh_bff_core::constants::DASHBOARD_LABEL_SELECTOR;
use odh_bff_core::{AuthMethod, EnvConfig};
use odh_bff_gateway::Upstreams;
use odh_bff_kube::{InternalClientFactory, KubeApiClient, TokenClientFactory};
use odh_bff_tests::{get_as, router_with_factory, send, user_config};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base_config(server: &MockServer) -> kube::Config {
    kube::Config::new(server.uri().parse().unwrap())
}

fn namespace_list(names: &[&str]) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "NamespaceList",
        "metadata": {},
        "items": names
            .iter()
            .map(|n| json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": n}}))
            .collect::<Vec<_>>()
    })
}

fn review(kind: &str, allowed: bool) -> ResponseTemplate {
    ResponseTemplate::new(201).set_body_json(json!({
        "apiVersion": "authorization.k8s.io/v1",
        "kind": kind,
        "spec": {},
        "status": { "allowed": allowed }
    }))
}

async fn mount_self_reviews(server: &MockServer, token: &str, verdicts: &[(&str, bool)]) {
    for (namespace, allowed) in verdicts {
        Mock::given(method("POST"))
            .and(path("/apis/authorization.k8s.io/v1/selfsubjectaccessreviews"))
            .and(header("Authorization", format!("Bearer {token}").as_str()))
            .and(body_partial_json(json!({
                "spec": { "resourceAttributes": { "namespace": namespace } }
            })))
            .respond_with(review("SelfSubjectAccessReview", *allowed))
            .mount(server)
            .await;
    }
}

fn token_router(server: &MockServer, config: EnvConfig, upstreams: Upstreams) -> axum::Router {
    let k8s = Arc::new(TokenClientFactory::new(config.identity_config(), base_config(server)));
    router_with_factory(config, k8s, upstreams)
}

fn sorted_names(body: &Value) -> Vec<String> {
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
async fn test_namespaces_filtered_by_self_reviews() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_list(&["a", "b", "c"])))
        .mount(&server)
        .await;
    mount_self_reviews(&server, "tok", &[("a", true), ("b", false), ("c", true)]).await;

    let (status, body) = send(
        token_router(&server, user_config(), Upstreams::mock()),
        get_as("/api/v1/namespaces", "tok"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted_names(&body), vec!["a", "c"]);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apis/authorization.k8s.io/v1/selfsubjectaccessreviews"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": "Unauthorized",
            "reason": "Unauthorized",
            "code": 401
        })))
        .mount(&server)
        .await;

    let (status, body) = send(
        token_router(&server, user_config(), Upstreams::mock()),
        get_as("/api/v1/lsd/models?namespace=a", "expired"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_custom_resource_discovery_end_to_end() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/evaluations/jobs"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "resource": {"id": "job-1", "created_at": "2026-01-01T00:00:00Z"},
                "status": {"state": "running"},
                "model": {"name": "granite"},
                "benchmarks": [{"id": "mmlu", "provider_id": "lm_evaluation_harness"}]
            }]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apis/authorization.k8s.io/v1/selfsubjectaccessreviews"))
        .and(body_partial_json(json!({
            "spec": { "resourceAttributes": {
                "verb": "list",
                "group": "trustyai.opendatahub.io",
                "resource": "evalhubs",
                "namespace": "n1"
            }}
        })))
        .respond_with(review("SelfSubjectAccessReview", true))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apis/trustyai.opendatahub.io/v1alpha1/namespaces/n1/evalhubs"))
        .and(query_param("labelSelector", DASHBOARD_LABEL_SELECTOR))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "trustyai.opendatahub.io/v1alpha1",
            "kind": "EvalHubList",
            "metadata": {},
            "items": [{
                "apiVersion": "trustyai.opendatahub.io/v1alpha1",
                "kind": "EvalHub",
                "metadata": {"name": "eh", "namespace": "n1"},
                "status": {"serviceURL": upstream.uri()}
            }]
        })))
        .mount(&server)
        .await;

    let (status, body) = send(
        token_router(&server, user_config(), Upstreams::real()),
        get_as("/api/v1/evaluations/jobs?namespace=n1", "tok"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["resource"]["id"], "job-1");
    assert_eq!(body["data"][0]["status"]["state"], "running");
}

#[tokio::test]
async fn test_internal_auth_uses_subject_reviews() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(namespace_list(&["a", "b"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/apis/rbac.authorization.k8s.io/v1/clusterrolebindings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "ClusterRoleBindingList",
            "metadata": {},
            "items": []
        })))
        .mount(&server)
        .await;
    for (namespace, allowed) in [("a", false), ("b", true)] {
        Mock::given(method("POST"))
            .and(path("/apis/authorization.k8s.io/v1/subjectaccessreviews"))
            .and(body_partial_json(json!({
                "spec": {
                    "user": "alice",
                    "groups": ["team"],
                    "resourceAttributes": { "namespace": namespace }
                }
            })))
            .respond_with(review("SubjectAccessReview", allowed))
            .mount(&server)
            .await;
    }

    let config = EnvConfig {
        auth_method: AuthMethod::Internal,
        ..Default::default()
    };
    let client = kube::Client::try_from(base_config(&server)).unwrap();
    let k8s = Arc::new(InternalClientFactory::new(
        config.identity_config(),
        Arc::new(KubeApiClient::service_account(client)),
    ));
    let request = Request::builder()
        .uri("/api/v1/namespaces")
        .header("kubeflow-userid", "alice")
        .header("kubeflow-groups", "team")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(router_with_factory(config, k8s, Upstreams::mock()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(sorted_names(&body), vec!["b"]);
}
