//! Service discovery and upstream attachment against wiremock upstreams.

use std::sync::Arc;

use axum::http::StatusCode;
use odh_bff_core::EnvConfig;
use odh_bff_gateway::{AttachedUpstream, CaPool, ClientTarget, UpstreamKind, Upstreams};
use odh_bff_kube::resources::{EVAL_HUB, LLAMA_STACK_DISTRIBUTION};
use odh_bff_kube::{resolve_service_url, MockCluster, MockKubernetesClient};
use odh_bff_tests::{get_as, router, send, user_config};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dashboard_resource(kind: &str, name: &str, service_url: &str) -> Value {
    json!({
        "kind": kind,
        "metadata": {
            "name": name,
            "labels": { "opendatahub.io/dashboard": "true" }
        },
        "status": { "serviceURL": service_url }
    })
}

#[tokio::test]
async fn test_discovered_url_gets_service_api_path() {
    let client = MockKubernetesClient::new(MockCluster::new().with_resource(
        &EVAL_HUB,
        "n1",
        dashboard_resource("EvalHub", "eh", "http://eh.n1:8080"),
    ));
    let base_url = resolve_service_url(&client, &EVAL_HUB, "n1").await.unwrap();

    let target = ClientTarget {
        base_url,
        api_path: UpstreamKind::EvalHub.api_path(),
        token: "tok".to_string(),
        insecure_skip_verify: false,
        ca_pool: Arc::new(CaPool::default()),
    };
    let attached = AttachedUpstream::create(&Upstreams::real(), UpstreamKind::EvalHub, &target)
        .unwrap();
    assert_eq!(attached.endpoint(), "http://eh.n1:8080/api/v1");
}

#[tokio::test]
async fn test_request_reaches_discovered_service_with_caller_token() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .expect(1)
        .mount(&upstream)
        .await;

    let cluster = MockCluster::new().allow("tok", &["n1"]).with_resource(
        &EVAL_HUB,
        "n1",
        dashboard_resource("EvalHub", "eh", &upstream.uri()),
    );
    let (status, body) = send(
        router(user_config(), cluster, Upstreams::real()),
        get_as("/api/v1/evaluations/health?namespace=n1", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": {"status": "healthy"}}));
}

#[tokio::test]
async fn test_missing_custom_resource_is_not_found() {
    let cluster = MockCluster::new().allow("tok", &["n1"]);
    let (status, body) = send(
        router(user_config(), cluster, Upstreams::real()),
        get_as("/api/v1/evaluations/jobs?namespace=n1", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_url_override_skips_discovery() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/openai/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "llama-3.1-8b", "object": "model", "created": 1, "owned_by": "llama_stack"}]
        })))
        .mount(&upstream)
        .await;

    let config = EnvConfig {
        llama_stack_url: Some(upstream.uri()),
        ..user_config()
    };
    // The resource points elsewhere; the override must win.
    let cluster = MockCluster::new().allow("tok", &["n1"]).with_resource(
        &LLAMA_STACK_DISTRIBUTION,
        "n1",
        dashboard_resource("LlamaStackDistribution", "lsd", "http://unused.invalid"),
    );
    let (status, body) = send(
        router(config, cluster, Upstreams::real()),
        get_as("/api/v1/lsd/models?namespace=n1", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], "llama-3.1-8b");
}

#[tokio::test]
async fn test_unavailable_upstream_is_enveloped() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&upstream)
        .await;

    let cluster = MockCluster::new().allow("tok", &["n1"]).with_resource(
        &EVAL_HUB,
        "n1",
        dashboard_resource("EvalHub", "eh", &upstream.uri()),
    );
    let (status, body) = send(
        router(user_config(), cluster, Upstreams::real()),
        get_as("/api/v1/evaluations/jobs?namespace=n1", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({"error": {"code": "SERVER_UNAVAILABLE", "message": "EvalHub is currently unavailable"}})
    );
}

#[tokio::test]
async fn test_access_is_checked_before_discovery() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(0)
        .mount(&upstream)
        .await;

    let cluster = MockCluster::new().allow("tok", &["n1"]).with_resource(
        &EVAL_HUB,
        "n2",
        dashboard_resource("EvalHub", "eh", &upstream.uri()),
    );
    let (status, _) = send(
        router(user_config(), cluster, Upstreams::real()),
        get_as("/api/v1/evaluations/jobs?namespace=n2", "tok"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
