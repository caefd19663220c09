//! Models-as-a-Service API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::http::{UpstreamHttp, DEFAULT_TIMEOUT};
use super::{ClientTarget, HttpClientFactory, MockClientFactory, UpstreamClientFactory, UpstreamError};

const SERVICE: &str = "MaaS";

/// MaaS URL derived from the cluster ingress domain.
pub fn autodiscovered_url(cluster_domain: &str) -> String {
    format!("https://maas.{}/maas-api", cluster_domain.trim_matches('.'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaasModel {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub owned_by: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<MaasModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub level: i32,
}

#[derive(Debug, Deserialize)]
struct TierList {
    #[serde(default)]
    tiers: Vec<Tier>,
}

#[async_trait]
pub trait MaasClient: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn list_models(&self) -> Result<Vec<MaasModel>, UpstreamError>;

    async fn list_tiers(&self) -> Result<Vec<Tier>, UpstreamError>;
}

pub struct HttpMaasClient {
    http: UpstreamHttp,
}

impl HttpMaasClient {
    pub fn new(target: &ClientTarget) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: UpstreamHttp::new(SERVICE, target, DEFAULT_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl MaasClient for HttpMaasClient {
    fn endpoint(&self) -> &str {
        self.http.endpoint()
    }

    async fn list_models(&self) -> Result<Vec<MaasModel>, UpstreamError> {
        let list: ModelList = self.http.get_json("/models", &[]).await?;
        Ok(list.data)
    }

    async fn list_tiers(&self) -> Result<Vec<Tier>, UpstreamError> {
        let list: TierList = self.http.get_json("/tiers", &[]).await?;
        Ok(list.tiers)
    }
}

impl UpstreamClientFactory<dyn MaasClient> for HttpClientFactory {
    fn create_client(&self, target: &ClientTarget) -> Result<Arc<dyn MaasClient>, UpstreamError> {
        Ok(Arc::new(HttpMaasClient::new(target)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockMaasClient;

#[async_trait]
impl MaasClient for MockMaasClient {
    fn endpoint(&self) -> &str {
        ""
    }

    async fn list_models(&self) -> Result<Vec<MaasModel>, UpstreamError> {
        Ok(vec![
            MaasModel {
                id: "granite-3.3-8b-instruct".to_string(),
                object: "model".to_string(),
                created: 1755721063,
                owned_by: "maas".to_string(),
                ready: true,
                url: Some("https://maas.apps.example.com/granite-3.3-8b-instruct".to_string()),
            },
            MaasModel {
                id: "llama-3.1-8b-instruct".to_string(),
                object: "model".to_string(),
                created: 1755721063,
                owned_by: "maas".to_string(),
                ready: false,
                url: None,
            },
        ])
    }

    async fn list_tiers(&self) -> Result<Vec<Tier>, UpstreamError> {
        let tier = |name: &str, display: &str, level: i32, groups: &[&str]| Tier {
            name: name.to_string(),
            display_name: Some(display.to_string()),
            description: format!("{display} tier"),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            level,
        };
        Ok(vec![
            tier("free", "Free", 0, &["system:authenticated"]),
            tier("premium", "Premium", 10, &["premium-users"]),
            tier("enterprise", "Enterprise", 20, &["enterprise-users"]),
        ])
    }
}

impl UpstreamClientFactory<dyn MaasClient> for MockClientFactory {
    fn create_client(&self, _target: &ClientTarget) -> Result<Arc<dyn MaasClient>, UpstreamError> {
        Ok(Arc::new(MockMaasClient))
    }
}
