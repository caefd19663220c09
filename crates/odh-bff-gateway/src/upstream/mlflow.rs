//! MLflow prompt registry.
//!
//! Prompts are registered models tagged `mlflow.prompt.is_prompt=true`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::http::{UpstreamHttp, DEFAULT_TIMEOUT};
use super::{ClientTarget, HttpClientFactory, MockClientFactory, UpstreamClientFactory, UpstreamError};

const SERVICE: &str = "MLflow";

const PROMPT_FILTER: &str = "tags.`mlflow.prompt.is_prompt` = 'true'";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creation_timestamp: i64,
    #[serde(default)]
    pub last_updated_timestamp: i64,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsPage {
    #[serde(default, rename(deserialize = "registered_models"))]
    pub prompts: Vec<Prompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPromptsParams {
    /// Substring matched against the prompt name.
    pub name_contains: Option<String>,
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
}

impl SearchPromptsParams {
    fn filter(&self) -> String {
        match self.name_contains.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => format!("{PROMPT_FILTER} AND name ILIKE '%{}%'", name.replace('\'', "")),
            None => PROMPT_FILTER.to_string(),
        }
    }
}

#[async_trait]
pub trait MlflowClient: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn search_prompts(&self, params: &SearchPromptsParams) -> Result<PromptsPage, UpstreamError>;
}

pub struct HttpMlflowClient {
    http: UpstreamHttp,
}

impl HttpMlflowClient {
    pub fn new(target: &ClientTarget) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: UpstreamHttp::new(SERVICE, target, DEFAULT_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl MlflowClient for HttpMlflowClient {
    fn endpoint(&self) -> &str {
        self.http.endpoint()
    }

    async fn search_prompts(&self, params: &SearchPromptsParams) -> Result<PromptsPage, UpstreamError> {
        let mut query = vec![("filter", params.filter())];
        if let Some(max) = params.max_results {
            query.push(("max_results", max.to_string()));
        }
        if let Some(token) = &params.page_token {
            query.push(("page_token", token.clone()));
        }
        self.http.get_json("/registered-models/search", &query).await
    }
}

impl UpstreamClientFactory<dyn MlflowClient> for HttpClientFactory {
    fn create_client(&self, target: &ClientTarget) -> Result<Arc<dyn MlflowClient>, UpstreamError> {
        Ok(Arc::new(HttpMlflowClient::new(target)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockMlflowClient;

#[async_trait]
impl MlflowClient for MockMlflowClient {
    fn endpoint(&self) -> &str {
        ""
    }

    async fn search_prompts(&self, params: &SearchPromptsParams) -> Result<PromptsPage, UpstreamError> {
        let prompt = |name: &str, description: &str| Prompt {
            name: name.to_string(),
            description: description.to_string(),
            creation_timestamp: 1755721063000,
            last_updated_timestamp: 1755721063000,
            tags: vec![Tag {
                key: "mlflow.prompt.is_prompt".to_string(),
                value: "true".to_string(),
            }],
        };
        let prompts = vec![
            prompt("summarize-ticket", "Summarize a support ticket in three bullet points"),
            prompt("sql-assistant", "Translate a question into a read-only SQL query"),
        ]
        .into_iter()
        .filter(|p| match params.name_contains.as_deref() {
            Some(needle) => p.name.contains(needle),
            None => true,
        })
        .collect();
        Ok(PromptsPage {
            prompts,
            next_page_token: None,
        })
    }
}

impl UpstreamClientFactory<dyn MlflowClient> for MockClientFactory {
    fn create_client(&self, _target: &ClientTarget) -> Result<Arc<dyn MlflowClient>, UpstreamError> {
        Ok(Arc::new(MockMlflowClient))
    }
}
