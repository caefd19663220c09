//! Llama Stack through its OpenAI-compatible API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::http::{UpstreamHttp, DEFAULT_TIMEOUT};
use super::{ClientTarget, HttpClientFactory, MockClientFactory, UpstreamClientFactory, UpstreamError};
use odh_bff_core::ErrorCode;

const SERVICE: &str = "Llama Stack";

/// OpenAI-compatible surface under the distribution's service URL.
const OPENAI_PATH: &str = "/v1/openai/v1";

/// Largest page the vector store listing accepts.
const MAX_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub owned_by: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStoreFileCounts {
    #[serde(default)]
    pub in_progress: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub cancelled: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub usage_bytes: u64,
    #[serde(default)]
    pub file_counts: VectorStoreFileCounts,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

/// Vector store listing options. `limit` is the page size (1-100).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListVectorStoresParams {
    pub limit: Option<u32>,
    /// `asc` or `desc`.
    pub order: Option<String>,
}

impl ListVectorStoresParams {
    fn validate(&self) -> Result<(), UpstreamError> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_PAGE).contains(&limit) {
                return Err(invalid(format!("limit must be between 1 and 100, got: {limit}")));
            }
        }
        if let Some(order) = self.order.as_deref() {
            if order != "asc" && order != "desc" {
                return Err(invalid(format!("order must be 'asc' or 'desc', got: {order}")));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> UpstreamError {
    UpstreamError::new(SERVICE, ErrorCode::InvalidRequest, message.clone(), message)
}

#[async_trait]
pub trait LlamaStackClient: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn list_models(&self) -> Result<Vec<Model>, UpstreamError>;

    /// Every vector store, following `has_more` across pages.
    async fn list_vector_stores(
        &self,
        params: &ListVectorStoresParams,
    ) -> Result<Vec<VectorStore>, UpstreamError>;
}

pub struct HttpLlamaStackClient {
    http: UpstreamHttp,
}

impl HttpLlamaStackClient {
    pub fn new(target: &ClientTarget) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: UpstreamHttp::new(SERVICE, target, DEFAULT_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl LlamaStackClient for HttpLlamaStackClient {
    fn endpoint(&self) -> &str {
        self.http.endpoint()
    }

    async fn list_models(&self) -> Result<Vec<Model>, UpstreamError> {
        let page: Page<Model> = self
            .http
            .get_json(&format!("{OPENAI_PATH}/models"), &[])
            .await?;
        Ok(page.data)
    }

    async fn list_vector_stores(
        &self,
        params: &ListVectorStoresParams,
    ) -> Result<Vec<VectorStore>, UpstreamError> {
        params.validate()?;
        let path = format!("{OPENAI_PATH}/vector_stores");
        let limit = params.limit.unwrap_or(MAX_PAGE).to_string();

        let mut stores: Vec<VectorStore> = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut query = vec![("limit", limit.clone())];
            if let Some(order) = &params.order {
                query.push(("order", order.clone()));
            }
            if let Some(cursor) = &after {
                query.push(("after", cursor.clone()));
            }

            let page: Page<VectorStore> = self.http.get_json(&path, &query).await?;
            let last = page.data.last().map(|s| s.id.clone());
            stores.extend(page.data);

            match (page.has_more, last) {
                (true, Some(cursor)) => after = Some(cursor),
                _ => break,
            }
        }
        Ok(stores)
    }
}

impl UpstreamClientFactory<dyn LlamaStackClient> for HttpClientFactory {
    fn create_client(
        &self,
        target: &ClientTarget,
    ) -> Result<Arc<dyn LlamaStackClient>, UpstreamError> {
        Ok(Arc::new(HttpLlamaStackClient::new(target)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockLlamaStackClient;

const MOCK_CREATED: i64 = 1755721063;

#[async_trait]
impl LlamaStackClient for MockLlamaStackClient {
    fn endpoint(&self) -> &str {
        ""
    }

    async fn list_models(&self) -> Result<Vec<Model>, UpstreamError> {
        Ok([
            "ollama/llama3.2:3b",
            "ollama/all-minilm:l6-v2",
            "vllm/granite-3.3-8b-instruct",
            "vllm/mistral-7b-instruct",
        ]
        .into_iter()
        .map(|id| Model {
            id: id.to_string(),
            object: "model".to_string(),
            created: MOCK_CREATED,
            owned_by: "llama_stack".to_string(),
        })
        .collect())
    }

    async fn list_vector_stores(
        &self,
        params: &ListVectorStoresParams,
    ) -> Result<Vec<VectorStore>, UpstreamError> {
        params.validate()?;
        Ok(vec![VectorStore {
            id: "vs_mock123".to_string(),
            object: "vector_store".to_string(),
            created_at: 1755721097,
            name: "Mock Vector Store".to_string(),
            usage_bytes: 0,
            file_counts: VectorStoreFileCounts {
                completed: 1,
                total: 1,
                ..Default::default()
            },
            status: "completed".to_string(),
            metadata: BTreeMap::from([
                ("provider_id".to_string(), "milvus".to_string()),
                ("provider_vector_db_id".to_string(), "vs_mock123".to_string()),
            ]),
        }])
    }
}

impl UpstreamClientFactory<dyn LlamaStackClient> for MockClientFactory {
    fn create_client(
        &self,
        _target: &ClientTarget,
    ) -> Result<Arc<dyn LlamaStackClient>, UpstreamError> {
        Ok(Arc::new(MockLlamaStackClient))
    }
}
