//! EvalHub: evaluation jobs, providers and benchmark collections.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::http::{UpstreamHttp, DEFAULT_TIMEOUT};
use super::{ClientTarget, HttpClientFactory, MockClientFactory, UpstreamClientFactory, UpstreamError};

const SERVICE: &str = "EvalHub";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResource {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderBenchmark {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub num_few_shot: u32,
    #[serde(default)]
    pub dataset_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub resource: ProviderResource,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub benchmarks: Vec<ProviderBenchmark>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub items: Vec<Provider>,
    #[serde(default)]
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionBenchmark {
    pub id: String,
    pub provider_id: String,
    #[serde(default)]
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub resource: ProviderResource,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub benchmarks: Vec<CollectionBenchmark>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsResponse {
    #[serde(default)]
    pub items: Vec<Collection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResource {
    pub id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobModel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBenchmark {
    pub id: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationJob {
    pub resource: JobResource,
    pub status: JobStatus,
    pub model: JobModel,
    #[serde(default)]
    pub benchmarks: Vec<JobBenchmark>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub items: Vec<EvaluationJob>,
}

#[async_trait]
pub trait EvalHubClient: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn health_check(&self) -> Result<HealthResponse, UpstreamError>;

    async fn list_collections(&self) -> Result<CollectionsResponse, UpstreamError>;

    async fn list_providers(&self, limit: usize, offset: usize)
        -> Result<ProvidersResponse, UpstreamError>;

    async fn list_evaluation_jobs(&self) -> Result<Vec<EvaluationJob>, UpstreamError>;
}

pub struct HttpEvalHubClient {
    http: UpstreamHttp,
}

impl HttpEvalHubClient {
    pub fn new(target: &ClientTarget) -> Result<Self, UpstreamError> {
        Ok(Self {
            http: UpstreamHttp::new(SERVICE, target, DEFAULT_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl EvalHubClient for HttpEvalHubClient {
    fn endpoint(&self) -> &str {
        self.http.endpoint()
    }

    async fn health_check(&self) -> Result<HealthResponse, UpstreamError> {
        self.http.get_json("/health", &[]).await
    }

    async fn list_collections(&self) -> Result<CollectionsResponse, UpstreamError> {
        self.http.get_json("/evaluations/collections", &[]).await
    }

    async fn list_providers(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<ProvidersResponse, UpstreamError> {
        self.http
            .get_json(
                "/evaluations/providers",
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await
    }

    async fn list_evaluation_jobs(&self) -> Result<Vec<EvaluationJob>, UpstreamError> {
        let response: JobsResponse = self.http.get_json("/evaluations/jobs", &[]).await?;
        Ok(response.items)
    }
}

impl UpstreamClientFactory<dyn EvalHubClient> for HttpClientFactory {
    fn create_client(&self, target: &ClientTarget) -> Result<Arc<dyn EvalHubClient>, UpstreamError> {
        Ok(Arc::new(HttpEvalHubClient::new(target)?))
    }
}

/// Canned EvalHub for development. Paging arguments are accepted but ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockEvalHubClient;

#[async_trait]
impl EvalHubClient for MockEvalHubClient {
    fn endpoint(&self) -> &str {
        ""
    }

    async fn health_check(&self) -> Result<HealthResponse, UpstreamError> {
        Ok(HealthResponse {
            status: "healthy".to_string(),
        })
    }

    async fn list_collections(&self) -> Result<CollectionsResponse, UpstreamError> {
        Ok(CollectionsResponse {
            items: mock_collections(),
        })
    }

    async fn list_providers(
        &self,
        _limit: usize,
        _offset: usize,
    ) -> Result<ProvidersResponse, UpstreamError> {
        let items = mock_providers();
        let total_count = items.iter().map(|p| p.benchmarks.len()).sum();
        Ok(ProvidersResponse { items, total_count })
    }

    async fn list_evaluation_jobs(&self) -> Result<Vec<EvaluationJob>, UpstreamError> {
        Ok(mock_jobs())
    }
}

impl UpstreamClientFactory<dyn EvalHubClient> for MockClientFactory {
    fn create_client(&self, _target: &ClientTarget) -> Result<Arc<dyn EvalHubClient>, UpstreamError> {
        Ok(Arc::new(MockEvalHubClient))
    }
}

fn benchmark(
    id: &str,
    name: &str,
    category: &str,
    metrics: &[&str],
    num_few_shot: u32,
    dataset_size: u64,
) -> ProviderBenchmark {
    ProviderBenchmark {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        category: category.to_string(),
        metrics: metrics.iter().map(|m| m.to_string()).collect(),
        num_few_shot,
        dataset_size,
    }
}

fn mock_providers() -> Vec<Provider> {
    vec![
        Provider {
            resource: ProviderResource {
                id: "lm_evaluation_harness".to_string(),
            },
            name: "lm_evaluation_harness".to_string(),
            title: "LM Evaluation Harness".to_string(),
            description: "EleutherAI's unified framework for testing generative language models."
                .to_string(),
            tags: vec!["Open Source".to_string(), "Standard".to_string()],
            benchmarks: vec![
                benchmark("truthfulqa_mc1", "Truthfulness Testing", "Safety", &["Factual accuracy", "Hallucination rate"], 0, 817),
                benchmark("hellaswag", "Common sense Reasoning", "Quality", &["Common sense reasoning", "Physical reasoning"], 10, 10042),
                benchmark("gsm8k", "Math Reasoning", "Capability", &["Numerical accuracy", "Step-by-step reasoning"], 5, 1319),
                benchmark("mmlu", "Language Understanding", "Capability", &["World knowledge", "Domain breadth"], 5, 14042),
            ],
        },
        Provider {
            resource: ProviderResource {
                id: "safety_eval_suite".to_string(),
            },
            name: "safety_eval_suite".to_string(),
            title: "Safety Evaluation Suite".to_string(),
            description: "Benchmarks for harmful and unreliable model behaviour.".to_string(),
            tags: vec!["Safety".to_string(), "Red Teaming".to_string()],
            benchmarks: vec![
                benchmark("toxigen", "Toxicity Detection", "Safety", &["Toxicity score", "Implicit bias"], 0, 274186),
                benchmark("harmbench", "Jailbreak Resistance", "Safety", &["Refusal rate", "Harm score"], 0, 510),
            ],
        },
    ]
}

fn mock_collections() -> Vec<Collection> {
    let collection = |id: &str, name: &str, description: &str, tags: &[&str], benchmarks: &[&str]| {
        Collection {
            resource: ProviderResource { id: id.to_string() },
            name: name.to_string(),
            description: description.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            benchmarks: benchmarks
                .iter()
                .map(|b| CollectionBenchmark {
                    id: b.to_string(),
                    provider_id: "lm_evaluation_harness".to_string(),
                    weight: 1,
                })
                .collect(),
        }
    };
    vec![
        collection(
            "collection-001",
            "General Capability",
            "Broad reasoning, knowledge and math coverage.",
            &["General"],
            &["hellaswag", "gsm8k", "mmlu"],
        ),
        collection(
            "collection-002",
            "Safety and Fairness",
            "Evaluates model safety, bias, and fairness across diverse scenarios.",
            &["Bias", "Fairness"],
            &["bbq", "winobias", "toxigen", "crows_pairs"],
        ),
    ]
}

fn mock_jobs() -> Vec<EvaluationJob> {
    let job = |id: &str, created_at: &str, state: &str, model: &str, benchmark: &str| EvaluationJob {
        resource: JobResource {
            id: id.to_string(),
            created_at: created_at.to_string(),
            updated_at: None,
        },
        status: JobStatus {
            state: state.to_string(),
        },
        model: JobModel {
            name: model.to_string(),
        },
        benchmarks: vec![JobBenchmark {
            id: benchmark.to_string(),
            provider_id: "lm_evaluation_harness".to_string(),
        }],
    };
    vec![
        job("eval-job-001", "2026-02-20T10:00:00Z", "completed", "meta-llama/Llama-3.1-8B-Instruct", "arc_easy"),
        job("eval-job-002", "2026-02-24T08:00:00Z", "running", "mistralai/Mistral-7B-v0.1", "hellaswag"),
        job("eval-job-003", "2026-02-24T09:15:00Z", "pending", "meta-llama/Llama-3.1-70B-Instruct", "mmlu"),
    ]
}
