//! Typed handles to the services the BFF fronts.
//!
//! Each service has a client trait exposing only what the routes need, a
//! reqwest implementation and a canned mock. Which one a request gets is
//! decided by the factory picked at startup from the `MOCK_<SERVICE>_CLIENT`
//! flags.

pub mod error;
pub mod evalhub;
pub mod http;
pub mod llamastack;
pub mod maas;
pub mod mlflow;

use std::fmt;
use std::sync::Arc;

use odh_bff_core::EnvConfig;
use odh_bff_kube::resources::{EVAL_HUB, LLAMA_STACK_DISTRIBUTION, MLFLOW};
use odh_bff_kube::CustomResourceKind;

use crate::tls::CaPool;

pub use error::UpstreamError;
pub use evalhub::EvalHubClient;
pub use http::UpstreamHttp;
pub use llamastack::LlamaStackClient;
pub use maas::MaasClient;
pub use mlflow::MlflowClient;

/// The upstream services a route may attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamKind {
    EvalHub,
    LlamaStack,
    Mlflow,
    Maas,
}

impl UpstreamKind {
    pub fn name(&self) -> &'static str {
        match self {
            UpstreamKind::EvalHub => "EvalHub",
            UpstreamKind::LlamaStack => "Llama Stack",
            UpstreamKind::Mlflow => "MLflow",
            UpstreamKind::Maas => "MaaS",
        }
    }

    /// Custom resource carrying `status.serviceURL`. MaaS has none; its URL is
    /// derived from the cluster domain.
    pub fn custom_resource(&self) -> Option<&'static CustomResourceKind> {
        match self {
            UpstreamKind::EvalHub => Some(&EVAL_HUB),
            UpstreamKind::LlamaStack => Some(&LLAMA_STACK_DISTRIBUTION),
            UpstreamKind::Mlflow => Some(&MLFLOW),
            UpstreamKind::Maas => None,
        }
    }

    /// Path appended to the discovered base URL.
    pub fn api_path(&self) -> &'static str {
        match self {
            UpstreamKind::EvalHub => "/api/v1",
            UpstreamKind::LlamaStack => "",
            UpstreamKind::Mlflow => "/api/2.0/mlflow",
            UpstreamKind::Maas => "/v1",
        }
    }

    /// `<SERVICE>_URL` override.
    pub fn url_override<'a>(&self, config: &'a EnvConfig) -> Option<&'a str> {
        match self {
            UpstreamKind::EvalHub => config.eval_hub_url.as_deref(),
            UpstreamKind::LlamaStack => config.llama_stack_url.as_deref(),
            UpstreamKind::Mlflow => config.mlflow_url.as_deref(),
            UpstreamKind::Maas => config.maas_url.as_deref(),
        }
        .filter(|url| !url.trim().is_empty())
    }

    /// `MOCK_<SERVICE>_CLIENT`.
    pub fn is_mocked(&self, config: &EnvConfig) -> bool {
        match self {
            UpstreamKind::EvalHub => config.mock_eval_hub_client,
            UpstreamKind::LlamaStack => config.mock_llama_stack_client,
            UpstreamKind::Mlflow => config.mock_mlflow_client,
            UpstreamKind::Maas => config.mock_maas_client,
        }
    }
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a factory needs to build one client for one caller.
#[derive(Debug, Clone)]
pub struct ClientTarget {
    /// Empty for mock clients.
    pub base_url: String,
    pub api_path: &'static str,
    /// Caller bearer. Empty in no-identity mode.
    pub token: String,
    pub insecure_skip_verify: bool,
    pub ca_pool: Arc<CaPool>,
}

impl ClientTarget {
    /// A target for mock clients, which ignore the URL and token.
    pub fn mock(kind: UpstreamKind) -> Self {
        Self {
            base_url: String::new(),
            api_path: kind.api_path(),
            token: String::new(),
            insecure_skip_verify: false,
            ca_pool: Arc::new(CaPool::default()),
        }
    }

    /// Base URL joined with the API path.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.api_path)
    }
}

/// Builds a `C` client for a [`ClientTarget`].
pub trait UpstreamClientFactory<C: ?Sized>: Send + Sync {
    fn create_client(&self, target: &ClientTarget) -> Result<Arc<C>, UpstreamError>;
}

/// Builds reqwest-backed clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpClientFactory;

/// Builds canned clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockClientFactory;

/// One factory per service, chosen at startup.
#[derive(Clone)]
pub struct Upstreams {
    pub eval_hub: Arc<dyn UpstreamClientFactory<dyn EvalHubClient>>,
    pub llama_stack: Arc<dyn UpstreamClientFactory<dyn LlamaStackClient>>,
    pub mlflow: Arc<dyn UpstreamClientFactory<dyn MlflowClient>>,
    pub maas: Arc<dyn UpstreamClientFactory<dyn MaasClient>>,
}

fn pick<C: ?Sized>(mock: bool) -> Arc<dyn UpstreamClientFactory<C>>
where
    HttpClientFactory: UpstreamClientFactory<C>,
    MockClientFactory: UpstreamClientFactory<C>,
{
    if mock {
        Arc::new(MockClientFactory)
    } else {
        Arc::new(HttpClientFactory)
    }
}

impl Upstreams {
    pub fn from_config(config: &EnvConfig) -> Self {
        Self {
            eval_hub: pick(config.mock_eval_hub_client),
            llama_stack: pick(config.mock_llama_stack_client),
            mlflow: pick(config.mock_mlflow_client),
            maas: pick(config.mock_maas_client),
        }
    }

    pub fn real() -> Self {
        Self::from_config(&EnvConfig::default())
    }

    pub fn mock() -> Self {
        Self {
            eval_hub: pick(true),
            llama_stack: pick(true),
            mlflow: pick(true),
            maas: pick(true),
        }
    }
}

/// The client `attach_upstream` put into request extensions.
#[derive(Clone)]
pub enum AttachedUpstream {
    EvalHub(Arc<dyn EvalHubClient>),
    LlamaStack(Arc<dyn LlamaStackClient>),
    Mlflow(Arc<dyn MlflowClient>),
    Maas(Arc<dyn MaasClient>),
}

impl AttachedUpstream {
    pub fn create(
        upstreams: &Upstreams,
        kind: UpstreamKind,
        target: &ClientTarget,
    ) -> Result<Self, UpstreamError> {
        Ok(match kind {
            UpstreamKind::EvalHub => Self::EvalHub(upstreams.eval_hub.create_client(target)?),
            UpstreamKind::LlamaStack => {
                Self::LlamaStack(upstreams.llama_stack.create_client(target)?)
            }
            UpstreamKind::Mlflow => Self::Mlflow(upstreams.mlflow.create_client(target)?),
            UpstreamKind::Maas => Self::Maas(upstreams.maas.create_client(target)?),
        })
    }

    /// Where the client sends requests. Empty for mocks.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::EvalHub(c) => c.endpoint(),
            Self::LlamaStack(c) => c.endpoint(),
            Self::Mlflow(c) => c.endpoint(),
            Self::Maas(c) => c.endpoint(),
        }
    }
}
