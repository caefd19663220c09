//! Process-wide state shared by every route.

use std::sync::Arc;
use tracing::info;

use odh_bff_core::{AuthMethod, EnvConfig};
use odh_bff_kube::{
    discovery, InternalClientFactory, KubernetesClientFactory, MockClientFactory, MockCluster,
    NamespaceAccessor, TokenClientFactory,
};
use odh_bff_mcp::{McpClient, McpClientConfig, SessionMcpClient};

use crate::tls::CaPool;
use crate::upstream::Upstreams;

/// Everything handlers and middleware read. Written once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvConfig>,
    pub k8s: Arc<dyn KubernetesClientFactory>,
    pub mcp: Arc<dyn McpClient>,
    pub upstreams: Upstreams,
    pub ca_pool: Arc<CaPool>,
    pub namespace_accessor: NamespaceAccessor,
    /// Where the pod runs. Home of the MCP ConfigMap unless overridden.
    pub dashboard_namespace: String,
}

impl axum::extract::FromRef<AppState> for Arc<EnvConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<dyn KubernetesClientFactory> {
    fn from_ref(state: &AppState) -> Self {
        state.k8s.clone()
    }
}

impl AppState {
    pub fn new(
        config: EnvConfig,
        k8s: Arc<dyn KubernetesClientFactory>,
        mcp: Arc<dyn McpClient>,
        upstreams: Upstreams,
    ) -> Self {
        let ca_pool = Arc::new(CaPool::from_bundles(&config.bundle_paths));
        // The admin shortcut relies on ClusterRoleBinding reads only the
        // service account can do.
        let namespace_accessor =
            NamespaceAccessor::default().with_admin_fast_path(config.auth_method == AuthMethod::Internal);
        Self {
            config: Arc::new(config),
            k8s,
            mcp,
            upstreams,
            ca_pool,
            namespace_accessor,
            dashboard_namespace: discovery::dashboard_namespace(),
        }
    }

    /// Build the production state: Kubernetes factory per `AUTH_METHOD`
    /// (or the demo cluster under `MOCK_K8S_CLIENT`), upstream factories per
    /// mock flag and a session MCP client.
    pub async fn from_config(config: EnvConfig) -> anyhow::Result<Self> {
        let identity_config = config.identity_config();
        let k8s: Arc<dyn KubernetesClientFactory> = if config.mock_k8s_client {
            info!("Using mock Kubernetes client");
            Arc::new(MockClientFactory::new(identity_config, MockCluster::demo()))
        } else {
            match config.auth_method {
                AuthMethod::User => {
                    Arc::new(TokenClientFactory::from_environment(identity_config).await?)
                }
                AuthMethod::Internal | AuthMethod::Disabled => {
                    Arc::new(InternalClientFactory::from_environment(identity_config).await?)
                }
            }
        };

        let mcp: Arc<dyn McpClient> = Arc::new(SessionMcpClient::new(
            McpClientConfig::default().with_insecure_skip_verify(config.insecure_skip_verify),
        ));
        let upstreams = Upstreams::from_config(&config);

        Ok(Self::new(config, k8s, mcp, upstreams))
    }

    pub fn with_dashboard_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.dashboard_namespace = namespace.into();
        self
    }

    pub fn with_namespace_accessor(mut self, accessor: NamespaceAccessor) -> Self {
        self.namespace_accessor = accessor;
        self
    }

    /// Namespace holding the MCP server ConfigMap.
    pub fn mcp_configmap_namespace(&self) -> &str {
        self.config
            .mcp_configmap_namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.dashboard_namespace)
    }
}
