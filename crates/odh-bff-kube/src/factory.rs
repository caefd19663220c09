//! Kubernetes client factories.
//!
//! The variant is chosen once at startup from `AUTH_METHOD`:
//! - internal: one service-account client shared by every caller
//! - token: one client per caller token, cached for the process lifetime

use http::HeaderMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use odh_bff_core::identity::validate_identity;
use odh_bff_core::{extract_identity, AuthMethod, IdentityConfig, IdentityError, RequestIdentity};

use crate::client::KubernetesClient;
use crate::error::KubeError;
use crate::real::KubeApiClient;

/// Produces the [`KubernetesClient`] a request should use.
pub trait KubernetesClientFactory: Send + Sync {
    fn auth_method(&self) -> AuthMethod;

    fn identity_config(&self) -> &IdentityConfig;

    fn extract_identity(&self, headers: &HeaderMap) -> Result<RequestIdentity, IdentityError> {
        extract_identity(headers, self.identity_config())
    }

    fn validate_identity(&self, identity: &RequestIdentity) -> Result<(), IdentityError> {
        validate_identity(identity, self.auth_method())
    }

    fn get_client(
        &self,
        identity: Option<&RequestIdentity>,
    ) -> Result<Arc<dyn KubernetesClient>, KubeError>;
}

/// Every caller shares the service-account client.
pub struct InternalClientFactory {
    identity_config: IdentityConfig,
    client: Arc<dyn KubernetesClient>,
}

impl InternalClientFactory {
    pub fn new(identity_config: IdentityConfig, client: Arc<dyn KubernetesClient>) -> Self {
        Self {
            identity_config,
            client,
        }
    }

    /// Load in-cluster or kubeconfig credentials.
    pub async fn from_environment(identity_config: IdentityConfig) -> Result<Self, KubeError> {
        let client = kube::Client::try_default()
            .await
            .map_err(|e| KubeError::Client(e.to_string()))?;
        info!("Using shared service-account Kubernetes client");
        Ok(Self::new(
            identity_config,
            Arc::new(KubeApiClient::service_account(client)),
        ))
    }
}

impl KubernetesClientFactory for InternalClientFactory {
    fn auth_method(&self) -> AuthMethod {
        self.identity_config.auth_method
    }

    fn identity_config(&self) -> &IdentityConfig {
        &self.identity_config
    }

    fn get_client(
        &self,
        _identity: Option<&RequestIdentity>,
    ) -> Result<Arc<dyn KubernetesClient>, KubeError> {
        Ok(self.client.clone())
    }
}

/// One client per caller token.
///
/// The cache is never evicted: tokens are short-lived and the set of active
/// callers is small.
pub struct TokenClientFactory {
    identity_config: IdentityConfig,
    base: kube::Config,
    cache: Mutex<HashMap<String, Arc<dyn KubernetesClient>>>,
}

impl TokenClientFactory {
    pub fn new(identity_config: IdentityConfig, base: kube::Config) -> Self {
        Self {
            identity_config,
            base,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Infer the base REST config (in-cluster, then kubeconfig).
    pub async fn from_environment(identity_config: IdentityConfig) -> Result<Self, KubeError> {
        let base = kube::Config::infer()
            .await
            .map_err(|e| KubeError::Client(e.to_string()))?;
        info!(cluster_url = %base.cluster_url, "Using per-caller token Kubernetes clients");
        Ok(Self::new(identity_config, base))
    }

    /// Copy the base config and authenticate with `token` only.
    fn config_for_token(&self, token: &str) -> kube::Config {
        let mut config = self.base.clone();
        // Drops exec plugins, client certificates, basic auth and token files.
        config.auth_info = kube::config::AuthInfo {
            token: Some(token.to_string().into()),
            ..Default::default()
        };
        config
    }

    fn build_client(&self, token: &str) -> Result<Arc<dyn KubernetesClient>, KubeError> {
        let client = kube::Client::try_from(self.config_for_token(token))
            .map_err(|e| KubeError::Client(e.to_string()))?;
        Ok(Arc::new(KubeApiClient::for_caller(client)))
    }

    pub fn cached_clients(&self) -> usize {
        self.cache.lock().len()
    }
}

impl KubernetesClientFactory for TokenClientFactory {
    fn auth_method(&self) -> AuthMethod {
        self.identity_config.auth_method
    }

    fn identity_config(&self) -> &IdentityConfig {
        &self.identity_config
    }

    fn get_client(
        &self,
        identity: Option<&RequestIdentity>,
    ) -> Result<Arc<dyn KubernetesClient>, KubeError> {
        let token = identity
            .map(|i| i.token.as_str())
            .filter(|t| !t.is_empty())
            .ok_or(KubeError::MissingIdentity)?;

        // Held across the build so concurrent misses create one client.
        let mut cache = self.cache.lock();
        if let Some(client) = cache.get(token) {
            return Ok(client.clone());
        }
        let client = self.build_client(token)?;
        cache.insert(token.to_string(), client.clone());
        debug!(cached = cache.len(), "Created Kubernetes client for new caller token");
        Ok(client)
    }
}
