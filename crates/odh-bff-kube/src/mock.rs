//! In-memory Kubernetes for `MOCK_K8S_CLIENT` and tests.
//!
//! Callers are identified by their principal: `user_id` when set, otherwise
//! the bearer token.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use odh_bff_core::{AuthMethod, IdentityConfig, RequestIdentity};

use crate::client::{AccessCheck, KubernetesClient};
use crate::error::KubeError;
use crate::factory::KubernetesClientFactory;
use crate::resources::CustomResourceKind;

/// Cluster state served by [`MockKubernetesClient`].
#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    pub namespaces: Vec<String>,
    pub cluster_admins: HashSet<String>,
    /// principal -> namespaces the principal may use
    pub access: HashMap<String, HashSet<String>>,
    /// Access reviews in these namespaces fail instead of answering.
    pub failing_namespaces: HashSet<String>,
    /// (plural, namespace) -> raw custom resources
    pub resources: HashMap<(String, String), Vec<serde_json::Value>>,
    /// (namespace, name) -> data
    pub config_maps: HashMap<(String, String), BTreeMap<String, String>>,
    /// token -> username reported by the self review
    pub users: HashMap<String, String>,
    pub cluster_domain: Option<String>,
    pub review_delay: Option<Duration>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demo cluster used when `MOCK_K8S_CLIENT` is set.
    pub fn demo() -> Self {
        Self::new()
            .with_namespaces(&["default", "opendatahub", "project-a", "project-b"])
            .admin("kubeadmin")
            .allow("dev-user", &["project-a", "project-b"])
            .with_cluster_domain("apps.example.com")
    }

    pub fn with_namespaces(mut self, names: &[&str]) -> Self {
        self.namespaces = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn admin(mut self, principal: &str) -> Self {
        self.cluster_admins.insert(principal.to_string());
        self
    }

    pub fn allow(mut self, principal: &str, namespaces: &[&str]) -> Self {
        self.access
            .entry(principal.to_string())
            .or_default()
            .extend(namespaces.iter().map(|n| n.to_string()));
        self
    }

    pub fn failing(mut self, namespace: &str) -> Self {
        self.failing_namespaces.insert(namespace.to_string());
        self
    }

    pub fn with_resource(
        mut self,
        kind: &CustomResourceKind,
        namespace: &str,
        resource: serde_json::Value,
    ) -> Self {
        self.resources
            .entry((kind.plural.to_string(), namespace.to_string()))
            .or_default()
            .push(resource);
        self
    }

    pub fn with_config_map(mut self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        self.config_maps.insert(
            (namespace.to_string(), name.to_string()),
            data.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_user(mut self, token: &str, username: &str) -> Self {
        self.users.insert(token.to_string(), username.to_string());
        self
    }

    pub fn with_cluster_domain(mut self, domain: &str) -> Self {
        self.cluster_domain = Some(domain.to_string());
        self
    }

    pub fn with_review_delay(mut self, delay: Duration) -> Self {
        self.review_delay = Some(delay);
        self
    }
}

fn principal(identity: &RequestIdentity) -> Option<&str> {
    identity
        .user_id
        .as_deref()
        .filter(|u| !u.is_empty())
        .or(Some(identity.token.as_str()).filter(|t| !t.is_empty()))
}

/// A [`KubernetesClient`] answering from a [`MockCluster`].
#[derive(Clone)]
pub struct MockKubernetesClient {
    cluster: Arc<MockCluster>,
    reviews: Arc<AtomicUsize>,
}

impl MockKubernetesClient {
    pub fn new(cluster: MockCluster) -> Self {
        Self {
            cluster: Arc::new(cluster),
            reviews: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of access reviews answered so far.
    pub fn review_count(&self) -> usize {
        self.reviews.load(Ordering::SeqCst)
    }

    fn is_admin(&self, identity: &RequestIdentity) -> bool {
        principal(identity).is_some_and(|p| self.cluster.cluster_admins.contains(p))
    }
}

#[async_trait]
impl KubernetesClient for MockKubernetesClient {
    async fn review_access(
        &self,
        identity: &RequestIdentity,
        check: &AccessCheck,
    ) -> Result<bool, KubeError> {
        self.reviews.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.cluster.review_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ns) = check.namespace.as_deref() {
            if self.cluster.failing_namespaces.contains(ns) {
                return Err(KubeError::Internal(format!("review failed for {ns}")));
            }
        }
        if self.is_admin(identity) {
            return Ok(true);
        }
        let Some(principal) = principal(identity) else {
            return Ok(false);
        };
        Ok(match check.namespace.as_deref() {
            Some(ns) => self
                .cluster
                .access
                .get(principal)
                .is_some_and(|allowed| allowed.contains(ns)),
            None => false,
        })
    }

    async fn is_cluster_admin(&self, identity: &RequestIdentity) -> Result<bool, KubeError> {
        Ok(self.is_admin(identity))
    }

    async fn list_namespace_names(
        &self,
        _identity: &RequestIdentity,
    ) -> Result<Vec<String>, KubeError> {
        Ok(self.cluster.namespaces.clone())
    }

    async fn list_dashboard_resources(
        &self,
        kind: &CustomResourceKind,
        namespace: &str,
    ) -> Result<Vec<serde_json::Value>, KubeError> {
        Ok(self
            .cluster
            .resources
            .get(&(kind.plural.to_string(), namespace.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, KubeError> {
        self.cluster
            .config_maps
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| KubeError::NotFound {
                message: format!("configmaps \"{name}\" not found"),
                namespace: Some(namespace.to_string()),
            })
    }

    async fn get_user(&self, identity: &RequestIdentity) -> Result<String, KubeError> {
        if let Some(user) = self.cluster.users.get(&identity.token) {
            return Ok(user.clone());
        }
        identity
            .user_id
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or(KubeError::MissingIdentity)
    }

    async fn cluster_domain(&self) -> Result<String, KubeError> {
        self.cluster
            .cluster_domain
            .clone()
            .ok_or_else(|| KubeError::NotFound {
                message: "ingresses.config.openshift.io \"cluster\" not found".to_string(),
                namespace: None,
            })
    }
}

/// Factory handing out one shared [`MockKubernetesClient`].
pub struct MockClientFactory {
    identity_config: IdentityConfig,
    client: MockKubernetesClient,
    handed_out: Mutex<usize>,
}

impl MockClientFactory {
    pub fn new(identity_config: IdentityConfig, cluster: MockCluster) -> Self {
        Self {
            identity_config,
            client: MockKubernetesClient::new(cluster),
            handed_out: Mutex::new(0),
        }
    }

    pub fn client(&self) -> &MockKubernetesClient {
        &self.client
    }

    pub fn clients_handed_out(&self) -> usize {
        *self.handed_out.lock()
    }
}

impl KubernetesClientFactory for MockClientFactory {
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
        if self.auth_method() == AuthMethod::User && identity.map_or(true, |i| !i.has_token()) {
            return Err(KubeError::MissingIdentity);
        }
        *self.handed_out.lock() += 1;
        Ok(Arc::new(self.client.clone()))
    }
}
