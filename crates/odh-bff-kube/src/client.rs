//! The capability set handlers and middleware use to talk to Kubernetes.

use async_trait::async_trait;
use std::collections::BTreeMap;

use odh_bff_core::RequestIdentity;

use crate::error::KubeError;
use crate::resources::CustomResourceKind;

/// One access question: may the caller perform `verb` on `resource`?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    pub verb: String,
    pub group: String,
    pub resource: String,
    /// `None` for cluster-scoped checks.
    pub namespace: Option<String>,
}

impl AccessCheck {
    pub fn new(verb: &str, group: &str, resource: &str, namespace: Option<&str>) -> Self {
        Self {
            verb: verb.to_string(),
            group: group.to_string(),
            resource: resource.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }

    /// `get namespaces/<namespace>`
    pub fn get_namespace(namespace: &str) -> Self {
        Self::new("get", "", "namespaces", Some(namespace))
    }

    /// `list <plural>.<group>` in a namespace.
    pub fn list_custom_resource(kind: &CustomResourceKind, namespace: &str) -> Self {
        Self::new("list", kind.group, kind.plural, Some(namespace))
    }
}

/// Kubernetes operations available to one caller.
///
/// Implementations are either shared (service account) or bound to a single
/// caller token; the trait hides which.
#[async_trait]
pub trait KubernetesClient: Send + Sync {
    /// Run a SubjectAccessReview (or SelfSubjectAccessReview) and return `status.allowed`.
    async fn review_access(
        &self,
        identity: &RequestIdentity,
        check: &AccessCheck,
    ) -> Result<bool, KubeError>;

    async fn is_cluster_admin(&self, identity: &RequestIdentity) -> Result<bool, KubeError>;

    /// Every namespace name this client is able to list.
    async fn list_namespace_names(&self, identity: &RequestIdentity)
        -> Result<Vec<String>, KubeError>;

    /// Custom resources in `namespace` carrying the dashboard label, as raw JSON.
    async fn list_dashboard_resources(
        &self,
        kind: &CustomResourceKind,
        namespace: &str,
    ) -> Result<Vec<serde_json::Value>, KubeError>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, KubeError>;

    /// Username of the caller.
    async fn get_user(&self, identity: &RequestIdentity) -> Result<String, KubeError>;

    /// Ingress domain of the cluster (OpenShift `ingresses.config.openshift.io/cluster`).
    async fn cluster_domain(&self) -> Result<String, KubeError>;

    async fn can_list_custom_resource(
        &self,
        identity: &RequestIdentity,
        kind: &CustomResourceKind,
        namespace: &str,
    ) -> Result<bool, KubeError> {
        self.review_access(identity, &AccessCheck::list_custom_resource(kind, namespace))
            .await
    }
}
