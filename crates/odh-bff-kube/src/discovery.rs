//! Where the dashboard runs and which domain the cluster serves.

use std::path::Path;
use tracing::debug;

use odh_bff_core::constants::{DEFAULT_DASHBOARD_NAMESPACE, SERVICE_ACCOUNT_NAMESPACE_FILE};

use crate::client::KubernetesClient;
use crate::error::KubeError;

/// Namespace of the running pod, or `opendatahub` outside a cluster.
pub fn dashboard_namespace() -> String {
    dashboard_namespace_from(Path::new(SERVICE_ACCOUNT_NAMESPACE_FILE))
}

pub fn dashboard_namespace_from(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => contents.trim().to_string(),
        _ => {
            debug!(path = %path.display(), "no service-account namespace, using default");
            DEFAULT_DASHBOARD_NAMESPACE.to_string()
        }
    }
}

/// `CLUSTER_DOMAIN` when configured, otherwise the OpenShift ingress domain.
pub async fn resolve_cluster_domain(
    client: &dyn KubernetesClient,
    configured: Option<&str>,
) -> Result<String, KubeError> {
    if let Some(domain) = configured.map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(domain.to_string());
    }
    client.cluster_domain().await
}
