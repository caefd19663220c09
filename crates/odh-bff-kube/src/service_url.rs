//! Upstream service discovery through dashboard-labelled custom resources.

use tracing::{debug, warn};

use odh_bff_core::constants::SERVICE_URL_TIMEOUT;

use crate::client::KubernetesClient;
use crate::error::{with_deadline, KubeError};
use crate::resources::CustomResourceKind;

/// Read `status.serviceURL` from the dashboard-labelled `kind` in `namespace`.
///
/// When several resources match, the first one returned by the API server
/// wins.
pub async fn resolve_service_url(
    client: &dyn KubernetesClient,
    kind: &CustomResourceKind,
    namespace: &str,
) -> Result<String, KubeError> {
    let resolve = async {
        let items = client.list_dashboard_resources(kind, namespace).await?;
        let Some(first) = items.first() else {
            return Err(KubeError::NotFound {
                message: format!("no {} found in namespace {namespace}", kind.kind),
                namespace: Some(namespace.to_string()),
            });
        };

        let name = first
            .pointer("/metadata/name")
            .and_then(|n| n.as_str())
            .unwrap_or("<unnamed>");
        if items.len() > 1 {
            warn!(
                namespace,
                kind = kind.kind,
                count = items.len(),
                using = name,
                "multiple dashboard resources found, using the first"
            );
        }

        let url = first
            .pointer("/status/serviceURL")
            .and_then(|u| u.as_str())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                KubeError::InvalidResource(format!(
                    "{} {name} in namespace {namespace} has no status.serviceURL",
                    kind.kind
                ))
            })?;
        debug!(namespace, kind = kind.kind, service_url = url, "resolved service URL");
        Ok(url.to_string())
    };
    with_deadline("service URL resolution", SERVICE_URL_TIMEOUT, resolve).await
}
