//! Health, namespace and user handlers.

use axum::{
    extract::State,
    response::Json,
    Extension,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use odh_bff_core::{AuthMethod, Envelope, HealthResponse, NamespaceModel, RequestIdentity, UserModel};

use super::AppState;
use crate::error::HttpError;

/// `GET /healthcheck` and `GET /api/v1/health`.
pub async fn health() -> Json<HealthResponse> {
    debug!("Health check");
    Json(HealthResponse::available())
}

/// `GET /api/v1/namespaces`: the namespaces the caller may `get`.
///
/// A cancelled or timed-out fan-out fails the request; a partial list is
/// never returned as if it were complete.
pub async fn list_namespaces(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<Json<Envelope<Vec<NamespaceModel>>>, HttpError> {
    let client = state.k8s.get_client(Some(&identity))?;

    let names = if state.config.auth_method == AuthMethod::Disabled {
        client.list_namespace_names(&identity).await?
    } else {
        // Workers stop when the request future is dropped.
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        let result = state
            .namespace_accessor
            .accessible_namespaces(client, &identity, &cancel)
            .await?;
        if let Some(reason) = result.interrupted {
            warn!(
                collected = result.namespaces.len(),
                error = %reason,
                "Namespace listing interrupted"
            );
            return Err(reason.into());
        }
        result.namespaces
    };

    info!(count = names.len(), "Listed accessible namespaces");
    Ok(Json(Envelope::new(
        names.into_iter().map(|name| NamespaceModel { name }).collect(),
    )))
}

/// `GET /api/v1/user`.
pub async fn current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<Json<Envelope<UserModel>>, HttpError> {
    let client = state.k8s.get_client(Some(&identity))?;
    let user_id = client.get_user(&identity).await?;
    let cluster_admin = match client.is_cluster_admin(&identity).await {
        Ok(admin) => admin,
        Err(e) => {
            warn!(error = %e, "Cluster-admin check failed, reporting non-admin");
            false
        }
    };
    Ok(Json(Envelope::new(UserModel {
        user_id,
        cluster_admin,
    })))
}

/// Unknown routes.
pub async fn not_found() -> HttpError {
    HttpError::not_found("the requested resource could not be found")
}
