//! Pipeline middleware.
//!
//! Global: panic recovery, CORS and identity injection. Per route:
//! `attach_namespace`, `require_access` and `attach_upstream`, in that order.

use std::any::Any;

use axum::{
    extract::{Request, State},
    http::{
        header::{ALLOW, CONNECTION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, error, warn};

use odh_bff_core::constants::{API_PATH_PREFIX, MCP_TOKEN_HEADER, NAMESPACE_QUERY_PARAM};
use odh_bff_core::validation::is_dns1123_label;
use odh_bff_core::{AuthMethod, EnvConfig, ErrorCode, RequestIdentity};
use odh_bff_kube::{discovery, resolve_service_url, CustomResourceKind};

use super::AppState;
use crate::error::HttpError;
use crate::upstream::{maas, AttachedUpstream, ClientTarget, UpstreamError, UpstreamKind};

pub(crate) const MISSING_IDENTITY: &str = "missing RequestIdentity in context";

/// Anonymous route under the API prefix.
pub const API_HEALTH_PATH: &str = "/api/v1/health";

/// Namespace taken from the query string by [`attach_namespace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace(pub String);

/// State for [`require_access`]: which custom resource the caller must be
/// able to list in the attached namespace.
#[derive(Clone)]
pub struct AccessGate {
    pub state: AppState,
    pub resource: &'static CustomResourceKind,
}

/// State for [`attach_upstream`].
#[derive(Clone)]
pub struct UpstreamGate {
    pub state: AppState,
    pub kind: UpstreamKind,
}

/// First non-empty value of `name` in the query string, percent-decoded.
pub(crate) fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

fn missing_namespace() -> HttpError {
    HttpError::bad_request(format!(
        "missing required query parameter: {NAMESPACE_QUERY_PARAM}"
    ))
}

/// Render a panic as a generic 500 and close the connection.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = %detail, "Recovered from panic");

    let mut response = HttpError::server_problem().into_response();
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

/// CORS for the configured origins, or `None` when none are configured.
pub fn cors_layer(config: &EnvConfig) -> Option<CorsLayer> {
    if !config.cors_enabled() {
        return None;
    }

    // Credentials rule out the `*` wildcard, so echo the caller's origin.
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(config.allowed_origins.iter().filter_map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| warn!(origin = %o, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    let mut headers: Vec<HeaderName> = Vec::new();
    for name in [
        CONTENT_TYPE.as_str(),
        config.auth_token_header.as_str(),
        config.user_id_header.as_str(),
        config.groups_header.as_str(),
        MCP_TOKEN_HEADER,
    ] {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(header) if !headers.contains(&header) => headers.push(header),
            Ok(_) => {}
            Err(_) => warn!(header = name, "Ignoring invalid CORS header name"),
        }
    }

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::PUT,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers(headers),
    )
}

/// Extract the caller identity for `/api/v1` routes (except health).
pub async fn inject_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let path = request.uri().path();
    let needs_identity = path.starts_with(API_PATH_PREFIX) && path != API_HEALTH_PATH;
    if !needs_identity {
        return Ok(next.run(request).await);
    }

    let identity = if state.config.auth_method == AuthMethod::Disabled {
        RequestIdentity::default()
    } else {
        state.k8s.extract_identity(request.headers())?
    };
    debug!(identity = ?identity, "Identity extracted");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Require a valid `namespace` query parameter and attach it.
pub async fn attach_namespace(mut request: Request, next: Next) -> Result<Response, HttpError> {
    let namespace = query_param(request.uri(), NAMESPACE_QUERY_PARAM).ok_or_else(missing_namespace)?;
    if !is_dns1123_label(&namespace) {
        return Err(HttpError::bad_request(format!(
            "invalid namespace {namespace:?}: must be a lowercase RFC 1123 label"
        )));
    }
    debug!(namespace = %namespace, "Namespace attached");
    request.extensions_mut().insert(Namespace(namespace));
    Ok(next.run(request).await)
}

/// Validate the identity and, with a namespace attached, check that the
/// caller may list the gate's resource there.
pub async fn require_access(
    State(gate): State<AccessGate>,
    request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let state = &gate.state;
    if state.config.auth_method == AuthMethod::Disabled {
        return Ok(next.run(request).await);
    }

    // Owned: no borrow of the request may live across an await.
    let identity = request
        .extensions()
        .get::<RequestIdentity>()
        .cloned()
        .ok_or_else(|| HttpError::bad_request(MISSING_IDENTITY))?;
    state.k8s.validate_identity(&identity)?;

    if let Some(Namespace(namespace)) = request.extensions().get::<Namespace>().cloned() {
        let client = state.k8s.get_client(Some(&identity))?;
        let allowed = client
            .can_list_custom_resource(&identity, gate.resource, &namespace)
            .await?;
        if !allowed {
            warn!(namespace = %namespace, resource = gate.resource.plural, "Access denied");
            return Err(HttpError::new(
                ErrorCode::Forbidden,
                "user does not have permission to access services in this namespace",
            ));
        }
        debug!(namespace = %namespace, "Caller authorized for namespace");
    }

    Ok(next.run(request).await)
}

/// Build the gate's upstream client for this caller and attach it.
pub async fn attach_upstream(
    State(gate): State<UpstreamGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let UpstreamGate { state, kind } = &gate;

    let target = if kind.is_mocked(&state.config) {
        debug!(upstream = %kind, "Mock mode, attaching mock client");
        ClientTarget::mock(*kind)
    } else {
        let identity = request
            .extensions()
            .get::<RequestIdentity>()
            .cloned()
            .ok_or_else(|| HttpError::internal(MISSING_IDENTITY))?;
        let namespace = request
            .extensions()
            .get::<Namespace>()
            .map(|ns| ns.0.clone());
        let base_url =
            resolve_base_url(state, *kind, &identity, namespace.as_deref()).await?;
        ClientTarget {
            base_url,
            api_path: kind.api_path(),
            token: identity.token.clone(),
            insecure_skip_verify: state.config.insecure_skip_verify,
            ca_pool: state.ca_pool.clone(),
        }
    };

    let attached = AttachedUpstream::create(&state.upstreams, *kind, &target)?;
    debug!(upstream = %kind, endpoint = attached.endpoint(), "Upstream client attached");
    request.extensions_mut().insert(attached);
    Ok(next.run(request).await)
}

/// `<SERVICE>_URL`, else the custom resource's `status.serviceURL`, else
/// (MaaS) the cluster-domain convention.
async fn resolve_base_url(
    state: &AppState,
    kind: UpstreamKind,
    identity: &RequestIdentity,
    namespace: Option<&str>,
) -> Result<String, HttpError> {
    if let Some(url) = kind.url_override(&state.config) {
        debug!(upstream = %kind, url, "Using configured upstream URL");
        return Ok(url.to_string());
    }

    let client = state.k8s.get_client(Some(identity))?;
    match kind.custom_resource() {
        Some(resource) => {
            let namespace = namespace.ok_or_else(missing_namespace)?;
            Ok(resolve_service_url(client.as_ref(), resource, namespace).await?)
        }
        None => {
            let domain = discovery::resolve_cluster_domain(
                client.as_ref(),
                state.config.cluster_domain.as_deref(),
            )
            .await
            .map_err(|e| {
                UpstreamError::unavailable(kind.name(), format!("cluster domain lookup failed: {e}"))
            })?;
            let url = maas::autodiscovered_url(&domain);
            debug!(upstream = %kind, url = %url, "Autodiscovered upstream URL");
            Ok(url)
        }
    }
}

/// Give axum's bare 405 the JSON error envelope.
pub async fn envelope_method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(CONTENT_TYPE)
    {
        return response;
    }
    let allow = response.headers().get(ALLOW).cloned();
    let mut rendered = HttpError::new(
        ErrorCode::MethodNotAllowed,
        "the method is not supported for this resource",
    )
    .into_response();
    if let Some(allow) = allow {
        rendered.headers_mut().insert(ALLOW, allow);
    }
    rendered
}
