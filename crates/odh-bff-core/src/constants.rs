//! Well-known names and deadlines used across the pipeline.

use std::time::Duration;

/// Prefix for every authenticated route.
pub const API_PATH_PREFIX: &str = "/api/v1";

pub const DEFAULT_TOKEN_HEADER: &str = "Authorization";
pub const DEFAULT_TOKEN_PREFIX: &str = "Bearer ";
pub const DEFAULT_USER_ID_HEADER: &str = "kubeflow-userid";
pub const DEFAULT_GROUPS_HEADER: &str = "kubeflow-groups";

/// Secondary bearer forwarded only to MCP servers.
pub const MCP_TOKEN_HEADER: &str = "X-MCP-Bearer";
pub const MCP_TOKEN_PREFIX: &str = "Bearer ";

pub const NAMESPACE_QUERY_PARAM: &str = "namespace";
pub const SERVER_URL_QUERY_PARAM: &str = "server_url";

/// Label a custom resource must carry to be picked up by the dashboard.
pub const DASHBOARD_LABEL_SELECTOR: &str = "opendatahub.io/dashboard=true";

pub const DEFAULT_DASHBOARD_NAMESPACE: &str = "opendatahub";
pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
pub const DEFAULT_MCP_CONFIGMAP_NAME: &str = "gen-ai-aa-mcp-servers";

/// Version reported by the health endpoints.
pub const HEALTH_VERSION: &str = "1.0.0";

pub const SAR_TIMEOUT: Duration = Duration::from_secs(10);
pub const NAMESPACE_LIST_TIMEOUT: Duration = Duration::from_secs(30);
pub const SERVICE_URL_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONFIGMAP_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of concurrent SubjectAccessReview workers during namespace fan-out.
pub const NAMESPACE_WORKERS: usize = 10;
