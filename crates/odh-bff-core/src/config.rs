//! Process configuration read once at startup.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_GROUPS_HEADER, DEFAULT_MCP_CONFIGMAP_NAME, DEFAULT_TOKEN_HEADER, DEFAULT_TOKEN_PREFIX,
    DEFAULT_USER_ID_HEADER,
};
use crate::identity::IdentityConfig;

/// Selects the Kubernetes client factory variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// One shared service-account client. Caller identity arrives in headers.
    #[default]
    Internal,
    /// One client per caller bearer token.
    User,
    /// No identity extraction and no access checks.
    Disabled,
}

impl FromStr for AuthMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "internal" => Ok(AuthMethod::Internal),
            "user" | "user_token" => Ok(AuthMethod::User),
            "disabled" => Ok(AuthMethod::Disabled),
            other => Err(ConfigError::InvalidValue {
                key: "AUTH_METHOD",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMethod::Internal => "internal",
            AuthMethod::User => "user",
            AuthMethod::Disabled => "disabled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Everything the BFF reads from its environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub host: String,
    pub port: u16,

    pub auth_method: AuthMethod,
    pub auth_token_header: String,
    pub auth_token_prefix: String,
    pub user_id_header: String,
    pub groups_header: String,

    /// Empty disables CORS.
    pub allowed_origins: Vec<String>,

    pub mock_k8s_client: bool,
    pub mock_eval_hub_client: bool,
    pub mock_llama_stack_client: bool,
    pub mock_maas_client: bool,
    pub mock_mlflow_client: bool,

    pub eval_hub_url: Option<String>,
    pub llama_stack_url: Option<String>,
    pub maas_url: Option<String>,
    pub mlflow_url: Option<String>,

    pub bundle_paths: Vec<PathBuf>,
    pub insecure_skip_verify: bool,

    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub static_assets_dir: Option<PathBuf>,

    pub mcp_configmap_name: String,
    /// Defaults to the dashboard namespace when unset.
    pub mcp_configmap_namespace: Option<String>,
    pub cluster_domain: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            auth_method: AuthMethod::default(),
            auth_token_header: DEFAULT_TOKEN_HEADER.to_string(),
            auth_token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
            user_id_header: DEFAULT_USER_ID_HEADER.to_string(),
            groups_header: DEFAULT_GROUPS_HEADER.to_string(),
            allowed_origins: Vec::new(),
            mock_k8s_client: false,
            mock_eval_hub_client: false,
            mock_llama_stack_client: false,
            mock_maas_client: false,
            mock_mlflow_client: false,
            eval_hub_url: None,
            llama_stack_url: None,
            maas_url: None,
            mlflow_url: None,
            bundle_paths: Vec::new(),
            insecure_skip_verify: false,
            log_level: "info".to_string(),
            log_dir: None,
            static_assets_dir: None,
            mcp_configmap_name: DEFAULT_MCP_CONFIGMAP_NAME.to_string(),
            mcp_configmap_namespace: None,
            cluster_domain: None,
        }
    }
}

/// Parse `true/false/1/0/yes/no`, case-insensitive.
pub fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl EnvConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &'static str| -> Result<bool, ConfigError> {
            get(key).map(|v| parse_bool(key, &v)).unwrap_or(Ok(false))
        };
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
            })?,
            None => defaults.port,
        };

        let auth_method = match get("AUTH_METHOD") {
            Some(raw) => raw.parse()?,
            None => defaults.auth_method,
        };

        // An explicitly empty prefix is meaningful (raw token headers).
        let auth_token_prefix = lookup("AUTH_TOKEN_PREFIX").unwrap_or(defaults.auth_token_prefix);

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            auth_method,
            auth_token_header: get("AUTH_TOKEN_HEADER").unwrap_or(defaults.auth_token_header),
            auth_token_prefix,
            user_id_header: get("KUBEFLOW_USERID_HEADER").unwrap_or(defaults.user_id_header),
            groups_header: get("KUBEFLOW_GROUPS_HEADER").unwrap_or(defaults.groups_header),
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            mock_k8s_client: flag("MOCK_K8S_CLIENT")?,
            mock_eval_hub_client: flag("MOCK_EVAL_HUB_CLIENT")?,
            mock_llama_stack_client: flag("MOCK_LLAMA_STACK_CLIENT")?,
            mock_maas_client: flag("MOCK_MAAS_CLIENT")?,
            mock_mlflow_client: flag("MOCK_MLFLOW_CLIENT")?,
            eval_hub_url: get("EVAL_HUB_URL"),
            llama_stack_url: get("LLAMA_STACK_URL"),
            maas_url: get("MAAS_URL"),
            mlflow_url: get("MLFLOW_URL"),
            bundle_paths: get("BUNDLE_PATHS")
                .map(|v| split_list(&v).into_iter().map(PathBuf::from).collect())
                .unwrap_or_default(),
            insecure_skip_verify: flag("INSECURE_SKIP_VERIFY")?,
            log_level: get("LOG_LEVEL")
                .map(|v| v.trim().to_ascii_lowercase())
                .unwrap_or(defaults.log_level),
            log_dir: get("LOG_DIR").map(PathBuf::from),
            static_assets_dir: get("STATIC_ASSETS_DIR").map(PathBuf::from),
            mcp_configmap_name: get("MCP_CONFIGMAP_NAME").unwrap_or(defaults.mcp_configmap_name),
            mcp_configmap_namespace: get("MCP_CONFIGMAP_NAMESPACE"),
            cluster_domain: get("CLUSTER_DOMAIN"),
        })
    }

    pub fn identity_config(&self) -> IdentityConfig {
        IdentityConfig {
            auth_method: self.auth_method,
            token_header: self.auth_token_header.clone(),
            token_prefix: self.auth_token_prefix.clone(),
            user_id_header: self.user_id_header.clone(),
            groups_header: self.groups_header.clone(),
        }
    }

    pub fn cors_enabled(&self) -> bool {
        !self.allowed_origins.is_empty()
    }
}
