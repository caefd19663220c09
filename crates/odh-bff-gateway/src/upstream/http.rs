//! Shared reqwest plumbing for upstream clients.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use odh_bff_mcp::http::extract_error_detail;

use super::{ClientTarget, UpstreamError};

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A base URL plus a reqwest client carrying the caller's bearer.
#[derive(Clone)]
pub struct UpstreamHttp {
    service: &'static str,
    client: reqwest::Client,
    endpoint: String,
}

impl UpstreamHttp {
    pub fn new(
        service: &'static str,
        target: &ClientTarget,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        if !target.token.is_empty() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", target.token))
                .map_err(|_| UpstreamError::unavailable(service, "bearer token is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout);
        let client = target
            .ca_pool
            .apply(builder, target.insecure_skip_verify)
            .build()
            .map_err(|e| UpstreamError::unavailable(service, e.to_string()))?;

        Ok(Self {
            service,
            client,
            endpoint: target.endpoint(),
        })
    }

    /// Base URL including the API path, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let url = self.url(path);
        debug!(service = self.service, url = %url, "Upstream GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| UpstreamError::from_request(self.service, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_request(self.service, &e))?;

        if !status.is_success() {
            return Err(UpstreamError::from_status(
                self.service,
                status.as_u16(),
                extract_error_detail(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::malformed(self.service, e))
    }
}
