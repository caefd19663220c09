//! Per-request correlation.
//!
//! Every pipeline log line is recorded under a `request` span carrying a short
//! trace id, so one caller's identity, access review and upstream logs can be
//! grepped together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::http::{Method, Uri};
use tracing::{info, info_span, warn, Span};

use odh_bff_core::constants::NAMESPACE_QUERY_PARAM;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Eight hex characters, distinct for requests in flight together.
pub fn generate_trace_id() -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);
    format!("{:08x}", (micros ^ seq.rotate_left(24)) & 0xFFFF_FFFF)
}

/// Stored in request extensions by the telemetry middleware.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
    pub method: Method,
    pub path: String,
    /// `namespace` query parameter, when present.
    pub namespace: Option<String>,
    pub started_at: Instant,
}

impl TraceContext {
    pub fn new(method: &Method, uri: &Uri) -> Self {
        let namespace = uri.query().and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == NAMESPACE_QUERY_PARAM)
                .map(|(_, v)| v.into_owned())
        });
        Self {
            trace_id: generate_trace_id(),
            method: method.clone(),
            path: uri.path().to_string(),
            namespace,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    pub fn span(&self) -> Span {
        info_span!(
            "request",
            trace_id = %self.trace_id,
            method = %self.method,
            path = %self.path,
            namespace = self.namespace.as_deref().unwrap_or("-"),
        )
    }

    pub fn log_entry(&self) {
        info!("→ {} {}", self.method, self.path);
    }

    pub fn log_exit(&self, status: u16) {
        let elapsed = self.elapsed_ms();
        if status >= 500 {
            warn!(status, "← {status} ({elapsed}ms)");
        } else {
            info!(status, "← {status} ({elapsed}ms)");
        }
    }
}
