//! Request telemetry middleware.
//!
//! Every request gets a trace id, a `request` span and one entry/exit line.
//! Bodies are logged at DEBUG.

use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use http_body_util::BodyExt;
use tracing::{debug, warn, Instrument, Level};

use crate::logging::TraceContext;

/// Response bodies larger than this are summarized by size.
const MAX_BODY_LOG_SIZE: usize = 1000;

/// Headers worth showing in the debug line. Credentials show up redacted.
const LOGGED_HEADERS: &[&str] = &[
    "content-type",
    "accept",
    "user-agent",
    "origin",
    "authorization",
    "x-mcp-bearer",
];

const SENSITIVE_HEADERS: &[&str] = &["authorization", "x-mcp-bearer", "cookie"];

fn redact_headers_compact(headers: &axum::http::HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| LOGGED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| {
            if SENSITIVE_HEADERS.contains(&name.as_str()) {
                format!("{}=[REDACTED]", name)
            } else {
                format!("{}={:?}", name, value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compact, printable rendering of a body.
pub fn format_body(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "[empty]".to_string();
    }
    if bytes.len() > MAX_BODY_LOG_SIZE {
        return format!("[{} bytes]", bytes.len());
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => serde_json::to_string(&json).unwrap_or_else(|_| text.to_string()),
            Err(_) => text.to_string(),
        },
        Err(_) => format!("[binary: {} bytes]", bytes.len()),
    }
}

async fn buffer_request(request: Request) -> Result<Request, StatusCode> {
    debug!(headers = %redact_headers_compact(request.headers()), "Request headers");
    let (parts, body) = request.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to read request body");
            StatusCode::BAD_REQUEST
        })?
        .to_bytes();
    if !bytes.is_empty() {
        debug!(body = %format_body(&bytes), "Request body");
    }
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

async fn buffer_response(response: Response) -> Result<Response, StatusCode> {
    let (parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to read response body");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .to_bytes();
    if !bytes.is_empty() {
        debug!(body = %format_body(&bytes), "Response body");
    }
    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// Outermost logging layer (inside panic recovery). Bodies are only
/// buffered when DEBUG is enabled.
pub async fn telemetry_middleware(request: Request, next: Next) -> Result<Response, StatusCode> {
    let ctx = TraceContext::new(request.method(), request.uri());
    let span = ctx.span();

    async move {
        ctx.log_entry();
        let verbose = tracing::enabled!(Level::DEBUG);

        let mut request = if verbose {
            buffer_request(request).await?
        } else {
            request
        };
        request.extensions_mut().insert(ctx.clone());

        let response = next.run(request).await;
        let response = if verbose {
            buffer_response(response).await?
        } else {
            response
        };

        ctx.log_exit(response.status().as_u16());
        Ok(response)
    }
    .instrument(span)
    .await
}
