//! Streamable-HTTP client with status checking.
//!
//! Same request shapes as rmcp's reqwest client, except every response of
//! 400 or above becomes an [`HttpStatusError`] carrying the body's detail
//! and is recorded in the session's [`StatusLog`].

use std::borrow::Cow;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::common::http_header::{
    EVENT_STREAM_MIME_TYPE, HEADER_LAST_EVENT_ID, HEADER_SESSION_ID, JSON_MIME_TYPE,
};
use rmcp::transport::streamable_http_client::{
    SseError, StreamableHttpClient, StreamableHttpError, StreamableHttpPostResponse,
};
use sse_stream::{Sse, SseStream};
use tracing::debug;

use crate::http::{StatusLog, TransportError};

type ClientError = StreamableHttpError<TransportError>;

fn request_failed(err: reqwest::Error) -> ClientError {
    StreamableHttpError::Client(TransportError::Request(err))
}

fn accept_header() -> String {
    [EVENT_STREAM_MIME_TYPE, JSON_MIME_TYPE].join(", ")
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .map(|ct| String::from_utf8_lossy(ct.as_bytes()).to_string())
}

#[derive(Debug, Clone)]
pub struct CheckedHttpClient {
    http: reqwest::Client,
    log: StatusLog,
}

impl CheckedHttpClient {
    pub fn new(http: reqwest::Client, log: StatusLog) -> Self {
        Self { http, log }
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        self.log
            .check(response)
            .await
            .map_err(|e| StreamableHttpError::Client(TransportError::Http(e)))
    }
}

impl StreamableHttpClient for CheckedHttpClient {
    type Error = TransportError;

    async fn post_message(
        &self,
        uri: Arc<str>,
        message: ClientJsonRpcMessage,
        session_id: Option<Arc<str>>,
        auth_header: Option<String>,
    ) -> Result<StreamableHttpPostResponse, ClientError> {
        let mut request = self
            .http
            .post(uri.as_ref())
            .header(ACCEPT, accept_header());
        if let Some(token) = auth_header {
            request = request.bearer_auth(token);
        }
        if let Some(session_id) = session_id {
            request = request.header(HEADER_SESSION_ID, session_id.as_ref());
        }
        let response = request.json(&message).send().await.map_err(request_failed)?;
        let response = self.check(response).await?;

        if matches!(response.status(), StatusCode::ACCEPTED | StatusCode::NO_CONTENT) {
            return Ok(StreamableHttpPostResponse::Accepted);
        }
        let session_id = response
            .headers()
            .get(HEADER_SESSION_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        match content_type(&response) {
            Some(ct) if ct.starts_with(EVENT_STREAM_MIME_TYPE) => {
                let events = SseStream::from_bytes_stream(response.bytes_stream()).boxed();
                Ok(StreamableHttpPostResponse::Sse(events, session_id))
            }
            Some(ct) if ct.starts_with(JSON_MIME_TYPE) => {
                let message: ServerJsonRpcMessage = response.json().await.map_err(request_failed)?;
                Ok(StreamableHttpPostResponse::Json(message, session_id))
            }
            other => Err(StreamableHttpError::UnexpectedContentType(other)),
        }
    }

    async fn delete_session(
        &self,
        uri: Arc<str>,
        session_id: Arc<str>,
        auth_header: Option<String>,
    ) -> Result<(), ClientError> {
        let mut request = self
            .http
            .delete(uri.as_ref())
            .header(HEADER_SESSION_ID, session_id.as_ref());
        if let Some(token) = auth_header {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(request_failed)?;
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!("MCP server does not support session deletion");
            return Ok(());
        }
        self.check(response).await?;
        Ok(())
    }

    async fn get_stream(
        &self,
        uri: Arc<str>,
        session_id: Arc<str>,
        last_event_id: Option<String>,
        auth_header: Option<String>,
    ) -> Result<BoxStream<'static, Result<Sse, SseError>>, ClientError> {
        let mut request = self
            .http
            .get(uri.as_ref())
            .header(ACCEPT, accept_header())
            .header(HEADER_SESSION_ID, session_id.as_ref());
        if let Some(last_event_id) = last_event_id {
            request = request.header(HEADER_LAST_EVENT_ID, last_event_id);
        }
        if let Some(token) = auth_header {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(request_failed)?;
        // Optional stream; a server without one is not a session failure.
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            return Err(StreamableHttpError::ServerDoesNotSupportSse);
        }
        let response = self.check(response).await?;
        match content_type(&response) {
            Some(ct) if ct.starts_with(EVENT_STREAM_MIME_TYPE) || ct.starts_with(JSON_MIME_TYPE) => {
                Ok(SseStream::from_bytes_stream(response.bytes_stream()).boxed())
            }
            other => Err(StreamableHttpError::UnexpectedServerResponse(Cow::Owned(format!(
                "unexpected content type for event stream: {other:?}"
            )))),
        }
    }
}
