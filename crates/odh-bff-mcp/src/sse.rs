//! Client side of the MCP SSE transport.
//!
//! The session opens with a `GET` that returns an event stream. The server's
//! first `endpoint` event names the URL that client messages are `POST`ed
//! to. Server messages arrive as `message` events on the stream.

use futures::StreamExt;
use reqwest::header::ACCEPT;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::Transport;
use rmcp::RoleClient;
use sse_stream::SseStream;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::http::{StatusLog, TransportError};

/// Resolve the `endpoint` event against the stream URL. Cross-origin
/// endpoints are rejected so the bearer never leaves the server's origin.
fn resolve_endpoint(base: &Url, data: &str) -> Result<Url, TransportError> {
    let endpoint = base
        .join(data.trim())
        .map_err(|e| TransportError::Protocol(format!("invalid SSE endpoint {data:?}: {e}")))?;
    if endpoint.origin() != base.origin() {
        return Err(TransportError::Protocol(format!(
            "SSE endpoint {endpoint} is not on the server origin"
        )));
    }
    Ok(endpoint)
}

pub struct SseClientTransport {
    http: reqwest::Client,
    endpoint: Url,
    incoming: mpsc::Receiver<ServerJsonRpcMessage>,
    stop: CancellationToken,
    log: StatusLog,
}

impl SseClientTransport {
    /// Open the event stream and wait for the `endpoint` event.
    pub async fn connect(
        http: reqwest::Client,
        url: &str,
        log: StatusLog,
    ) -> Result<Self, TransportError> {
        let base = Url::parse(url)
            .map_err(|e| TransportError::Protocol(format!("invalid server URL {url:?}: {e}")))?;
        let response = http
            .get(base.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = log.check(response).await?;

        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let (messages_tx, incoming) = mpsc::channel(32);
        let stop = CancellationToken::new();
        tokio::spawn(read_events(
            response,
            base,
            endpoint_tx,
            messages_tx,
            stop.clone(),
        ));

        let endpoint = match endpoint_rx.await {
            Ok(endpoint) => endpoint?,
            Err(_) => {
                return Err(TransportError::Protocol(
                    "SSE stream ended before the endpoint event".to_string(),
                ))
            }
        };
        debug!(endpoint = %endpoint, "SSE endpoint received");

        Ok(Self {
            http,
            endpoint,
            incoming,
            stop,
            log,
        })
    }
}

async fn read_events(
    response: reqwest::Response,
    base: Url,
    endpoint_tx: oneshot::Sender<Result<Url, TransportError>>,
    messages: mpsc::Sender<ServerJsonRpcMessage>,
    stop: CancellationToken,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut events = SseStream::from_bytes_stream(response.bytes_stream()).boxed();

    loop {
        let event = tokio::select! {
            _ = stop.cancelled() => break,
            event = events.next() => event,
        };
        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                debug!(error = %e, "SSE stream failed");
                break;
            }
            None => break,
        };
        let Some(data) = event.data else {
            continue;
        };

        match event.event.as_deref().unwrap_or("message") {
            "endpoint" => {
                if let Some(tx) = endpoint_tx.take() {
                    let _ = tx.send(resolve_endpoint(&base, &data));
                }
            }
            "message" => match serde_json::from_str::<ServerJsonRpcMessage>(&data) {
                Ok(message) => {
                    if messages.send(message).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "Dropping malformed SSE message"),
            },
            other => debug!(event = other, "Ignoring SSE event"),
        }
    }
}

impl Transport<RoleClient> for SseClientTransport {
    type Error = TransportError;

    fn send(
        &mut self,
        item: ClientJsonRpcMessage,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let stop = self.stop.clone();
        let log = self.log.clone();
        async move {
            if stop.is_cancelled() {
                return Err(TransportError::Closed);
            }
            let response = http.post(endpoint).json(&item).send().await?;
            log.check(response).await?;
            Ok(())
        }
    }

    fn receive(&mut self) -> impl Future<Output = Option<ServerJsonRpcMessage>> + Send {
        async move { self.incoming.recv().await }
    }

    fn close(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.stop.cancel();
        self.incoming.close();
        async { Ok(()) }
    }
}

impl Drop for SseClientTransport {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}
