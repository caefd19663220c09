//! # ODH BFF MCP
//!
//! Short-lived MCP client sessions used for server health and tool
//! introspection.
//!
//! - `config` - Client identity, timeouts and transport selection
//! - `http` - reqwest client with the caller's MCP bearer and status checking
//! - `sse` - SSE client transport
//! - `streamable` - Status-checked streamable-HTTP client
//! - `error` - Failure taxonomy and classification
//! - `schema` - Tool input schema reduction
//! - `session` - `McpClient` and the one-shot session implementation

pub mod config;
pub mod error;
pub mod http;
pub mod schema;
pub mod session;
pub mod sse;
pub mod streamable;

pub use config::{select_transport, McpClientConfig};
pub use error::{McpError, McpErrorCode};
pub use http::{HttpStatusError, StatusLog, TransportError};
pub use schema::convert_input_schema;
pub use session::{BffClientHandler, McpClient, SessionMcpClient};
pub use sse::SseClientTransport;
pub use streamable::CheckedHttpClient;
