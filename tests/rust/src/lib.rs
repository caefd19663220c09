//! Shared fixtures for the BFF integration tests.

/// Router construction and request helpers
pub mod harness;

/// In-process MCP servers
pub mod servers;

pub use harness::{
    get, get_as, mock_router, post_json_as, router, router_with_factory, send, user_config,
};
pub use servers::{refused_url, start_sse_server, start_streamable_server, TestServer};
