//! MCP integration tests
//!
//! Real MCP sessions against in-process servers, both directly and through
//! the status routes.

mod sessions;
mod status_routes;
