//! # ODH BFF Gateway
//!
//! The authenticated request pipeline in front of the dashboard's backing
//! services:
//! - Panic recovery, telemetry and CORS around every request
//! - Caller identity for every `/api/v1` route
//! - Namespace, access-review and upstream-client middleware per route
//! - Upstream clients (EvalHub, Llama Stack, MLflow, MaaS) with mocks
//! - MCP catalog, status and tool routes

pub mod error;
pub mod logging;
pub mod server;
pub mod tls;
pub mod upstream;

pub use error::HttpError;
pub use server::{build_router, run, AppState};
pub use tls::CaPool;
pub use upstream::{AttachedUpstream, ClientTarget, UpstreamError, UpstreamKind, Upstreams};
