//! Logging setup and request correlation.

mod subscriber;
mod trace_context;

pub use subscriber::{init_tracing, log_filter};
pub use trace_context::{generate_trace_id, TraceContext};
