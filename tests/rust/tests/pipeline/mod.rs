//! Request pipeline integration tests
//!
//! Drive the full router (identity, authorization, namespace and upstream
//! layers) over a mock cluster.

mod identity;
mod namespaces;
mod upstreams;
