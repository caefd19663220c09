//! Kubernetes integration tests
//!
//! The full router over real kube clients, with wiremock standing in for
//! the API server.

mod cluster;
