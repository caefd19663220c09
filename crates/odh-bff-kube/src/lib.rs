//! # ODH BFF Kubernetes
//!
//! Everything the request pipeline asks of the Kubernetes API server.
//!
//! ## Modules
//!
//! - `factory` - Internal (shared service account) and token (per caller) client factories
//! - `client` - The `KubernetesClient` capability set and access-review questions
//! - `real` - `KubernetesClient` over `kube`
//! - `access` - Namespace fan-out with a bounded worker pool
//! - `service_url` - `status.serviceURL` discovery from dashboard-labelled custom resources
//! - `discovery` - Dashboard namespace and cluster domain
//! - `mock` - In-memory cluster for `MOCK_K8S_CLIENT` and tests

pub mod access;
pub mod client;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod mock;
pub mod real;
pub mod resources;
pub mod service_url;

pub use access::{NamespaceAccessResult, NamespaceAccessor};
pub use client::{AccessCheck, KubernetesClient};
pub use error::KubeError;
pub use factory::{InternalClientFactory, KubernetesClientFactory, TokenClientFactory};
pub use mock::{MockClientFactory, MockCluster, MockKubernetesClient};
pub use real::{KubeApiClient, ReviewMode};
pub use resources::CustomResourceKind;
pub use service_url::resolve_service_url;
