//! # ODH BFF Core
//!
//! Types shared by every layer of the BFF request pipeline.
//!
//! ## Modules
//!
//! - `constants` - Header names, query parameters, deadlines
//! - `config` - Process configuration read from the environment
//! - `error` - Error taxonomy and the JSON error envelope
//! - `identity` - `RequestIdentity` and header extraction
//! - `models` - Payloads that cross component boundaries (MCP status, namespaces)
//! - `validation` - Input validation helpers

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod models;
pub mod validation;

pub use config::{AuthMethod, ConfigError, EnvConfig};
pub use error::{ApiError, Envelope, ErrorBody, ErrorCode, ErrorEnvelope};
pub use identity::{extract_identity, IdentityConfig, IdentityError, RequestIdentity};
pub use models::*;
