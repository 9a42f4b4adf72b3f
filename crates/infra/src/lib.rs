//! # GridRest Infrastructure
//!
//! I/O side of the client.
//!
//! This crate contains:
//! - The retrying, authenticated HTTP request executor (reqwest)
//! - `GridClient`, the container / row / SQL convenience layer
//! - The per-container schema cache
//! - Configuration loading from the environment, `.env`, JSON or TOML
//! - The `tracing`-backed diagnostics sink and subscriber setup
//!
//! ## Architecture
//! - Implements the `DiagnosticsSink` port defined in `gridrest-core`
//! - Depends on `gridrest-common`, `gridrest-domain` and `gridrest-core`

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod http;
pub mod logging;
pub mod schema_cache;

// Re-export commonly used items
pub use client::{GridClient, WriteMode};
pub use diagnostics::TracingDiagnostics;
pub use http::{container_path, Method, RequestExecutor, RequestExecutorBuilder, RequestOptions};
pub use logging::{init_tracing, LogFormat, LoggingError};
pub use schema_cache::{SchemaCache, SchemaSource};
