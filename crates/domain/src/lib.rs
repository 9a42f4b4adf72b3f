//! # GridRest Domain
//!
//! Data types shared by the codec and the HTTP layer.
//!
//! This crate contains:
//! - Scalar values, logical rows and column schema types
//! - Query / update result shapes returned by the remote service
//! - Connection configuration and the resolved connection profile
//! - The `GridError` taxonomy and `Result` alias
//!
//! ## Architecture
//! - No I/O
//! - Only depends on `gridrest-common` plus serialization crates

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
