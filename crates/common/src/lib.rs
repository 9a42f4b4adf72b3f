//! Common utilities shared across GridRest crates.
//!
//! - `encoding`: base64 helpers for blob payloads and Basic credentials
//! - `ids`: monotonic identifier generators with an injectable clock
//! - `resilience`: retry policy and backoff calculation used by the
//!   request executor

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod encoding;
pub mod ids;
pub mod resilience;

// Re-export commonly used types and traits for convenience
pub use encoding::{basic_auth_header, decode_base64, encode_base64};
pub use ids::{time_ordered_key, Clock, IdError, ManualClock, SnowflakeGenerator, SystemClock};
pub use resilience::{BackoffStrategy, RetryDecision, RetryPolicy};
