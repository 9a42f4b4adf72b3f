//! Resilience primitives
//!
//! Generic retry policy used by the HTTP request executor. The executor owns
//! failure classification; this module only budgets attempts and computes
//! the wait between them.

pub mod retry;

pub use retry::{BackoffStrategy, RetryDecision, RetryPolicy};
