//! HTTP transport: the retrying request executor

mod client;

pub use client::{container_path, RequestExecutor, RequestExecutorBuilder, RequestOptions};
pub use reqwest::Method;
