//! Error types surfaced to callers

use thiserror::Error;

/// Categories of errors, mirroring how callers are expected to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid endpoint, credentials or deployment settings
    Config,
    /// Remote rejected the request (4xx)
    Client,
    /// Transient failures persisted through every attempt
    Exhausted,
    /// Response arrived but had an unusable shape
    Response,
    /// Caller-supplied arguments rejected before any request
    Input,
    /// Request could not be constructed
    Internal,
}

/// Main error type for GridRest operations
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{method} {url} returned status {status}: {body}")]
    Status { method: String, url: String, status: u16, body: String, attempts: u32 },

    #[error("{method} {url} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        method: String,
        url: String,
        attempts: u32,
        status: Option<u16>,
        body: Option<String>,
        last_error: String,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GridError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Status { .. } => ErrorCategory::Client,
            Self::RetriesExhausted { .. } => ErrorCategory::Exhausted,
            Self::UnexpectedResponse(_) => ErrorCategory::Response,
            Self::InvalidInput(_) => ErrorCategory::Input,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status of the final response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RetriesExhausted { status, .. } => *status,
            _ => None,
        }
    }

    /// Raw body of the final response, if one was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            Self::RetriesExhausted { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Number of attempts made before the final response or failure.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } | Self::Status { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether a caller-level retry of the whole operation could help.
    ///
    /// Transport-level retries have already happened inside the executor by
    /// the time any error is returned.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Exhausted)
    }
}

/// Result type alias for GridRest operations
pub type Result<T> = std::result::Result<T, GridError>;
