//! Batch chunk planning and outcome accounting
//!
//! Large inserts are split into fixed-size chunks that are submitted one
//! after another. A failed chunk is recorded and the remaining chunks are
//! still attempted.

use gridrest_domain::{GridError, Result};
use serde::{Deserialize, Serialize};

/// Position of one chunk inside the caller's row slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub index: usize,
    pub offset: usize,
    pub len: usize,
}

impl ChunkSpan {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Split `total` rows into spans of at most `chunk_size`.
///
/// # Errors
///
/// Returns `InvalidInput` when `chunk_size` is zero.
pub fn plan_chunks(total: usize, chunk_size: usize) -> Result<Vec<ChunkSpan>> {
    if chunk_size == 0 {
        return Err(GridError::InvalidInput("chunk size must be greater than zero".into()));
    }

    Ok((0..total)
        .step_by(chunk_size)
        .enumerate()
        .map(|(index, offset)| ChunkSpan { index, offset, len: chunk_size.min(total - offset) })
        .collect())
}

/// A chunk that the service rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub chunk_index: usize,
    /// Offset of the chunk's first row in the submitted slice
    pub offset: usize,
    pub rows: usize,
    pub message: String,
}

/// Result of a chunked submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Rows in chunks that were accepted
    pub succeeded: usize,
    /// Rows in chunks that failed
    pub failed: usize,
    pub errors: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn record_success(&mut self, span: &ChunkSpan) {
        self.succeeded += span.len;
    }

    pub fn record_failure(&mut self, span: &ChunkSpan, message: impl Into<String>) {
        self.failed += span.len;
        self.errors.push(BatchFailure {
            chunk_index: span.index,
            offset: span.offset,
            rows: span.len,
            message: message.into(),
        });
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
