//! # GridRest Core
//!
//! Pure logic layer - no HTTP, no filesystem.
//!
//! This crate contains:
//! - The row codec (logical row <-> positional wire row, scalar coercion)
//! - SQL statement assembly with separately carried bindings
//! - Batch chunk planning and outcome accounting
//! - The diagnostics port used to surface codec and transport events
//!
//! ## Architecture Principles
//! - Depends only on `gridrest-common` and `gridrest-domain`
//! - Never fails on malformed row input; degrades to null or pass-through
//! - All observable side effects go through [`DiagnosticsSink`]

pub mod batch;
pub mod codec;
pub mod sql;

// Infrastructure ports
pub mod diagnostics_ports;

// Re-export specific items to avoid ambiguity
pub use batch::{plan_chunks, BatchFailure, BatchOutcome, ChunkSpan};
pub use codec::{coerce, coerce_generic, convert_from_wire, RowCodec};
#[cfg(any(test, feature = "test-utils"))]
pub use diagnostics_ports::RecordingDiagnostics;
pub use diagnostics_ports::{Diagnostic, DiagnosticLevel, DiagnosticsSink, NoopDiagnostics};
pub use sql::{DeleteOptions, SelectOptions, SortOrder, UpdateOptions};
