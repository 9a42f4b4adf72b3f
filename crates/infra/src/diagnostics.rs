//! `tracing`-backed diagnostics sink

use gridrest_core::{Diagnostic, DiagnosticsSink};
use tracing::{debug, error, warn};

/// Forwards every [`Diagnostic`] to the matching `tracing` macro.
///
/// This is the default sink of [`RequestExecutor`](crate::http::RequestExecutor)
/// and [`GridClient`](crate::client::GridClient).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn emit(&self, event: &Diagnostic) {
        match event {
            Diagnostic::RequestStarted { method, url, attempt } => {
                debug!(attempt, %method, %url, "sending HTTP request");
            }
            Diagnostic::ResponseReceived { method, url, attempt, status, elapsed } => {
                debug!(
                    attempt,
                    %method,
                    %url,
                    status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "received HTTP response"
                );
            }
            Diagnostic::RetryScheduled { method, url, attempt, delay, cause } => {
                warn!(
                    attempt,
                    %method,
                    %url,
                    delay_ms = delay.as_millis() as u64,
                    cause = %cause,
                    "transient failure, retrying"
                );
            }
            Diagnostic::RetriesExhausted { method, url, attempts, cause } => {
                error!(attempts, %method, %url, cause = %cause, "retries exhausted");
            }
            Diagnostic::SchemaMissing { columns } => {
                warn!(
                    columns = ?columns,
                    "encoding keyed row without a schema; column order follows key insertion order"
                );
            }
            Diagnostic::NonJsonBody { url, bytes } => {
                warn!(%url, bytes, "response body is not JSON, returning raw text");
            }
        }
    }
}
