//! Diagnostics port
//!
//! The codec and the request executor report what they are doing through
//! [`DiagnosticsSink`]. Events are purely observational: a sink can never
//! change control flow. Infrastructure provides a `tracing`-backed sink;
//! tests use [`RecordingDiagnostics`] to assert on events.

use std::time::Duration;

/// Severity attached to each event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured diagnostic event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An HTTP attempt is about to be sent
    RequestStarted { method: String, url: String, attempt: u32 },
    /// An HTTP attempt produced a response (any status)
    ResponseReceived { method: String, url: String, attempt: u32, status: u16, elapsed: Duration },
    /// A transient failure will be retried after `delay`
    RetryScheduled { method: String, url: String, attempt: u32, delay: Duration, cause: String },
    /// The retry budget ran out
    RetriesExhausted { method: String, url: String, attempts: u32, cause: String },
    /// A keyed row was encoded without a column schema; column order falls
    /// back to the row's insertion order
    SchemaMissing { columns: Vec<String> },
    /// A non-empty response body was not JSON and is returned as raw text
    NonJsonBody { url: String, bytes: usize },
}

impl Diagnostic {
    pub fn level(&self) -> DiagnosticLevel {
        match self {
            Self::RequestStarted { .. } | Self::ResponseReceived { .. } => DiagnosticLevel::Debug,
            Self::RetryScheduled { .. } | Self::SchemaMissing { .. } | Self::NonJsonBody { .. } => {
                DiagnosticLevel::Warn
            }
            Self::RetriesExhausted { .. } => DiagnosticLevel::Error,
        }
    }
}

/// Receiver for diagnostic events
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, event: &Diagnostic);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn emit(&self, _event: &Diagnostic) {}
}

/// Sink that keeps every event in memory, for assertions in tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: parking_lot::Mutex<Vec<Diagnostic>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    pub fn at_level(&self, level: DiagnosticLevel) -> Vec<Diagnostic> {
        self.events.lock().iter().filter(|e| e.level() == level).cloned().collect()
    }

    /// Delays of every `RetryScheduled` event, in order.
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Diagnostic::RetryScheduled { delay, .. } => Some(*delay),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl DiagnosticsSink for RecordingDiagnostics {
    fn emit(&self, event: &Diagnostic) {
        self.events.lock().push(event.clone());
    }
}
