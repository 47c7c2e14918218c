//! Diagnostics sinks handed to every handler call
//!
//! There is no process-wide logger: callers pass a [`Diagnostics`]
//! implementation in the [`Context`](crate::convergence::Context).
//! [`TracingDiagnostics`] forwards to `tracing`; installing a subscriber is up
//! to the application. [`RecordingDiagnostics`] keeps events in memory.

use std::cell::RefCell;

use crate::resource::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
}

/// Sink for events emitted while converging a resource
pub trait Diagnostics {
    fn emit(&self, severity: Severity, resource: &ResourceId, message: &str);
}

/// Sink that forwards events to the `tracing` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, severity: Severity, resource: &ResourceId, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(resource = %resource, "{message}"),
            Severity::Info => tracing::info!(resource = %resource, "{message}"),
            Severity::Warning => tracing::warn!(resource = %resource, "{message}"),
        }
    }
}

/// A recorded diagnostics event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    pub resource: ResourceId,
    pub message: String,
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: RefCell<Vec<Event>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Messages of all warning events, in order
    pub fn warnings(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .map(|e| e.message.clone())
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, severity: Severity, resource: &ResourceId, message: &str) {
        self.events.borrow_mut().push(Event {
            severity,
            resource: resource.clone(),
            message: message.to_string(),
        });
    }
}
