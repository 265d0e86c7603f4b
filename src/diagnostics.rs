//! Injectable diagnostics.
//!
//! Normalization warnings and per-tag evaluation checks go through a
//! [`Diagnostics`] implementation instead of straight to the process log, so
//! callers can route or capture them.

use std::sync::{Arc, Mutex};

use crate::spec::{SpecWarning, TrackType};

/// Receives diagnostic output from tag-spec normalization and evaluation.
pub trait Diagnostics: Send + Sync {
    /// A non-fatal problem in a tag specification.
    fn warn(&self, warning: &SpecWarning);

    /// A tag is being checked during satisfaction evaluation.
    fn checking(&self, _tag: &str, _track_type: TrackType) {}
}

/// Default diagnostics: forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, warning: &SpecWarning) {
        tracing::warn!(tag = warning.tag(), "{warning}");
    }

    fn checking(&self, tag: &str, track_type: TrackType) {
        tracing::trace!(tag, %track_type, "checking tag status");
    }
}

/// Keeps warnings in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    warnings: Arc<Mutex<Vec<SpecWarning>>>,
    checks: Arc<Mutex<Vec<(String, TrackType)>>>,
}

impl RecordingDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warnings recorded so far, oldest first.
    #[must_use]
    pub fn warnings(&self) -> Vec<SpecWarning> {
        self.warnings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Tag checks recorded so far, oldest first.
    #[must_use]
    pub fn checks(&self) -> Vec<(String, TrackType)> {
        self.checks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.warnings.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.checks.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn warn(&self, warning: &SpecWarning) {
        self.warnings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(warning.clone());
    }

    fn checking(&self, tag: &str, track_type: TrackType) {
        self.checks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((tag.to_string(), track_type));
    }
}
