//! Presentation-mode side effect of the dark-mode flag.
//!
//! The store calls the sink while it holds its state lock, after computing
//! the new flag and before committing it. Sinks must not call back into the
//! store.

use std::sync::Mutex;

/// Receives the presentation mode every time the dark-mode flag is set.
pub trait PresentationSink: Send + Sync {
    fn apply_dark_mode(&self, dark: bool);
}

/// Ignores every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPresentation;

impl PresentationSink for NoopPresentation {
    fn apply_dark_mode(&self, _dark: bool) {}
}

/// Logs the mode change.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresentation;

impl PresentationSink for LogPresentation {
    fn apply_dark_mode(&self, dark: bool) {
        tracing::info!(mode = if dark { "dark" } else { "light" }, "presentation mode applied");
    }
}

/// Remembers every value it was given.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    calls: Mutex<Vec<bool>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values received so far, oldest first.
    pub fn calls(&self) -> Vec<bool> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recent value, if any.
    pub fn current(&self) -> Option<bool> {
        self.calls().last().copied()
    }
}

impl PresentationSink for RecordingPresentation {
    fn apply_dark_mode(&self, dark: bool) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(dark);
    }
}
