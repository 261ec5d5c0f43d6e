//! Leveled log sink used by the lifecycle controller.

use std::fmt;

/// Destination for the controller's lifecycle messages.
///
/// The server holds it behind an `Arc`, so the same sink can be shared with
/// the rest of the application.
pub trait Logger: Send + Sync {
    /// Records an informational message.
    fn info(&self, message: &str);

    /// Records a diagnostic message. Ignored unless overridden.
    fn debug(&self, message: &str) {
        let _ = message;
    }
}

/// Default [`Logger`] that forwards to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "httpserver", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "httpserver", "{message}");
    }
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Logger")
    }
}
