//! Interruption signal handling.
//!
//! [`SigDown`] turns the process interrupt signal (SIGINT on Unix, Ctrl+C on
//! Windows) into a [`CancellationToken`] that the server and its handlers
//! observe. A [`SigDown::manual`] instance has no OS registration at all and
//! is triggered programmatically, which is how tests drive a shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// Exit status used when an interrupt arrives after the watcher was disarmed.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Cancellation source fired by the process interrupt signal.
///
/// The first interrupt cancels the token. Once [`SigDown::stop`] has been
/// called the watcher no longer requests a graceful shutdown: a further
/// interrupt ends the process with [`FORCED_EXIT_CODE`], as an unhandled
/// SIGINT would. Dropping the instance ends its watcher, so only live
/// instances react to interrupts.
#[derive(Debug)]
pub struct SigDown {
    watcher: Option<AbortHandle>,
    cancellation_token: CancellationToken,
    armed: Arc<AtomicBool>,
}

impl SigDown {
    /// Creates a signal handler and spawns the background watcher.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    #[allow(clippy::unnecessary_wraps)]
    pub fn try_new() -> Result<Self, std::io::Error> {
        let mut sig_down = Self::manual();
        let inner = sig_down.cancellation_token.clone();
        let armed = Arc::clone(&sig_down.armed);

        #[cfg(unix)]
        {
            let mut sigint = signal(SignalKind::interrupt())?;
            let watcher = tokio::spawn(async move {
                while sigint.recv().await.is_some() {
                    if !armed.load(Ordering::Acquire) {
                        std::process::exit(FORCED_EXIT_CODE);
                    }
                    inner.cancel();
                }
            });
            sig_down.watcher = Some(watcher.abort_handle());
        }

        #[cfg(windows)]
        {
            let watcher = tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if !armed.load(Ordering::Acquire) {
                        std::process::exit(FORCED_EXIT_CODE);
                    }
                    inner.cancel();
                }
            });
            sig_down.watcher = Some(watcher.abort_handle());
        }

        Ok(sig_down)
    }

    /// Creates a source that only fires through [`SigDown::trigger`] or its token.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            watcher: None,
            cancellation_token: CancellationToken::new(),
            armed: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns a clone of the cancellation token for distributing to subsystems.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Requests a shutdown as if the interrupt had been received.
    pub fn trigger(&self) {
        self.cancellation_token.cancel();
    }

    /// Whether an interrupt still maps to a graceful shutdown.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Whether a shutdown was requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Disarms the watcher and cancels the token. Safe to call repeatedly.
    pub fn stop(&self) {
        self.armed.store(false, Ordering::Release);
        self.cancellation_token.cancel();
    }

    /// Waits until a shutdown is requested.
    pub async fn recv(&self) {
        self.cancellation_token.cancelled().await;
    }
}

impl Drop for SigDown {
    fn drop(&mut self) {
        self.stop();
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
