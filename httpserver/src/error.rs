//! Unified error types for the server lifecycle.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

/// Boxed error used for listener and hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error returned by [`Server::run`](crate::Server::run) and the
/// construction path.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid server or file configuration.
    #[error("config: {0}")]
    Config(String),

    /// Registering the interruption signal handler failed.
    #[error("signal: failed to register interrupt handler")]
    Signal(#[source] std::io::Error),

    /// The listener could not bind its address.
    #[error("server: failed to bind {addr}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The accept/serve loop failed.
    #[error("server: {0}")]
    Serve(#[source] std::io::Error),

    /// The listener was closed on purpose.
    ///
    /// Returned by [`Listener::listen_and_serve`](crate::Listener::listen_and_serve)
    /// after a shutdown. Not an application failure.
    #[error("server closed")]
    ServerClosed,

    /// The background serve task panicked or was aborted.
    #[error("server: serve task did not complete")]
    ServeTask(#[source] JoinError),

    /// A custom listener reported a failure.
    #[error("listener: {0}")]
    Listener(#[source] BoxError),

    /// Draining in-flight connections did not finish before the deadline.
    #[error("shutdown: drain did not finish within {0:?}")]
    DrainTimeout(Duration),

    /// One or more shutdown hooks failed.
    #[error(transparent)]
    Hooks(#[from] HookErrors),
}

impl Error {
    /// Creates a [`Error::Config`] from any message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wraps an arbitrary error raised by a [`Listener`](crate::Listener) implementation.
    pub fn listener(err: impl Into<BoxError>) -> Self {
        Self::Listener(err.into())
    }

    /// Whether this is the expected "closed" sentinel rather than a failure.
    #[must_use]
    pub const fn is_server_closed(&self) -> bool {
        matches!(self, Self::ServerClosed)
    }

    /// Whether the shutdown phase ran out of time, while draining or inside a hook.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            Self::DrainTimeout(_) => true,
            Self::Hooks(errors) => errors.iter().any(HookError::is_deadline_exceeded),
            _ => false,
        }
    }
}

/// A single shutdown hook failure.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook returned an error.
    #[error("shutdown hook #{index} failed: {source}")]
    Failed {
        /// Zero-based registration index of the hook.
        index: usize,
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },

    /// The shared deadline passed while hook `index` was running.
    ///
    /// `not_run` counts the hooks that never completed, `index` included.
    #[error("shutdown hook #{index} exceeded the shutdown deadline, {not_run} hook(s) did not complete")]
    DeadlineExceeded {
        /// Zero-based registration index of the interrupted hook.
        index: usize,
        /// Number of hooks that did not complete.
        not_run: usize,
    },
}

impl HookError {
    /// Registration index of the hook this error belongs to.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Failed { index, .. } | Self::DeadlineExceeded { index, .. } => *index,
        }
    }

    /// Whether this entry was caused by the shutdown deadline.
    #[must_use]
    pub const fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}

/// Every failure collected while running shutdown hooks, in hook order.
#[derive(Debug)]
pub struct HookErrors(Vec<HookError>);

impl HookErrors {
    pub(crate) const fn new(errors: Vec<HookError>) -> Self {
        Self(errors)
    }

    /// Number of collected failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a value returned by the server.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the individual failures.
    pub fn iter(&self) -> std::slice::Iter<'_, HookError> {
        self.0.iter()
    }

    /// Consumes the aggregate and returns the individual failures.
    #[must_use]
    pub fn into_inner(self) -> Vec<HookError> {
        self.0
    }
}

impl fmt::Display for HookErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for HookErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0
            .first()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl<'a> IntoIterator for &'a HookErrors {
    type Item = &'a HookError;
    type IntoIter = std::slice::Iter<'a, HookError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_errors_display_one_cause_per_line() {
        let errors = HookErrors::new(vec![
            HookError::Failed {
                index: 1,
                source: "database close failed".into(),
            },
            HookError::DeadlineExceeded {
                index: 2,
                not_run: 2,
            },
        ]);

        let rendered = errors.to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("#1") && lines[0].contains("database close failed"));
        assert!(lines[1].contains("#2") && lines[1].contains("2 hook(s)"));
    }

    #[test]
    fn deadline_detection_covers_drain_and_hooks() {
        assert!(Error::DrainTimeout(Duration::from_secs(1)).is_deadline_exceeded());
        assert!(!Error::ServerClosed.is_deadline_exceeded());

        let hooks = Error::Hooks(HookErrors::new(vec![HookError::DeadlineExceeded {
            index: 0,
            not_run: 1,
        }]));
        assert!(hooks.is_deadline_exceeded());
    }

    #[test]
    fn sentinel_is_distinguishable() {
        assert!(Error::ServerClosed.is_server_closed());
        assert!(!Error::config("bad").is_server_closed());
        assert!(!Error::listener("boom").is_server_closed());
    }

    #[test]
    fn hook_error_keeps_original_source() {
        let err = HookError::Failed {
            index: 0,
            source: std::io::Error::other("flush").into(),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("flush"));
        assert_eq!(err.index(), 0);
    }
}
