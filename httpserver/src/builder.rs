//! Construction and configuration of a [`Server`].

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::error::Error;
use crate::hooks::ShutdownHooks;
use crate::listener::{HttpListener, Listener, join_host_port};
use crate::logger::{Logger, TracingLogger};
use crate::server::Server;
use crate::signal::SigDown;

/// Shutdown budget used when none is configured.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Bind address used when an empty one is given.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Builder for [`Server`].
///
/// Every `with_*` call overrides exactly one attribute; calls are applied in
/// order, so the last one wins.
#[derive(Debug)]
#[must_use]
pub struct ServerBuilder {
    address: String,
    port: u16,
    router: Router,
    shutdown_timeout: Duration,
    logger: Option<Arc<dyn Logger>>,
    listener: Option<Arc<dyn Listener>>,
    signal: Option<SigDown>,
}

impl ServerBuilder {
    pub(crate) fn new(address: impl Into<String>, port: u16, router: Router) -> Self {
        let address = address.into();
        let address = if address.trim().is_empty() {
            DEFAULT_ADDRESS.to_owned()
        } else {
            address
        };
        Self {
            address,
            port,
            router,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            logger: None,
            listener: None,
            signal: None,
        }
    }

    /// Replaces the default [`TracingLogger`].
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Replaces [`DEFAULT_SHUTDOWN_TIMEOUT`]. Must be greater than zero.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Serves through `listener` instead of an [`HttpListener`] for the router.
    pub fn with_listener(mut self, listener: impl Listener) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Uses `signal` instead of watching the process interrupt signal.
    pub fn with_signal(mut self, signal: SigDown) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Wires the server and starts watching for the interrupt signal.
    ///
    /// No socket is bound here. Must be called from within a Tokio runtime
    /// unless a signal was supplied with [`ServerBuilder::with_signal`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero shutdown timeout and
    /// [`Error::Signal`] if signal registration fails.
    pub fn build(self) -> Result<Server, Error> {
        if self.shutdown_timeout.is_zero() {
            return Err(Error::config("shutdown timeout must be greater than zero"));
        }

        let listener = self.listener.unwrap_or_else(|| {
            Arc::new(HttpListener::new(
                join_host_port(&self.address, self.port),
                self.router,
            ))
        });
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));
        let signal = match self.signal {
            Some(signal) => signal,
            None => SigDown::try_new().map_err(Error::Signal)?,
        };

        Ok(Server {
            address: self.address,
            port: self.port,
            shutdown_timeout: self.shutdown_timeout,
            listener,
            logger,
            signal,
            hooks: ShutdownHooks::default(),
        })
    }
}
