//! The lifecycle controller.
//!
//! A [`Server`] goes through four states: idle after construction (the
//! interrupt watcher is already armed), serving once [`Server::run`] spawned
//! the listener, draining after a shutdown request, and stopped when `run`
//! returns. `run` consumes the server, so the shutdown sequence executes at
//! most once and hooks cannot be added after draining started.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::builder::ServerBuilder;
use crate::context::ShutdownContext;
use crate::error::{BoxError, Error};
use crate::hooks::ShutdownHooks;
use crate::listener::{Listener, join_host_port};
use crate::logger::Logger;
use crate::signal::SigDown;

/// HTTP server with signal-driven graceful shutdown.
#[derive(Debug)]
pub struct Server {
    pub(crate) address: String,
    pub(crate) port: u16,
    pub(crate) shutdown_timeout: Duration,
    pub(crate) listener: Arc<dyn Listener>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) signal: SigDown,
    pub(crate) hooks: ShutdownHooks,
}

impl Server {
    /// Creates a server with default settings for `router`.
    ///
    /// An empty `address` binds every interface. Must be called from within a
    /// Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signal`] if the interrupt handler cannot be registered.
    pub fn new(address: impl Into<String>, port: u16, router: Router) -> Result<Self, Error> {
        Self::builder(address, port, router).build()
    }

    /// Starts a [`ServerBuilder`] to override the defaults.
    pub fn builder(address: impl Into<String>, port: u16, router: Router) -> ServerBuilder {
        ServerBuilder::new(address, port, router)
    }

    /// Registers a cleanup callback run after the listener drained.
    ///
    /// Hooks run one after another in registration order and share the
    /// remaining shutdown budget through their [`ShutdownContext`].
    pub fn add_shutdown_hook<F, Fut, E>(&mut self, hook: F)
    where
        F: FnOnce(ShutdownContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.hooks.push(hook);
    }

    /// Token cancelled when a shutdown is requested.
    ///
    /// Cancelling it has the same effect as receiving the interrupt signal.
    #[must_use]
    pub fn context(&self) -> CancellationToken {
        self.signal.cancellation_token()
    }

    /// Configured bind address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Configured port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Upper bound for draining plus all shutdown hooks.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Number of registered shutdown hooks.
    #[must_use]
    pub fn shutdown_hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Serves until the listener stops on its own or a shutdown is requested.
    ///
    /// If the listener finishes first its result is returned as is, which may
    /// be [`Error::ServerClosed`]; the hooks do not run in that case. If the
    /// shutdown signal fires first the watcher is disarmed and the graceful
    /// shutdown sequence runs.
    ///
    /// # Errors
    ///
    /// Returns the listener's error, [`Error::DrainTimeout`] or a listener
    /// drain error, or [`Error::Hooks`] with every hook failure.
    pub async fn run(self) -> Result<(), Error> {
        self.logger.info(&format!(
            "Starting HTTP server http://{}",
            join_host_port(&self.address, self.port)
        ));

        let token = self.signal.cancellation_token();
        let listener = Arc::clone(&self.listener);
        let base = token.clone();
        let mut serve = tokio::spawn(async move { listener.listen_and_serve(base).await });

        tokio::select! {
            joined = &mut serve => {
                self.signal.stop();
                return joined.unwrap_or_else(|err| Err(Error::ServeTask(err)));
            }
            () = token.cancelled() => {
                // Further interrupts must not start a second shutdown.
                self.signal.stop();
            }
        }

        self.graceful_shutdown(serve).await
    }

    async fn graceful_shutdown(self, serve: JoinHandle<Result<(), Error>>) -> Result<(), Error> {
        let Self {
            shutdown_timeout,
            listener,
            logger,
            hooks,
            ..
        } = self;
        let ctx = ShutdownContext::with_timeout(shutdown_timeout);

        logger.info("Shutting down ..");
        listener.set_keep_alives_enabled(false);

        match tokio::time::timeout_at(ctx.deadline(), listener.shutdown(ctx)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                serve.abort();
                return Err(err);
            }
            Err(_) => {
                serve.abort();
                return Err(Error::DrainTimeout(shutdown_timeout));
            }
        }

        hooks.run(ctx, logger.as_ref()).await?;
        logger.debug("Shutdown complete");
        Ok(())
    }
}
