//! The transport the lifecycle controller starts and drains.
//!
//! [`Listener`] is the whole contract between the controller and the network:
//! serve until told to stop, optionally stop reusing idle connections, and
//! drain. [`HttpListener`] implements it on top of `axum::serve`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::ShutdownContext;
use crate::error::Error;

/// Boxed future returned by [`Listener`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A network server the controller can start and drain.
pub trait Listener: Send + Sync + 'static {
    /// Accepts and serves connections until stopped.
    ///
    /// `base` is the controller's shutdown token. Implementations should make
    /// it reachable from request handlers so they can observe cancellation.
    ///
    /// Must return [`Error::ServerClosed`] once stopped by [`Listener::shutdown`].
    fn listen_and_serve(&self, base: CancellationToken) -> BoxFuture<'_, Result<(), Error>>;

    /// Enables or disables connection reuse. Does nothing unless overridden.
    fn set_keep_alives_enabled(&self, enabled: bool) {
        let _ = enabled;
    }

    /// Stops accepting connections and waits for in-flight requests.
    ///
    /// The controller enforces `ctx`'s deadline on the returned future.
    fn shutdown(&self, ctx: ShutdownContext) -> BoxFuture<'_, Result<(), Error>>;
}

impl std::fmt::Debug for dyn Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Listener")
    }
}

/// Where an [`HttpListener`] is in its single serve/drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Serving,
    Stopped,
}

/// Default [`Listener`]: a plain HTTP/1 + HTTP/2 server for an axum [`Router`].
///
/// Handlers can extract the shutdown token with
/// `Extension(token): Extension<CancellationToken>`.
#[derive(Debug)]
pub struct HttpListener {
    addr: String,
    router: Router,
    keep_alive: Arc<AtomicBool>,
    phase: Mutex<Phase>,
    stop: CancellationToken,
    drained: CancellationToken,
}

impl HttpListener {
    /// Creates a listener for `addr` (`host:port`). Nothing is bound yet.
    pub fn new(addr: impl Into<String>, router: Router) -> Self {
        Self {
            addr: addr.into(),
            router,
            keep_alive: Arc::new(AtomicBool::new(true)),
            phase: Mutex::new(Phase::Idle),
            stop: CancellationToken::new(),
            drained: CancellationToken::new(),
        }
    }

    /// Address the listener binds to.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Moves to `next`, returning the phase it replaced.
    fn advance(&self, next: Phase) -> Phase {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *phase, next)
    }

    async fn serve(&self, base: CancellationToken) -> Result<(), Error> {
        let _drained = self.drained.clone().drop_guard();
        {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            if *phase == Phase::Stopped {
                return Err(Error::ServerClosed);
            }
            *phase = Phase::Serving;
        }

        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| Error::Bind {
                addr: self.addr.clone(),
                source,
            })?;

        let app = self
            .router
            .clone()
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.keep_alive),
                keep_alive_gate,
            ))
            .layer(Extension(base));

        let stop = self.stop.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(stop.cancelled_owned())
            .await
            .map_err(Error::Serve)?;

        if self.stop.is_cancelled() {
            Err(Error::ServerClosed)
        } else {
            Ok(())
        }
    }

    async fn drain(&self) -> Result<(), Error> {
        let previous = self.advance(Phase::Stopped);
        self.stop.cancel();
        if previous == Phase::Serving {
            self.drained.cancelled().await;
        }
        Ok(())
    }
}

impl Listener for HttpListener {
    fn listen_and_serve(&self, base: CancellationToken) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(self.serve(base))
    }

    fn set_keep_alives_enabled(&self, enabled: bool) {
        self.keep_alive.store(enabled, Ordering::Release);
    }

    fn shutdown(&self, _ctx: ShutdownContext) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(self.drain())
    }
}

/// Asks the client to close the connection once keep-alives are disabled.
async fn keep_alive_gate(
    State(keep_alive): State<Arc<AtomicBool>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if !keep_alive.load(Ordering::Acquire) {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }
    response
}

/// Formats `host:port`, bracketing IPv6 literals.
pub(crate) fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
