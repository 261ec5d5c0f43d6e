//! Graceful lifecycle controller for HTTP servers.
//!
//! [`Server`] starts a listener in the background, waits for either the
//! listener to stop or the process interrupt signal, then drains in-flight
//! requests and runs the registered shutdown hooks, all within one bounded
//! shutdown budget.
//!
//! ```no_run
//! use axum::{Router, routing::get};
//! use httpserver::Server;
//!
//! # async fn example() -> Result<(), httpserver::Error> {
//! let router = Router::new().route("/", get(|| async { "Ok" }));
//! let mut server = Server::new("", 8080, router)?;
//! server.add_shutdown_hook(|ctx| async move {
//!     tracing::info!(remaining = ?ctx.remaining(), "closing database pool");
//!     Ok::<_, std::io::Error>(())
//! });
//!
//! match server.run().await {
//!     Err(err) if err.is_server_closed() => Ok(()),
//!     other => other,
//! }
//! # }
//! ```

mod builder;
mod context;
mod error;
mod hooks;
mod listener;
mod logger;
mod server;
mod signal;

pub use builder::{DEFAULT_ADDRESS, DEFAULT_SHUTDOWN_TIMEOUT, ServerBuilder};
pub use context::ShutdownContext;
pub use error::{BoxError, Error, HookError, HookErrors};
pub use listener::{BoxFuture, HttpListener, Listener};
pub use logger::{Logger, TracingLogger};
pub use server::Server;
pub use signal::{FORCED_EXIT_CODE, SigDown};
pub use tokio_util::sync::CancellationToken;
