//! `httpserver serve` command — run the HTTP server until interrupted.
//!
//! Reads TOML configuration, sets up logging and telemetry, then runs the
//! built-in routes under a [`Server`] so that an interrupt drains in-flight
//! requests and flushes telemetry before the process exits.

use std::path::Path;

use axum::http::Method;
use dotenvy::dotenv;
use httpserver::Server;
use tower_http::cors;

use crate::config::load_config;
use crate::routes;

#[cfg(feature = "telemetry")]
use crate::telemetry::Telemetry;
#[cfg(feature = "telemetry")]
use httpserver::BoxError;

/// Execute the `serve` command.
///
/// # Errors
///
/// Returns an error if configuration loading or signal registration fails,
/// if the server cannot bind, or if the shutdown sequence fails.
#[allow(clippy::future_not_send)]
pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();

    let config = load_config(config_path)?;

    #[cfg(feature = "telemetry")]
    let telemetry = Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_log_level(config.log_level())
        .register();
    #[cfg(not(feature = "telemetry"))]
    init_console_logging(config.log_level());

    let router = routes::routes();
    #[cfg(feature = "telemetry")]
    let router = router.layer(telemetry.http_tracing());
    let router = router.layer(
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET])
            .allow_headers(cors::Any),
    );

    #[cfg_attr(not(feature = "telemetry"), allow(unused_mut))]
    let mut server = Server::builder(config.host(), config.port(), router)
        .with_shutdown_timeout(config.shutdown_timeout())
        .build()?;

    #[cfg(feature = "telemetry")]
    server.add_shutdown_hook(move |_ctx| async move {
        tokio::task::spawn_blocking(move || telemetry.shutdown())
            .await?
            .map_err(BoxError::from)
    });

    match server.run().await {
        Err(err) if err.is_server_closed() => {
            tracing::info!("Server closed");
            Ok(())
        }
        result => result.map_err(Into::into),
    }
}

#[cfg(not(feature = "telemetry"))]
fn init_console_logging(level: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let fallback = level.unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .init();
}
