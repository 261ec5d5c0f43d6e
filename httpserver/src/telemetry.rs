//! `OpenTelemetry` tracing setup.
//!
//! Provides [`Telemetry`] for configuring console logging plus optional
//! distributed tracing export via OTLP. Only available with the `telemetry`
//! feature.

use std::env;
use std::time::Duration;

use axum::http::{Request, Response};
use opentelemetry::trace::{Status, TracerProvider};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_VERSION},
};
use thiserror::Error;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer};
use tracing::Span;
use tracing_opentelemetry::{OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Supported OTLP transport protocols.
#[derive(Debug, Clone, Copy)]
enum OtlpProtocol {
    Http,
    Grpc,
}

impl OtlpProtocol {
    /// Reads the protocol from `OTEL_EXPORTER_OTLP_*`. `None` when OTLP is not configured.
    fn from_env() -> Option<Self> {
        let configured = [
            "OTEL_EXPORTER_OTLP_ENDPOINT",
            "OTEL_EXPORTER_OTLP_HEADERS",
            "OTEL_EXPORTER_OTLP_PROTOCOL",
        ]
        .iter()
        .any(|key| env::var_os(key).is_some());

        configured.then(|| match env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
            Ok("grpc") => Self::Grpc,
            _ => Self::Http,
        })
    }
}

/// Resolve an env var with a programmatic fallback.
fn resolve_env(env_key: &str, fallback: Option<&Value>) -> Option<Value> {
    env::var(env_key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Value::from)
        .or_else(|| fallback.cloned())
}

/// Service identity and log settings for the telemetry pipeline.
///
/// Identity values can be overridden via `OTEL_SERVICE_NAME`,
/// `OTEL_SERVICE_VERSION` and `OTEL_SERVICE_DEPLOYMENT`.
#[derive(Debug, Default)]
pub struct Telemetry {
    name: Option<Value>,
    version: Option<Value>,
    deployment: Option<Value>,
    log_level: Option<String>,
}

impl Telemetry {
    /// Creates a new, empty [`Telemetry`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Value>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the service version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<Value>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the log filter used when `RUST_LOG` is not set.
    #[must_use]
    pub fn with_log_level(mut self, level: Option<&str>) -> Self {
        self.log_level = level.map(str::to_owned);
        self
    }

    fn resource(&self) -> Resource {
        let mut builder = Resource::builder();
        if let Some(name) = resolve_env("OTEL_SERVICE_NAME", self.name.as_ref()) {
            builder = builder.with_service_name(name);
        }

        let attributes: Vec<KeyValue> = [
            (SERVICE_VERSION, resolve_env("OTEL_SERVICE_VERSION", self.version.as_ref())),
            (
                DEPLOYMENT_ENVIRONMENT_NAME,
                resolve_env("OTEL_SERVICE_DEPLOYMENT", self.deployment.as_ref()),
            ),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| KeyValue::new(key, value)))
        .collect();
        if !attributes.is_empty() {
            builder = builder.with_schema_url(attributes, SCHEMA_URL);
        }
        builder.build()
    }

    fn init_tracer(&self, protocol: OtlpProtocol) -> Option<SdkTracerProvider> {
        let exporter = match protocol {
            OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .build(),
            OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .build(),
        };
        let exporter = exporter
            .inspect_err(|err| tracing::warn!(?err, "OTLP span exporter unavailable"))
            .ok()?;

        Some(
            SdkTracerProvider::builder()
                .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(self.resource())
                .with_batch_exporter(exporter)
                .build(),
        )
    }

    /// Installs the global subscriber and, when configured, the OTLP exporter.
    ///
    /// Without `OTEL_EXPORTER_OTLP_*` variables only console logging is set up.
    pub fn register(self) -> TelemetryGuard {
        let protocol = OtlpProtocol::from_env();
        let tracer_provider = protocol.and_then(|p| self.init_tracer(p));
        let otel_layer = tracer_provider
            .as_ref()
            .map(|tp| OpenTelemetryLayer::new(tp.tracer(env!("CARGO_PKG_NAME"))));

        let fallback = self.log_level.as_deref().unwrap_or("info");
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
            .with(tracing_subscriber::fmt::layer())
            .with(otel_layer)
            .init();

        if tracer_provider.is_some() {
            tracing::info!("OpenTelemetry span exporter registered");
        } else {
            tracing::info!("OpenTelemetry is not configured, console logging only");
        }

        TelemetryGuard { tracer_provider }
    }
}

/// Failure while flushing the span exporter.
#[derive(Debug, Error)]
#[error("tracer provider shutdown failed")]
pub struct TelemetryError(#[source] OTelSdkError);

/// Owns the tracer provider.
///
/// [`TelemetryGuard::shutdown`] is meant to run as a server shutdown hook;
/// dropping the guard without calling it still flushes pending spans.
#[derive(Debug)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flushes pending spans and shuts the provider down.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] when the exporter fails to flush.
    pub fn shutdown(mut self) -> Result<(), TelemetryError> {
        self.tracer_provider
            .take()
            .map_or(Ok(()), |tp| tp.shutdown().map_err(TelemetryError))
    }

    /// Creates an HTTP tracing layer for axum applications.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn http_tracing(
        &self,
    ) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, HttpMakeSpan, DefaultOnRequest, HttpOnResponse>
    {
        TraceLayer::new_for_http()
            .make_span_with(HttpMakeSpan)
            .on_response(HttpOnResponse)
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(tp) = self.tracer_provider.take()
            && let Err(err) = tp.shutdown()
        {
            tracing::error!(?err, "tracer provider shutdown error");
        }
    }
}

/// Span maker for HTTP requests.
#[derive(Clone, Copy, Debug)]
pub struct HttpMakeSpan;

impl<A> MakeSpan<A> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<A>) -> Span {
        tracing::info_span!(
            "http_request",
            otel.kind = "server",
            otel.name = %format!("{} {}", request.method(), request.uri().path()),
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
            status = tracing::field::Empty,
        )
    }
}

/// Response recorder for HTTP tracing.
#[derive(Clone, Copy, Debug)]
pub struct HttpOnResponse;

impl<A> OnResponse<A> for HttpOnResponse {
    fn on_response(self, response: &Response<A>, latency: Duration, span: &Span) {
        let status = response.status();
        span.record("status", status.as_u16());

        if status.is_server_error() {
            span.set_status(Status::error(
                status.canonical_reason().unwrap_or("unknown").to_owned(),
            ));
        } else {
            span.set_status(Status::Ok);
        }

        tracing::info!(
            "status={} elapsed={}ms",
            status.as_u16(),
            latency.as_millis()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_without_exporter_shuts_down_cleanly() {
        let guard = TelemetryGuard {
            tracer_provider: None,
        };
        assert!(guard.shutdown().is_ok());
    }
}
