//! Logging and trace export.
//!
//! Console logging through `tracing-subscriber` is always on. When
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set and the collector accepts a quick TCP
//! connection, traces and logs are also shipped over OTLP.

use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_SERVICE_NAME: &str = "loafly-server";
const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Keeps the OTLP providers alive; flushes them when dropped.
#[derive(Default)]
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down trace provider: {}", e);
            }
        }
        if let Some(provider) = self.logger_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down log provider: {}", e);
            }
        }
    }
}

/// Strip the scheme so the endpoint can be resolved as `host:port`.
fn host_port(endpoint: &str) -> &str {
    endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/')
}

fn is_reachable(endpoint: &str) -> bool {
    host_port(endpoint)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok())
        .unwrap_or(false)
}

fn otlp_providers(
    endpoint: &str,
    service_name: &str,
) -> Result<(SdkTracerProvider, SdkLoggerProvider), Box<dyn std::error::Error + Send + Sync>> {
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .with_resource(resource.clone())
        .build();

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let logger_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    Ok((tracer_provider, logger_provider))
}

fn init_console_only() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn init_telemetry() -> TelemetryGuard {
    let Some(endpoint) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok() else {
        init_console_only();
        tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, using console logging only");
        return TelemetryGuard::default();
    };

    if !is_reachable(&endpoint) {
        init_console_only();
        tracing::info!(
            "OpenTelemetry endpoint {} not reachable, using console logging only",
            endpoint
        );
        return TelemetryGuard::default();
    }

    let service_name =
        env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

    let (tracer_provider, logger_provider) = match otlp_providers(&endpoint, &service_name) {
        Ok(providers) => providers,
        Err(e) => {
            init_console_only();
            tracing::warn!("Failed to create OTLP exporters, using console logging only: {}", e);
            return TelemetryGuard::default();
        }
    };

    let tracer = tracer_provider.tracer(DEFAULT_SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(OpenTelemetryTracingBridge::new(&logger_provider))
        .init();

    tracing::info!(
        "OpenTelemetry enabled, exporting traces and logs to {} as {}",
        endpoint,
        service_name
    );

    TelemetryGuard {
        tracer_provider: Some(tracer_provider),
        logger_provider: Some(logger_provider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port_strips_scheme() {
        assert_eq!(host_port("http://collector:4317"), "collector:4317");
        assert_eq!(host_port("https://collector:4317/"), "collector:4317");
        assert_eq!(host_port("localhost:4317"), "localhost:4317");
    }

    #[test]
    fn test_unresolvable_endpoint_is_unreachable() {
        assert!(!is_reachable("http://definitely-not-a-host.invalid:4317"));
    }
}
