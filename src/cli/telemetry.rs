//! Log subscriber and optional OTLP/gRPC span export.
//!
//! Export is enabled by `OTEL_EXPORTER_OTLP_ENDPOINT`. Exporter metadata comes
//! from `OTEL_EXPORTER_OTLP_HEADERS`, which the tonic exporter reads itself.

use anyhow::Result;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
};
use std::{env::var, sync::OnceLock, time::Duration};
use tonic::transport::ClientTlsConfig;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
use ulid::Ulid;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

// gRPC collectors default to TLS when no scheme is given.
fn collector_endpoint(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Host to verify the collector certificate against, `None` for plaintext.
fn tls_domain(endpoint: &str) -> Option<&str> {
    let authority = endpoint.strip_prefix("https://")?.split('/').next()?;
    let host = authority.rsplit_once(':').map_or(authority, |(host, _)| host);
    (!host.is_empty()).then_some(host)
}

fn resource() -> Resource {
    let instance_id = var("OTEL_SERVICE_INSTANCE_ID").unwrap_or_else(|_| Ulid::new().to_string());
    Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance_id),
        ])
        .build()
}

fn init_tracer(raw_endpoint: &str) -> Result<Tracer> {
    let endpoint = collector_endpoint(raw_endpoint);

    let mut builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .with_compression(Compression::Gzip)
        .with_timeout(EXPORT_TIMEOUT);

    if let Some(domain) = tls_domain(&endpoint) {
        builder = builder.with_tls_config(
            ClientTlsConfig::new()
                .domain_name(domain.to_string())
                .with_native_roots(),
        );
    }

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(builder.build()?)
        .with_resource(resource())
        .build();

    let _ = TRACER_PROVIDER.set(provider.clone());

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    debug!(endpoint = %endpoint, "OTLP span export enabled");

    Ok(provider.tracer(env!("CARGO_PKG_NAME")))
}

/// Install the global subscriber. Spans are exported only when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
///
/// # Errors
///
/// Returns an error if the exporter or the subscriber cannot be installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let fmt_layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .pretty();

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.unwrap_or(Level::ERROR).into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    let registry = Registry::default().with(fmt_layer).with(filter);

    match var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => {
            let tracer = init_tracer(&endpoint)?;
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            tracing::subscriber::set_global_default(registry.with(otel_layer))?;
        }
        Err(_) => tracing::subscriber::set_global_default(registry)?,
    }

    Ok(())
}

/// Flush and stop the span exporter, if one was installed.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(err) = provider.shutdown()
    {
        debug!("tracer provider shutdown: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_endpoint_defaults_to_https() {
        assert_eq!(collector_endpoint("http://localhost:4317"), "http://localhost:4317");
        assert_eq!(collector_endpoint("localhost:4317"), "https://localhost:4317");
        assert_eq!(
            collector_endpoint(" otel.example.com:4317/ "),
            "https://otel.example.com:4317"
        );
    }

    #[test]
    fn tls_domain_only_for_https() {
        assert_eq!(tls_domain("https://otel.example.com:4317"), Some("otel.example.com"));
        assert_eq!(tls_domain("https://otel.example.com/v1"), Some("otel.example.com"));
        assert_eq!(tls_domain("http://localhost:4317"), None);
    }

    #[test]
    fn shutdown_without_exporter_is_a_noop() {
        shutdown_tracer();
    }
}
