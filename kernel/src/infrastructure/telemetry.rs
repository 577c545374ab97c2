//! Logging, tracing and metrics setup.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{BatchSpanProcessor, Sampler, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::infrastructure::config::TelemetrySettings;
use crate::infrastructure::metrics;

/// Handles kept alive for the lifetime of the process.
#[derive(Debug, Default)]
pub struct Telemetry {
    /// Renders the Prometheus exposition text, when metrics are enabled.
    pub prometheus: Option<PrometheusHandle>,
}

impl Telemetry {
    /// Install the global subscriber: JSON logs filtered by `RUST_LOG` or
    /// the configured level, plus OTLP span export when an endpoint is set.
    /// With `with_metrics`, the Prometheus recorder is installed too.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be built, or if a global
    /// subscriber or recorder is already installed.
    pub fn init(
        settings: &TelemetrySettings,
        service_version: &str,
        with_metrics: bool,
    ) -> Result<Self> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

        let tracer = settings
            .otlp_endpoint
            .as_deref()
            .map(|endpoint| otlp_tracer(settings, service_version, endpoint))
            .transpose()?;

        Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
            .with(tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t)))
            .try_init()
            .context("Failed to init subscriber")?;

        let prometheus = if with_metrics {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?;
            metrics::describe();
            Some(handle)
        } else {
            None
        };

        Ok(Self { prometheus })
    }
}

fn otlp_tracer(
    settings: &TelemetrySettings,
    service_version: &str,
    endpoint: &str,
) -> Result<SdkTracer> {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to build OTLP span exporter")?;

    let provider = SdkTracerProvider::builder()
        .with_span_processor(BatchSpanProcessor::builder(exporter).build())
        .with_resource(
            Resource::builder()
                .with_service_name(settings.service_name.clone())
                .with_attribute(KeyValue::new(
                    resource::SERVICE_VERSION,
                    service_version.to_string(),
                ))
                .build(),
        )
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
            settings.sampling_ratio,
        ))))
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider.tracer(settings.service_name.clone()))
}
