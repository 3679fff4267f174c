//! Logging and OpenTelemetry export.
//!
//! Console logging is always on and filtered by `RUST_LOG` (default `info`).
//! With the `telemetry` feature, setting any `OTEL_EXPORTER_OTLP_*` variable
//! additionally exports spans and metrics over OTLP.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
    /// An OTLP exporter could not be built.
    #[cfg(feature = "telemetry")]
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(feature = "telemetry")]
mod otel {
    use std::env;
    use std::time::Duration;

    use opentelemetry::KeyValue;
    use opentelemetry::global;
    use opentelemetry_otlp::{ExporterBuildError, WithExportConfig as _};
    use opentelemetry_sdk::Resource;
    use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
    use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
    use opentelemetry_semantic_conventions::SCHEMA_URL;
    use opentelemetry_semantic_conventions::attribute::{
        DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_VERSION,
    };

    /// OTLP transport selected by `OTEL_EXPORTER_OTLP_PROTOCOL`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(super) enum Protocol {
        Http,
        Grpc,
    }

    impl Protocol {
        /// `None` unless some `OTEL_EXPORTER_OTLP_*` variable is set.
        pub(super) fn from_env() -> Option<Self> {
            let enabled = ["ENDPOINT", "HEADERS", "PROTOCOL"]
                .iter()
                .any(|suffix| env::var(format!("OTEL_EXPORTER_OTLP_{suffix}")).is_ok());
            if !enabled {
                return None;
            }
            match env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
                Ok("grpc") => Some(Self::Grpc),
                _ => Some(Self::Http),
            }
        }
    }

    fn resource() -> Resource {
        let environment = env::var("DEPLOYMENT_ENV").unwrap_or_else(|_| "develop".to_owned());
        Resource::builder()
            .with_service_name(env!("CARGO_PKG_NAME"))
            .with_schema_url(
                [
                    KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                    KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, environment),
                ],
                SCHEMA_URL,
            )
            .build()
    }

    pub(super) fn tracer_provider(
        protocol: Protocol,
    ) -> Result<SdkTracerProvider, ExporterBuildError> {
        let builder = opentelemetry_otlp::SpanExporter::builder();
        let exporter = match protocol {
            Protocol::Http => builder.with_http().build()?,
            Protocol::Grpc => builder.with_tonic().with_timeout(Duration::from_secs(10)).build()?,
        };
        Ok(SdkTracerProvider::builder()
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
            .with_resource(resource())
            .with_batch_exporter(exporter)
            .build())
    }

    pub(super) fn meter_provider(
        protocol: Protocol,
    ) -> Result<SdkMeterProvider, ExporterBuildError> {
        let builder = opentelemetry_otlp::MetricExporter::builder();
        let exporter = match protocol {
            Protocol::Http => builder.with_http().build()?,
            Protocol::Grpc => builder.with_tonic().build()?,
        };
        let reader = PeriodicReader::builder(exporter)
            .with_interval(Duration::from_secs(30))
            .build();
        let provider = SdkMeterProvider::builder()
            .with_resource(resource())
            .with_reader(reader)
            .build();
        global::set_meter_provider(provider.clone());
        Ok(provider)
    }
}

/// Installed telemetry; flushes exporters when dropped.
#[derive(Debug, Default)]
pub struct Telemetry {
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
    #[cfg(feature = "telemetry")]
    meter_provider: Option<opentelemetry_sdk::metrics::SdkMeterProvider>,
}

impl Telemetry {
    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] if a subscriber is already set or an OTLP
    /// exporter cannot be built.
    pub fn init() -> Result<Self, TelemetryError> {
        #[cfg(feature = "telemetry")]
        if let Some(protocol) = otel::Protocol::from_env() {
            use opentelemetry::trace::TracerProvider as _;

            let tracer_provider = otel::tracer_provider(protocol)?;
            let meter_provider = otel::meter_provider(protocol)?;
            let tracer = tracer_provider.tracer(env!("CARGO_PKG_NAME"));

            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_opentelemetry::MetricsLayer::new(meter_provider.clone()))
                .with(tracing_opentelemetry::OpenTelemetryLayer::new(tracer))
                .try_init()?;
            tracing::info!(?protocol, "OpenTelemetry export enabled");

            return Ok(Self {
                tracer_provider: Some(tracer_provider),
                meter_provider: Some(meter_provider),
            });
        }

        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
        Ok(Self::default())
    }
}

#[cfg(feature = "telemetry")]
impl Drop for Telemetry {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take()
            && let Err(err) = provider.shutdown()
        {
            tracing::warn!(%err, "tracer provider shutdown failed");
        }
        if let Some(provider) = self.meter_provider.take()
            && let Err(err) = provider.shutdown()
        {
            tracing::warn!(%err, "meter provider shutdown failed");
        }
    }
}
