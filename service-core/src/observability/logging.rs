use crate::error::CoreError;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Options controlling the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingOptions {
    pub service_name: String,
    /// Default filter directive used when `RUST_LOG` is not set.
    pub log_level: String,
    /// OTLP gRPC collector endpoint; spans are only exported when set.
    pub otlp_endpoint: Option<String>,
    /// Emit flattened JSON lines instead of compact human-readable output.
    pub json: bool,
}

impl TracingOptions {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            json: true,
        }
    }
}

fn build_tracer(service_name: &str, endpoint: &str) -> Result<sdktrace::Tracer, CoreError> {
    let otlp_exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(otlp_exporter)
        .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
            KeyValue::new("service.name", service_name.to_string()),
        ])))
        .install_batch(runtime::Tokio)?;

    Ok(tracer)
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine readable.
pub fn init_tracing(options: &TracingOptions) -> Result<(), CoreError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&options.log_level));

    let telemetry = match options.otlp_endpoint.as_deref() {
        Some(endpoint) if !endpoint.is_empty() => {
            let tracer = build_tracer(&options.service_name, endpoint)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        _ => None,
    };

    let formatting_layer = if options.json {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .json()
            .flatten_event(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(telemetry)
        .with(formatting_layer)
        .try_init()?;

    tracing::debug!(
        service = %options.service_name,
        otlp = options.otlp_endpoint.is_some(),
        "Tracing initialised"
    );

    Ok(())
}
