use thiserror::Error;

/// Errors raised by the shared infrastructure (configuration and telemetry setup).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration directory not found: {0}")]
    ConfigDirectoryMissing(String),

    #[error("Telemetry error: {0}")]
    TelemetryError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<opentelemetry::trace::TraceError> for CoreError {
    fn from(err: opentelemetry::trace::TraceError) -> Self {
        CoreError::TelemetryError(err.to_string())
    }
}

impl From<tracing_subscriber::util::TryInitError> for CoreError {
    fn from(err: tracing_subscriber::util::TryInitError) -> Self {
        CoreError::TelemetryError(err.to_string())
    }
}
