//! Log subscriber installation.
//!
//! Library code logs through both `log` (storage layer) and `tracing` (sync
//! layer). [`init_logging`] routes `log` records into `tracing` and installs
//! one formatting subscriber for both.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::TelemetryError;

/// Installs the global subscriber. Can succeed only once per process.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_override = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&config.level, env_override.as_deref())?;

    tracing_log::LogTracer::init().map_err(|e| TelemetryError::LogBridge(e.to_string()))?;

    let registry = Registry::default().with(filter);
    let result = match config.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::Subscriber(e.to_string()))
}

/// `RUST_LOG`, when set and non-blank, wins over the configured level.
fn build_filter(level: &str, env_override: Option<&str>) -> Result<EnvFilter, TelemetryError> {
    let directives = env_override
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(level);

    EnvFilter::try_new(directives).map_err(|e| TelemetryError::InvalidFilter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}
