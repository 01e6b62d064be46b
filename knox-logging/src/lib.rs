//! Structured logging setup for Knox client tools
//!
//! Library crates in this workspace only emit `tracing` events. Binaries call
//! one of the initialisers below exactly once at startup.

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Output flavour for the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event (for log shippers)
    Json,
    /// Human-readable lines (for terminals)
    #[default]
    Console,
}

impl LogFormat {
    /// Parse a format name, falling back to console output
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Console,
        }
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `default_level` when set. Returns an error if a
/// subscriber was already installed.
pub fn init_logging(
    service_name: &str,
    default_level: &str,
    format: LogFormat,
) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(default_level));

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .try_init()?,
        LogFormat::Console => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init()?,
    }

    tracing::info!(service = service_name, format = ?format, "Logging initialized");
    Ok(())
}

/// Initialize console logging, ignoring a subscriber that is already installed
pub fn init_console_logging(service_name: &str, default_level: &str) {
    if init_logging(service_name, default_level, LogFormat::Console).is_err() {
        tracing::debug!(service = service_name, "Subscriber already installed");
    }
}
