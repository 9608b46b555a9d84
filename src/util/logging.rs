//! Logging initialization for host programs.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the binary embedding it.

use crate::config::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the event filter: `RUST_LOG` if set, otherwise `level`.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `level` - Log level filter (e.g., "info", "debug"), overridden by `RUST_LOG`
/// * `format` - Log output format (json or pretty)
pub fn init_logging(level: &str, format: &LogFormat) {
    let registry = tracing_subscriber::registry().with(build_filter(level));

    match format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_current_span(true))
                .init();
        }
        LogFormat::Pretty => {
            registry
                .with(fmt::layer().pretty().with_target(false))
                .init();
        }
    }
}
