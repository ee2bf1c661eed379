//! Tracing subscriber setup.

use oci_purge_core::LogLevel;
use tracing_subscriber::EnvFilter;

use crate::commands::LogFormat;

/// Install the global subscriber. `RUST_LOG` overrides `level`.
///
/// Logs go to stderr so stdout carries only the run summary.
pub fn init(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed (tests); keep it.
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
