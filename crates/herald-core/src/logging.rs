//! Structured logging with `tracing`.
//!
//! [`init_subscriber`] installs the global subscriber once at startup.
//! `RUST_LOG` takes precedence over the configured level so operators can
//! raise verbosity without touching the settings file.

use serde::{Deserialize, Serialize};

/// Output format of the stderr log stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Initialize the global tracing subscriber writing to stderr.
///
/// Call once at application startup. Later calls leave the installed
/// subscriber in place and return `false`.
///
/// # Arguments
///
/// * `level` - Filter directive used when `RUST_LOG` is unset (e.g. `"info"`).
/// * `format` - Compact text or JSON lines.
pub fn init_subscriber(level: &str, format: LogFormat) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "global subscriber already set, keeping it");
            false
        }
    }
}
