//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a
//! settings file may contain any subset of fields.

use std::time::Duration;

use herald_core::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 8080, "writeTimeoutMs": 2000 },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeraldSettings {
    /// HTTP listener and broadcaster settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl HeraldSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.server;
        if s.write_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "server.writeTimeoutMs must be greater than 0".into(),
            ));
        }
        if s.channel_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.channelCapacity must be greater than 0".into(),
            ));
        }
        if s.max_subscribers == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxSubscribers must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener and broadcaster settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Maximum number of simultaneously connected subscribers.
    pub max_subscribers: usize,
    /// Upper bound for one write to one subscriber, in milliseconds.
    pub write_timeout_ms: u64,
    /// Interval between keep-alive comment frames; `0` disables them.
    pub keep_alive_interval_ms: u64,
    /// Frames buffered per subscriber before writes start waiting.
    pub channel_capacity: usize,
    /// How long shutdown waits for background tasks, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl ServerSettings {
    /// Write timeout as a [`Duration`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Keep-alive interval, `None` when disabled.
    pub fn keep_alive_interval(&self) -> Option<Duration> {
        let ms = self.keep_alive_interval_ms;
        (ms > 0).then(|| Duration::from_millis(ms))
    }

    /// Shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_subscribers: 10_000,
            write_timeout_ms: 5_000,
            keep_alive_interval_ms: 15_000,
            channel_capacity: 64,
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
