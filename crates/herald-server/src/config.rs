//! Server configuration.

use std::time::Duration;

use herald_settings::ServerSettings;

/// Runtime configuration for [`HeraldServer`](crate::server::HeraldServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent subscribers.
    pub max_subscribers: usize,
    /// Upper bound for one write to one subscriber.
    pub write_timeout: Duration,
    /// Keep-alive comment interval; `None` disables keep-alives.
    pub keep_alive_interval: Option<Duration>,
    /// Frames buffered per subscriber.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_subscribers: 10_000,
            write_timeout: Duration::from_secs(5),
            keep_alive_interval: Some(Duration::from_secs(15)),
            channel_capacity: 64,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            max_subscribers: s.max_subscribers,
            write_timeout: s.write_timeout(),
            keep_alive_interval: s.keep_alive_interval(),
            channel_capacity: s.channel_capacity,
        }
    }
}
