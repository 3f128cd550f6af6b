//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HeraldSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `HERALD_*` environment variable overrides
//! 4. Validate the result

use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::HeraldSettings;

/// Resolve the default settings file path (`~/.herald/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".herald").join("settings.json")
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid final value
/// is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HeraldSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<HeraldSettings> {
    let mut merged = serde_json::to_value(HeraldSettings::default())?;
    if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        merge_layer(&mut merged, serde_json::from_str(&content)?);
    } else {
        debug!(?path, "settings file not found, using defaults");
    }
    Ok(serde_json::from_value(merged)?)
}

/// Overlay `layer` onto `base` in place.
///
/// Objects merge key by key. A `null` leaves the base value untouched;
/// any other value replaces it, arrays included.
pub fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_layer(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `HERALD_*` environment overrides to loaded settings.
///
/// Numbers must parse and fall inside the accepted range; anything else
/// is ignored with a warning and the file/default value stays.
pub fn apply_env_overrides(settings: &mut HeraldSettings) {
    let server = &mut settings.server;
    if let Some(v) = env_value("HERALD_HOST") {
        server.host = v;
    }
    if let Some(v) = env_in_range("HERALD_PORT", 0..=u16::MAX) {
        server.port = v;
    }
    if let Some(v) = env_in_range("HERALD_MAX_SUBSCRIBERS", 1..=1_000_000) {
        server.max_subscribers = v;
    }
    if let Some(v) = env_in_range("HERALD_WRITE_TIMEOUT_MS", 1..=600_000) {
        server.write_timeout_ms = v;
    }
    if let Some(v) = env_in_range("HERALD_KEEP_ALIVE_MS", 0..=3_600_000) {
        server.keep_alive_interval_ms = v;
    }
    if let Some(v) = env_in_range("HERALD_CHANNEL_CAPACITY", 1..=65_536) {
        server.channel_capacity = v;
    }

    let logging = &mut settings.logging;
    if let Some(v) = env_value("HERALD_LOG_LEVEL") {
        logging.level = v;
    }
    if let Some(v) = env_value("HERALD_LOG_FORMAT") {
        match serde_json::from_value(Value::String(v.to_lowercase())) {
            Ok(format) => logging.format = format,
            Err(_) => {
                warn!(key = "HERALD_LOG_FORMAT", value = %v, "unknown log format, ignoring");
            }
        }
    }
}

/// Parse `raw` as a number inside `range`.
pub fn parse_in_range<T>(raw: &str, range: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    raw.trim().parse().ok().filter(|n| range.contains(n))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_in_range<T>(name: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd + fmt::Debug,
{
    let raw = env_value(name)?;
    let parsed = parse_in_range(&raw, &range);
    if parsed.is_none() {
        warn!(key = name, value = %raw, ?range, "invalid env override, ignoring");
    }
    parsed
}
