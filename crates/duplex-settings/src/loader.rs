//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DuplexSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `DUPLEX_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{DuplexSettings, FrameKind};

/// Resolve the path to the settings file (`~/.duplex/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".duplex").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DuplexSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON, or a merged result that
/// fails [`DuplexSettings::validate`], is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DuplexSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn read_settings_file(path: &Path) -> Result<DuplexSettings> {
    let defaults = serde_json::to_value(DuplexSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `DUPLEX_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut DuplexSettings) {
    apply_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` in place of the process environment.
///
/// Empty values are treated as unset. Values that fail to parse or fall
/// outside their range are logged at `warn` and ignored.
pub fn apply_overrides_with(settings: &mut DuplexSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // server
    if let Some(v) = read("DUPLEX_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("DUPLEX_PORT") {
        if let Some(port) = checked("DUPLEX_PORT", &v, parse_u16_range(&v, 0, u16::MAX)) {
            settings.server.port = port;
        }
    }
    if let Some(v) = read("DUPLEX_WS_PATH") {
        if let Some(path) = checked("DUPLEX_WS_PATH", &v, v.starts_with('/').then(|| v.clone())) {
            settings.server.path = path;
        }
    }
    if let Some(v) = read("DUPLEX_MAX_MESSAGE_SIZE") {
        let parsed = parse_usize_range(&v, 1, 1 << 30);
        if let Some(size) = checked("DUPLEX_MAX_MESSAGE_SIZE", &v, parsed) {
            settings.server.max_message_size = size;
        }
    }
    if let Some(v) = read("DUPLEX_FRAME_KIND") {
        if let Some(kind) = checked("DUPLEX_FRAME_KIND", &v, v.parse::<FrameKind>().ok()) {
            settings.server.frame_kind = kind;
        }
    }

    // connection
    if let Some(v) = read("DUPLEX_INBOUND_CAPACITY") {
        let parsed = parse_usize_range(&v, 1, 1_000_000);
        if let Some(cap) = checked("DUPLEX_INBOUND_CAPACITY", &v, parsed) {
            settings.connection.inbound_capacity = cap;
        }
    }
    if let Some(v) = read("DUPLEX_OUTBOUND_CAPACITY") {
        let parsed = parse_usize_range(&v, 1, 1_000_000);
        if let Some(cap) = checked("DUPLEX_OUTBOUND_CAPACITY", &v, parsed) {
            settings.connection.outbound_capacity = cap;
        }
    }

    // logging
    if let Some(v) = read("DUPLEX_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("DUPLEX_LOG_FORMAT") {
        if let Some(format) = checked("DUPLEX_LOG_FORMAT", &v, v.parse().ok()) {
            settings.logging.format = format;
        }
    }
}

fn checked<T>(key: &str, raw: &str, parsed: Option<T>) -> Option<T> {
    if parsed.is_none() {
        warn!(key, value = %raw, "invalid env var, ignoring");
    }
    parsed
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
