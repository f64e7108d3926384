//! # duplex-settings
//!
//! Layered configuration for the duplex server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`DuplexSettings::default()`])
//! 2. **User file** at `~/.duplex/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** with the `DUPLEX_*` prefix (highest priority)
//!
//! Command-line flags on the `duplex-agent` binary are applied on top.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_with, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::{ConnectionSettings, DuplexSettings, FrameKind, LoggingSettings, ServerSettings};
