//! # herald-settings
//!
//! Configuration for the herald broadcaster, loaded from three layers
//! (in priority order):
//! 1. **Compiled defaults**: [`HeraldSettings::default()`]
//! 2. **User file**: `~/.herald/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `HERALD_*` overrides (highest priority)
//!
//! The binary applies CLI flags on top of the loaded value. There is no
//! global settings instance: the loaded [`HeraldSettings`] is passed to
//! whatever needs it.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings_from_path, merge_layer, settings_path};
pub use types::*;
