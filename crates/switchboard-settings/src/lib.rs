//! # switchboard-settings
//!
//! Layered configuration for the relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`SwitchboardSettings::default()`])
//! 2. **Settings file** (`--config`, `SWITCHBOARD_CONFIG` or `./switchboard.json`,
//!    deep-merged over defaults)
//! 3. **Environment variables** (`SWITCHBOARD_*` overrides)
//!
//! The binary applies its own CLI flags on top.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_overrides, deep_merge, load_settings, load_settings_from_path,
    load_settings_with, settings_path, validate,
};
pub use types::*;
