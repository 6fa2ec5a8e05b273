//! Configuration management for livewave.
//!
//! Loads the TOML configuration file from the user's config directory and
//! resolves it, together with command-line overrides, into the settings the
//! pipeline runs with.

pub mod file;

pub use file::{ConfigOverrides, DeviceSelection, LivewaveConfig};
