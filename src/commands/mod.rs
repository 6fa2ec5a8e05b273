//! Application command handlers for livewave.
//!
//! # Commands
//! - `visualize`: Live waveform window (default)
//! - `select_device`: Interactive input device picker used by `--select-device`
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod list_devices;
pub mod logs;
pub mod select_device;
pub mod visualize;

pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use visualize::handle_visualize;
