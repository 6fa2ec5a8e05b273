//! List available audio input devices.

use crate::audio::{AudioBackend, CpalBackend, DeviceDescriptor};
use crate::controller;

/// Lists all available audio input devices on the system.
///
/// Only enumerates; no capture stream or window is opened.
///
/// # Errors
/// - If the audio host cannot be queried
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    let backend = CpalBackend::new();
    print!("{}", render_device_list(&backend)?);
    Ok(())
}

/// Formats the device listing printed by `livewave list-devices`.
pub fn render_device_list<B: AudioBackend + ?Sized>(backend: &B) -> Result<String, anyhow::Error> {
    let devices = controller::list_devices(backend)?;

    if devices.is_empty() {
        return Ok("No audio input devices found on this system.\n".to_string());
    }

    let mut out = String::from("\nAvailable audio input devices:\n\n");
    for device in &devices {
        let default_indicator = if device.is_default { " [DEFAULT]" } else { "" };
        out.push_str(&format!("  ID: {}\n", device.id));
        out.push_str(&format!("    Name: {}{}\n", device.name, default_indicator));
        out.push_str(&format!("    Config: {}\n\n", describe_configs(device)));
    }
    Ok(out)
}

/// One-line summary of a device's capture capabilities.
pub fn describe_configs(device: &DeviceDescriptor) -> String {
    if device.input_configs.is_empty() {
        return "(configuration unavailable)".to_string();
    }

    let max_channels = device
        .input_configs
        .iter()
        .map(|c| c.channels)
        .max()
        .unwrap_or(0);
    let min_rate = device
        .input_configs
        .iter()
        .map(|c| c.min_sample_rate)
        .min()
        .unwrap_or(0);
    let max_rate = device
        .input_configs
        .iter()
        .map(|c| c.max_sample_rate)
        .max()
        .unwrap_or(0);

    let rates = if min_rate == max_rate {
        format!("{min_rate}Hz")
    } else {
        format!("{min_rate}-{max_rate}Hz")
    };
    format!("{rates}, up to {max_channels} channel(s)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::{CaptureSettings, CaptureStats, ChunkSink, InputStream};
    use crate::audio::device::InputConfigRange;
    use crate::error::{PipelineError, Result};
    use std::cell::Cell;
    use std::sync::Arc;

    struct StaticBackend {
        devices: Vec<DeviceDescriptor>,
        open_calls: Cell<usize>,
    }

    impl AudioBackend for StaticBackend {
        fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
            Ok(self.devices.clone())
        }

        fn open_input(
            &self,
            device: &DeviceDescriptor,
            _settings: &CaptureSettings,
            _sink: ChunkSink,
            _stats: Arc<CaptureStats>,
        ) -> Result<Box<dyn InputStream>> {
            self.open_calls.set(self.open_calls.get() + 1);
            Err(PipelineError::DeviceOpen {
                device: device.name.clone(),
                reason: "not expected".into(),
            })
        }
    }

    fn descriptor(id: usize, name: &str, is_default: bool) -> DeviceDescriptor {
        DeviceDescriptor {
            id,
            name: name.into(),
            is_default,
            input_configs: vec![
                InputConfigRange {
                    channels: 1,
                    min_sample_rate: 8000,
                    max_sample_rate: 48000,
                    buffer_size: None,
                },
                InputConfigRange {
                    channels: 2,
                    min_sample_rate: 44100,
                    max_sample_rate: 96000,
                    buffer_size: None,
                },
            ],
        }
    }

    #[test]
    fn test_listing_marks_default_and_never_opens_capture() {
        let backend = StaticBackend {
            devices: vec![descriptor(0, "pipewire", false), descriptor(1, "USB Mic", true)],
            open_calls: Cell::new(0),
        };

        let listing = render_device_list(&backend).unwrap();

        assert!(listing.contains("ID: 0"));
        assert!(listing.contains("Name: USB Mic [DEFAULT]"));
        assert!(!listing.contains("pipewire [DEFAULT]"));
        assert!(listing.contains("8000-96000Hz, up to 2 channel(s)"));
        assert_eq!(backend.open_calls.get(), 0);
    }

    #[test]
    fn test_empty_listing() {
        let backend = StaticBackend {
            devices: vec![],
            open_calls: Cell::new(0),
        };
        assert!(render_device_list(&backend)
            .unwrap()
            .contains("No audio input devices"));
    }
}
