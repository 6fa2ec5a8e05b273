//! Input device enumeration and selection.
//!
//! Devices are identified by their position in the enumeration order, the same
//! IDs `livewave list-devices` prints.

use super::capture::{AudioBackend, CaptureSettings};
use crate::error::{PipelineError, Result};

/// One supported input configuration range of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputConfigRange {
    pub channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    /// Inclusive buffer size limits in frames, when the host reports them
    pub buffer_size: Option<(u32, u32)>,
}

impl InputConfigRange {
    pub fn contains_rate(&self, sample_rate: u32) -> bool {
        (self.min_sample_rate..=self.max_sample_rate).contains(&sample_rate)
    }

    /// Whether the host can deliver callbacks of exactly `frames` frames.
    pub fn accepts_buffer(&self, frames: usize) -> bool {
        match self.buffer_size {
            Some((min, max)) => u32::try_from(frames).is_ok_and(|f| (min..=max).contains(&f)),
            None => false,
        }
    }
}

/// An input device as seen by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: usize,
    pub name: String,
    pub is_default: bool,
    pub input_configs: Vec<InputConfigRange>,
}

impl DeviceDescriptor {
    /// Checks whether the device can capture with `settings`.
    ///
    /// Chunks are assembled from whatever buffer sizes the host delivers, so only
    /// the sample rate constrains device choice.
    pub fn supports(&self, settings: &CaptureSettings) -> std::result::Result<(), String> {
        if self.input_configs.is_empty() {
            return Err("device reports no input configurations".to_string());
        }

        if self.best_config(settings).is_some() {
            return Ok(());
        }

        let ranges = self
            .input_configs
            .iter()
            .map(|c| {
                if c.min_sample_rate == c.max_sample_rate {
                    format!("{}Hz", c.min_sample_rate)
                } else {
                    format!("{}-{}Hz", c.min_sample_rate, c.max_sample_rate)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        Err(format!(
            "sample rate {}Hz is outside the supported range(s): {ranges}",
            settings.sample_rate
        ))
    }

    /// Picks the input configuration to open: matching sample rate, fewest
    /// channels, preferring one that accepts a fixed buffer of `chunk_size`.
    pub fn best_config(&self, settings: &CaptureSettings) -> Option<&InputConfigRange> {
        self.input_configs
            .iter()
            .filter(|c| c.channels > 0 && c.contains_rate(settings.sample_rate))
            .min_by_key(|c| (!c.accepts_buffer(settings.chunk_size), c.channels))
    }
}

/// Snapshot of the input devices available when it was queried.
#[derive(Debug, Clone)]
pub struct DeviceDirectory {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceDirectory {
    /// Queries the audio subsystem once.
    ///
    /// # Errors
    /// - `DeviceQuery` if the subsystem is unavailable
    pub fn query<B: AudioBackend + ?Sized>(backend: &B) -> Result<Self> {
        let devices = backend.list_devices()?;
        tracing::debug!("Found {} audio input device(s)", devices.len());
        Ok(Self::from_devices(devices))
    }

    pub fn from_devices(devices: Vec<DeviceDescriptor>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn into_devices(self) -> Vec<DeviceDescriptor> {
        self.devices
    }

    /// Resolves a device id, or the system default for `None`.
    ///
    /// # Errors
    /// - `DeviceNotFound` if the id is out of range or no default device exists
    /// - `UnsupportedConfiguration` if the device cannot capture with `settings`
    pub fn resolve(
        &self,
        id: Option<usize>,
        settings: &CaptureSettings,
    ) -> Result<&DeviceDescriptor> {
        let device = match id {
            Some(id) => self.devices.get(id),
            None => self.devices.iter().find(|d| d.is_default),
        }
        .ok_or(PipelineError::DeviceNotFound {
            id,
            available: self.devices.len(),
        })?;

        device
            .supports(settings)
            .map_err(|reason| PipelineError::UnsupportedConfiguration {
                device: device.name.clone(),
                sample_rate: settings.sample_rate,
                chunk_size: settings.chunk_size,
                reason,
            })?;

        Ok(device)
    }
}
