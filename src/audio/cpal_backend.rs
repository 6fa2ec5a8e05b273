//! cpal implementation of the audio backend.
//!
//! Captures from the system's input devices, keeps the first channel of the
//! stream and cuts it into fixed-size chunks on the cpal callback thread.

use super::capture::{
    on_input, AudioBackend, CaptureSettings, CaptureStats, ChunkSink, Continuity, GapDetector, InputStream,
};
use super::chunk::ChunkAssembler;
use super::device::{DeviceDescriptor, InputConfigRange};
use crate::error::{PipelineError, Result};
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::sync::Arc;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Audio backend on the platform's default cpal host.
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        let host = cpal::default_host();
        tracing::debug!("Using audio host: {:?}", host.id());
        Self { host }
    }

    /// Input devices whose name can be queried, in enumeration order.
    ///
    /// Devices that fail to report a name are skipped so that IDs match between
    /// listing and opening.
    fn named_input_devices(&self) -> Result<Vec<(cpal::Device, String)>> {
        suppress_alsa_warnings(|| {
            let devices = self
                .host
                .input_devices()
                .map_err(|e| PipelineError::DeviceQuery(e.to_string()))?
                .filter_map(|device| {
                    let name = device.name().ok()?;
                    Some((device, name))
                })
                .collect();
            Ok(devices)
        })
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let devices = self.named_input_devices()?;
        let default_name = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok());

        let descriptors = devices
            .iter()
            .enumerate()
            .map(|(id, (device, name))| DeviceDescriptor {
                id,
                name: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                input_configs: input_configs(device),
            })
            .collect();

        Ok(descriptors)
    }

    fn open_input(
        &self,
        descriptor: &DeviceDescriptor,
        settings: &CaptureSettings,
        sink: ChunkSink,
        stats: Arc<CaptureStats>,
    ) -> Result<Box<dyn InputStream>> {
        let open_error = |reason: String| PipelineError::DeviceOpen {
            device: descriptor.name.clone(),
            reason,
        };
        let unsupported = |reason: String| PipelineError::UnsupportedConfiguration {
            device: descriptor.name.clone(),
            sample_rate: settings.sample_rate,
            chunk_size: settings.chunk_size,
            reason,
        };

        let device = self
            .named_input_devices()?
            .into_iter()
            .nth(descriptor.id)
            .filter(|(_, name)| *name == descriptor.name)
            .map(|(device, _)| device)
            .ok_or_else(|| open_error("device is no longer available".to_string()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| open_error(e.to_string()))?
            .filter(|range| {
                range.channels() > 0
                    && (range.min_sample_rate().0..=range.max_sample_rate().0)
                        .contains(&settings.sample_rate)
            })
            .min_by_key(|range| (!fits_buffer(range.buffer_size(), settings.chunk_size), range.channels()))
            .ok_or_else(|| unsupported("no input configuration at this sample rate".to_string()))?
            .with_sample_rate(cpal::SampleRate(settings.sample_rate));

        let buffer_size = if fits_buffer(supported.buffer_size(), settings.chunk_size) {
            cpal::BufferSize::Fixed(settings.chunk_size as u32)
        } else {
            cpal::BufferSize::Default
        };
        let sample_format = supported.sample_format();
        let config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size,
        };

        tracing::debug!(
            "Stream configuration: {}Hz, {} channel(s), {:?}, buffer {:?}",
            config.sample_rate.0,
            config.channels,
            sample_format,
            config.buffer_size
        );

        let chunk_size = settings.chunk_size;
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, chunk_size, sink, stats),
            SampleFormat::F64 => build_stream::<f64>(&device, &config, chunk_size, sink, stats),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, chunk_size, sink, stats),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, chunk_size, sink, stats),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, chunk_size, sink, stats),
            SampleFormat::I8 => build_stream::<i8>(&device, &config, chunk_size, sink, stats),
            SampleFormat::U8 => build_stream::<u8>(&device, &config, chunk_size, sink, stats),
            other => return Err(unsupported(format!("unsupported sample format {other:?}"))),
        }
        .map_err(|e| match e {
            cpal::BuildStreamError::StreamConfigNotSupported => unsupported(e.to_string()),
            _ => open_error(e.to_string()),
        })?;

        stream.play().map_err(|e| open_error(e.to_string()))?;

        Ok(Box::new(CpalInputStream { stream }))
    }
}

struct CpalInputStream {
    stream: cpal::Stream,
}

impl InputStream for CpalInputStream {
    fn stop(&mut self) -> anyhow::Result<()> {
        self.stream
            .pause()
            .map_err(|e| anyhow!("Failed to pause input stream: {e}"))
    }
}

/// Builds an input stream that converts samples of type `T` to `f32`.
///
/// The data callback hands each buffer to [`on_input`]; when the host restarts
/// its clock after an xrun, the stream origin moves to the restart. The error
/// callback runs outside the data path and may log.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    chunk_size: usize,
    mut sink: ChunkSink,
    stats: Arc<CaptureStats>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let mut assembler = ChunkAssembler::new(chunk_size);
    let mut gaps = GapDetector::new(config.sample_rate.0);
    let mut origin: Option<cpal::StreamInstant> = None;

    device.build_input_stream(
        config,
        move |data: &[T], info: &cpal::InputCallbackInfo| {
            let capture = info.timestamp().capture;
            let start = *origin.get_or_insert(capture);
            let first_channel = data.iter().step_by(channels).map(|&s| f32::from_sample(s));

            let continuity = on_input(
                &mut gaps,
                &mut assembler,
                &stats,
                capture.duration_since(&start),
                data.len() / channels,
                first_channel,
                &mut *sink,
            );
            if continuity == Continuity::Restarted {
                origin = Some(capture);
            }
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    )
}

fn fits_buffer(buffer_size: &cpal::SupportedBufferSize, chunk_size: usize) -> bool {
    match buffer_size {
        cpal::SupportedBufferSize::Range { min, max } => {
            u32::try_from(chunk_size).is_ok_and(|frames| (*min..=*max).contains(&frames))
        }
        cpal::SupportedBufferSize::Unknown => false,
    }
}

fn input_configs(device: &cpal::Device) -> Vec<InputConfigRange> {
    match device.supported_input_configs() {
        Ok(configs) => configs
            .map(|range| InputConfigRange {
                channels: range.channels(),
                min_sample_rate: range.min_sample_rate().0,
                max_sample_rate: range.max_sample_rate().0,
                buffer_size: match range.buffer_size() {
                    cpal::SupportedBufferSize::Range { min, max } => Some((*min, *max)),
                    cpal::SupportedBufferSize::Unknown => None,
                },
            })
            .collect(),
        Err(e) => {
            tracing::debug!("Could not query input configurations: {}", e);
            Vec::new()
        }
    }
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let Ok(dev_null) = OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };

    let saved_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved_stderr == -1 {
        return f();
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(saved_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(saved_stderr, libc::STDERR_FILENO);
        libc::close(saved_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
