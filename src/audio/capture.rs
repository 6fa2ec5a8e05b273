//! Capture source: opens an input stream and hands fixed-size chunks to a sink
//! on the audio subsystem's own schedule.

use super::chunk::{AudioChunk, ChunkAssembler};
use super::device::DeviceDescriptor;
use crate::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sample rate and chunk length requested for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Samples per second (Hz)
    pub sample_rate: u32,
    /// Samples per delivered chunk
    pub chunk_size: usize,
}

impl CaptureSettings {
    /// Approximate number of chunk deliveries per second.
    pub fn chunk_rate(&self) -> f32 {
        self.sample_rate as f32 / self.chunk_size as f32
    }
}

/// Receives every assembled chunk, on the capture thread.
pub type ChunkSink = Box<dyn FnMut(&AudioChunk) + Send + 'static>;

/// Counters written by the capture thread.
#[derive(Debug, Default)]
pub struct CaptureStats {
    delivered: AtomicU64,
    overruns: AtomicU64,
    chunks_lost: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureCounts {
    pub delivered: u64,
    pub overruns: u64,
    pub chunks_lost: u64,
}

impl CaptureStats {
    pub fn record_delivery(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overrun(&self, chunks_lost: u64) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
        self.chunks_lost.fetch_add(chunks_lost, Ordering::Relaxed);
    }

    pub fn counts(&self) -> CaptureCounts {
        CaptureCounts {
            delivered: self.delivered.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            chunks_lost: self.chunks_lost.load(Ordering::Relaxed),
        }
    }
}

/// A running input stream. Dropping it must stop all callbacks.
pub trait InputStream {
    /// Stops delivering callbacks. No callback may fire after this returns.
    fn stop(&mut self) -> anyhow::Result<()>;
}

/// The audio subsystem the capture source is built on.
pub trait AudioBackend {
    /// Enumerates input devices in a stable order.
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Opens and starts an input stream on `device`.
    ///
    /// The stream assembles `settings.chunk_size`-sample chunks, calls `sink`
    /// once per chunk and keeps `stats` up to date.
    fn open_input(
        &self,
        device: &DeviceDescriptor,
        settings: &CaptureSettings,
        sink: ChunkSink,
        stats: Arc<CaptureStats>,
    ) -> Result<Box<dyn InputStream>>;
}

/// Owns a running capture stream.
///
/// The stream is stopped by [`CaptureHandle::close`] or, on any other exit
/// path, when the handle is dropped.
pub struct CaptureHandle {
    stream: Option<Box<dyn InputStream>>,
    stats: Arc<CaptureStats>,
    device_name: String,
}

impl CaptureHandle {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn stats(&self) -> CaptureCounts {
        self.stats.counts()
    }

    /// Stops the stream and returns the final counters.
    pub fn close(mut self) -> CaptureCounts {
        self.shutdown();
        self.stats.counts()
    }

    fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                tracing::warn!("Failed to stop audio stream cleanly: {}", e);
            }
            drop(stream);
            let counts = self.stats.counts();
            tracing::info!(
                "Audio stream stopped: {} chunks delivered, {} overruns ({} chunks lost)",
                counts.delivered,
                counts.overruns,
                counts.chunks_lost
            );
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens a capture stream on `device`, calling `on_chunk` for every chunk.
///
/// `on_chunk` runs on the audio thread and must not block.
///
/// # Errors
/// - `DeviceOpen` if the device is busy, permission is denied or the stream
///   cannot be started
/// - `UnsupportedConfiguration` if the host rejects the stream configuration
pub fn open<B, F>(
    backend: &B,
    device: &DeviceDescriptor,
    settings: CaptureSettings,
    on_chunk: F,
) -> Result<CaptureHandle>
where
    B: AudioBackend + ?Sized,
    F: FnMut(&AudioChunk) + Send + 'static,
{
    let stats = Arc::new(CaptureStats::default());
    let stream = backend.open_input(device, &settings, Box::new(on_chunk), Arc::clone(&stats))?;

    tracing::info!(
        "Audio stream started on '{}' ({}Hz, {} samples/chunk, ~{:.1} chunks/s)",
        device.name,
        settings.sample_rate,
        settings.chunk_size,
        settings.chunk_rate()
    );

    Ok(CaptureHandle {
        stream: Some(stream),
        stats,
        device_name: device.name.clone(),
    })
}

/// What a callback's capture timestamp says about the samples before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// The callback follows the previous one.
    Contiguous,
    /// This many frames were dropped by the host before the callback.
    Lost(u64),
    /// The timestamps went backwards: the host restarted the stream after an
    /// overrun. How much was lost is unknown.
    Restarted,
}

/// Detects dropped input from callback capture timestamps.
///
/// Each callback reports when its first frame was captured; if that lies
/// further ahead than the frames already seen account for, the difference was
/// lost by the host. A position further back than expected means the host
/// re-based its clock, which ALSA does when it recovers from an xrun.
#[derive(Debug)]
pub struct GapDetector {
    sample_rate: u32,
    expected_frame: Option<u64>,
}

impl GapDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            expected_frame: None,
        }
    }

    /// Observes a callback of `frames` frames captured `elapsed` after the
    /// stream origin. `None` means the capture time lies before the origin.
    ///
    /// Jitter of up to one callback buffer either way is tolerated. After
    /// [`Continuity::Restarted`] the caller must move its origin to this
    /// callback's capture time; tracking resumes from position zero.
    pub fn observe(&mut self, elapsed: Option<Duration>, frames: usize) -> Continuity {
        let frames = frames as u64;
        let tolerance = frames.max(1);

        let Some(elapsed) = elapsed else {
            let was_tracking = self.expected_frame.is_some();
            self.expected_frame = Some(frames);
            return if was_tracking {
                Continuity::Restarted
            } else {
                Continuity::Contiguous
            };
        };
        let position = (elapsed.as_secs_f64() * self.sample_rate as f64).round() as u64;

        let continuity = match self.expected_frame {
            Some(expected) if position > expected + tolerance => Continuity::Lost(position - expected),
            Some(expected) if position + tolerance < expected => Continuity::Restarted,
            _ => Continuity::Contiguous,
        };

        self.expected_frame = Some(match continuity {
            Continuity::Restarted => frames,
            _ => position + frames,
        });
        continuity
    }
}

/// Handles one capture callback: checks continuity, then feeds the samples to
/// the assembler and every completed chunk to `sink`.
///
/// Runs on the audio thread; it only touches atomics and preallocated buffers.
pub fn on_input<I>(
    gaps: &mut GapDetector,
    assembler: &mut ChunkAssembler,
    stats: &CaptureStats,
    elapsed: Option<Duration>,
    frames: usize,
    samples: I,
    sink: &mut dyn FnMut(&AudioChunk),
) -> Continuity
where
    I: IntoIterator<Item = f32>,
{
    let continuity = gaps.observe(elapsed, frames);
    match continuity {
        Continuity::Lost(lost) => stats.record_overrun(assembler.discontinuity(lost)),
        Continuity::Restarted => stats.record_overrun(assembler.discontinuity(0)),
        Continuity::Contiguous => {}
    }

    assembler.push(samples, |chunk| {
        stats.record_delivery();
        sink(chunk);
    });
    continuity
}
