//! Audio acquisition for livewave.
//!
//! Provides input device discovery, the capture source that delivers fixed-size
//! sample chunks from the audio thread, and the cpal backend both run on.

pub mod capture;
pub mod chunk;
pub mod cpal_backend;
pub mod device;

pub use capture::{AudioBackend, CaptureCounts, CaptureHandle, CaptureSettings};
pub use chunk::AudioChunk;
pub use cpal_backend::CpalBackend;
pub use device::{DeviceDescriptor, DeviceDirectory};
