//! The shared half of the pipeline: what the capture thread computes for each
//! chunk and how it reaches the render loop.

pub mod intensity;
pub mod transfer;

pub use intensity::{compute_level, map_to_color, ColorThresholdTable, Rgb};
pub use transfer::{transfer_channel, FrameReader, RenderFrameState};
