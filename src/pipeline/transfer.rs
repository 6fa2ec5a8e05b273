//! Latest-value-wins handoff from the capture thread to the render loop.
//!
//! Built on a triple buffer: the publisher always has a private back buffer to
//! write into, the reader always holds a complete front buffer, and swapping
//! is a single atomic exchange. Neither side ever waits for the other, and an
//! unread state is simply replaced by the next one.

use super::intensity::{IntensityLevel, Rgb};
use crate::audio::AudioChunk;
use triple_buffer::TripleBuffer;

/// The latest chunk together with its level and mapped color.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrameState {
    pub chunk: AudioChunk,
    pub level: IntensityLevel,
    pub color: Rgb,
}

#[derive(Debug, Clone)]
struct Slot {
    published: bool,
    state: RenderFrameState,
}

/// Write side, owned by the capture callback.
pub struct FramePublisher {
    input: triple_buffer::Input<Slot>,
}

/// Read side, owned by the render loop.
pub struct FrameReader {
    output: triple_buffer::Output<Slot>,
}

/// Creates the channel for chunks of `chunk_size` samples.
///
/// All three buffers are allocated here; publishing chunks of the same size
/// never allocates afterwards.
pub fn transfer_channel(chunk_size: usize) -> (FramePublisher, FrameReader) {
    let initial = Slot {
        published: false,
        state: RenderFrameState {
            chunk: AudioChunk::silent(chunk_size),
            level: IntensityLevel::FLOOR,
            color: Rgb::BLACK,
        },
    };
    let (input, output) = TripleBuffer::new(&initial).split();
    (FramePublisher { input }, FrameReader { output })
}

impl FramePublisher {
    /// Replaces the current state. Constant time, never blocks.
    pub fn publish(&mut self, chunk: &AudioChunk, level: IntensityLevel, color: Rgb) {
        let slot = self.input.input_buffer_mut();
        slot.published = true;
        slot.state.chunk.copy_from(chunk);
        slot.state.level = level;
        slot.state.color = color;
        self.input.publish();
    }
}

impl FrameReader {
    /// Returns the most recently published state, or `None` before the first
    /// publish.
    ///
    /// The state stays valid and unchanged until the next call, so a tick
    /// without new data sees the previous frame again.
    pub fn snapshot(&mut self) -> Option<&RenderFrameState> {
        let slot = self.output.read();
        slot.published.then_some(&slot.state)
    }

    /// Whether a state was published since the last snapshot.
    pub fn has_update(&self) -> bool {
        self.output.updated()
    }
}
