//! Fixed-size sample chunks and the assembler that cuts them out of
//! arbitrarily sized device buffers.

/// A fixed-length run of consecutive mono samples in the normalized
/// `[-1.0, 1.0]` range, tagged with its position in the capture stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Strictly increasing across a run; gaps mark lost chunks.
    pub sequence: u64,
    pub samples: Vec<f32>,
}

impl AudioChunk {
    /// Creates an all-zero chunk with sequence 0.
    pub fn silent(len: usize) -> Self {
        Self {
            sequence: 0,
            samples: vec![0.0; len],
        }
    }

    /// Copies `other` into this chunk, reusing the existing sample allocation.
    pub fn copy_from(&mut self, other: &AudioChunk) {
        self.sequence = other.sequence;
        self.samples.clone_from(&other.samples);
    }
}

/// Collects samples from capture callbacks into chunks of exactly
/// `chunk_size` samples.
///
/// The chunk buffer is allocated once; assembling and delivering never
/// allocates, so this is safe to drive from the audio callback.
pub struct ChunkAssembler {
    chunk: AudioChunk,
    filled: usize,
    next_sequence: u64,
}

impl ChunkAssembler {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk: AudioChunk::silent(chunk_size.max(1)),
            filled: 0,
            next_sequence: 0,
        }
    }

    /// Appends samples, calling `deliver` once for every chunk completed.
    ///
    /// Returns the number of chunks delivered.
    pub fn push<I, F>(&mut self, samples: I, mut deliver: F) -> usize
    where
        I: IntoIterator<Item = f32>,
        F: FnMut(&AudioChunk),
    {
        let mut delivered = 0;
        for sample in samples {
            self.chunk.samples[self.filled] = sample;
            self.filled += 1;

            if self.filled == self.chunk.samples.len() {
                self.chunk.sequence = self.next_sequence;
                deliver(&self.chunk);
                self.next_sequence += 1;
                self.filled = 0;
                delivered += 1;
            }
        }
        delivered
    }

    /// Records a discontinuity of `lost_frames` samples reported by the device.
    ///
    /// The partially assembled chunk is discarded and the sequence counter skips
    /// every chunk the lost samples would have completed (at least one), so the
    /// gap stays visible downstream. Returns the number of chunks skipped.
    pub fn discontinuity(&mut self, lost_frames: u64) -> u64 {
        let chunk_size = self.chunk.samples.len() as u64;
        let missing = self.filled as u64 + lost_frames;
        let skipped = missing.div_ceil(chunk_size).max(1);

        self.next_sequence += skipped;
        self.filled = 0;
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(assembler: &mut ChunkAssembler, samples: &[f32]) -> Vec<AudioChunk> {
        let mut out = Vec::new();
        assembler.push(samples.iter().copied(), |chunk| out.push(chunk.clone()));
        out
    }

    #[test]
    fn test_chunks_are_cut_across_callback_boundaries() {
        let mut assembler = ChunkAssembler::new(4);

        assert!(collect(&mut assembler, &[0.1, 0.2, 0.3]).is_empty());
        let chunks = collect(&mut assembler, &[0.4, 0.5, 0.6, 0.7, 0.8, 0.9]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(chunks[1].samples, vec![0.5, 0.6, 0.7, 0.8]);
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[1].sequence, 1);
    }

    #[test]
    fn test_every_chunk_has_the_configured_length() {
        let mut assembler = ChunkAssembler::new(1024);
        let samples = vec![0.25; 1024 * 3 + 17];
        let chunks = collect(&mut assembler, &samples);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.samples.len() == 1024));
    }

    #[test]
    fn test_discontinuity_drops_partial_chunk_and_skips_sequence() {
        let mut assembler = ChunkAssembler::new(4);
        collect(&mut assembler, &[1.0; 6]);

        // 2 buffered + 9 lost = 11 samples, three chunks never completed
        assert_eq!(assembler.discontinuity(9), 3);

        let chunks = collect(&mut assembler, &[0.5; 4]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sequence, 4);
        assert_eq!(chunks[0].samples, vec![0.5; 4]);
    }

    #[test]
    fn test_small_discontinuity_still_makes_gap_visible() {
        let mut assembler = ChunkAssembler::new(8);
        assert_eq!(assembler.discontinuity(1), 1);

        let chunks = collect(&mut assembler, &[0.0; 8]);
        assert_eq!(chunks[0].sequence, 1);
    }

    #[test]
    fn test_copy_from_keeps_buffer() {
        let mut target = AudioChunk::silent(3);
        let ptr = target.samples.as_ptr();
        let source = AudioChunk {
            sequence: 9,
            samples: vec![0.1, 0.2, 0.3],
        };

        target.copy_from(&source);

        assert_eq!(target, source);
        assert_eq!(target.samples.as_ptr(), ptr);
    }
}
