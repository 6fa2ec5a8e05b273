//! Frame rendering for the waveform display.
//!
//! The [`Renderer`] turns the latest published frame state into draw calls on a
//! [`Canvas`]; the window module provides the macroquad canvas and the loop
//! that presents a frame per display refresh.

pub mod waveform;
pub mod window;

pub use waveform::{waveform_points, Point};
pub use window::MacroquadSurface;

use crate::pipeline::{RenderFrameState, Rgb};

/// A surface the renderer draws on.
pub trait Canvas {
    /// Current drawable size in pixels.
    fn size(&self) -> (f32, f32);

    /// Fills the whole surface with `color`.
    fn clear(&mut self, color: Rgb);

    /// Draws connected line segments through `points`.
    fn polyline(&mut self, points: &[Point], thickness: f32, color: Rgb);
}

/// Static drawing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub background: Rgb,
    pub line_thickness: f32,
}

/// Counters for the shutdown summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_drawn: u64,
    /// Frames drawn before the first chunk arrived
    pub empty_frames: u64,
    /// Chunks that were superseded before any frame showed them
    pub chunks_skipped: u64,
}

/// Draws one frame per display tick.
pub struct Renderer {
    style: RenderStyle,
    points: Vec<Point>,
    last_sequence: Option<u64>,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(style: RenderStyle) -> Self {
        Self {
            style,
            points: Vec::new(),
            last_sequence: None,
            stats: RenderStats::default(),
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Redraws the full frame from `frame`.
    ///
    /// The background is always cleared first so no trail of earlier frames
    /// remains. Without a frame state only the background is drawn.
    pub fn draw_frame<C: Canvas + ?Sized>(&mut self, canvas: &mut C, frame: Option<&RenderFrameState>) {
        canvas.clear(self.style.background);
        self.stats.frames_drawn += 1;

        let Some(state) = frame else {
            self.stats.empty_frames += 1;
            return;
        };

        let sequence = state.chunk.sequence;
        match self.last_sequence {
            Some(last) if sequence > last => self.stats.chunks_skipped += sequence - last - 1,
            Some(_) => {}
            None => self.stats.chunks_skipped += sequence,
        }
        self.last_sequence = Some(sequence);

        let (width, height) = canvas.size();
        waveform_points(&state.chunk.samples, width, height, &mut self.points);
        if self.points.len() >= 2 {
            canvas.polyline(&self.points, self.style.line_thickness, state.color);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::AudioChunk;
    use crate::pipeline::intensity::IntensityLevel;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum DrawCall {
        Clear(Rgb),
        Polyline {
            points: usize,
            thickness: f32,
            color: Rgb,
        },
    }

    /// Canvas that records draw calls instead of drawing.
    pub(crate) struct RecordingCanvas {
        pub size: (f32, f32),
        pub calls: Vec<DrawCall>,
        pub last_points: Vec<Point>,
    }

    impl RecordingCanvas {
        pub(crate) fn new(width: f32, height: f32) -> Self {
            Self {
                size: (width, height),
                calls: Vec::new(),
                last_points: Vec::new(),
            }
        }
    }

    impl Canvas for RecordingCanvas {
        fn size(&self) -> (f32, f32) {
            self.size
        }

        fn clear(&mut self, color: Rgb) {
            self.calls.push(DrawCall::Clear(color));
        }

        fn polyline(&mut self, points: &[Point], thickness: f32, color: Rgb) {
            self.last_points = points.to_vec();
            self.calls.push(DrawCall::Polyline {
                points: points.len(),
                thickness,
                color,
            });
        }
    }

    fn state(sequence: u64, samples: Vec<f32>, color: Rgb) -> RenderFrameState {
        RenderFrameState {
            chunk: AudioChunk { sequence, samples },
            level: IntensityLevel(-10.0),
            color,
        }
    }

    fn style() -> RenderStyle {
        RenderStyle {
            background: Rgb(10, 20, 30),
            line_thickness: 3.0,
        }
    }

    #[test]
    fn test_first_tick_without_data_draws_background_only() {
        let mut renderer = Renderer::new(style());
        let mut canvas = RecordingCanvas::new(1000.0, 500.0);

        renderer.draw_frame(&mut canvas, None);

        assert_eq!(canvas.calls, vec![DrawCall::Clear(Rgb(10, 20, 30))]);
        assert_eq!(renderer.stats().empty_frames, 1);
    }

    #[test]
    fn test_frame_clears_then_draws_waveform_in_state_color() {
        let mut renderer = Renderer::new(style());
        let mut canvas = RecordingCanvas::new(1000.0, 500.0);
        let frame = state(0, vec![0.0; 1024], Rgb::ORANGE);

        renderer.draw_frame(&mut canvas, Some(&frame));

        assert_eq!(
            canvas.calls,
            vec![
                DrawCall::Clear(Rgb(10, 20, 30)),
                DrawCall::Polyline {
                    points: 1024,
                    thickness: 3.0,
                    color: Rgb::ORANGE
                }
            ]
        );
    }

    #[test]
    fn test_every_tick_redraws_full_frame() {
        let mut renderer = Renderer::new(style());
        let mut canvas = RecordingCanvas::new(100.0, 100.0);
        let frame = state(0, vec![0.5; 8], Rgb::RED);

        for _ in 0..3 {
            renderer.draw_frame(&mut canvas, Some(&frame));
        }

        let clears = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Clear(_)))
            .count();
        assert_eq!(clears, 3);
        assert_eq!(renderer.stats().frames_drawn, 3);
        assert_eq!(renderer.stats().chunks_skipped, 0);
    }

    #[test]
    fn test_waveform_scales_to_canvas_size() {
        let mut renderer = Renderer::new(style());
        let mut canvas = RecordingCanvas::new(200.0, 100.0);

        renderer.draw_frame(&mut canvas, Some(&state(0, vec![1.0, -1.0], Rgb::RED)));

        assert_eq!(canvas.last_points, vec![Point { x: 0.0, y: 0.0 }, Point { x: 200.0, y: 100.0 }]);
    }

    #[test]
    fn test_skipped_chunks_are_counted() {
        let mut renderer = Renderer::new(style());
        let mut canvas = RecordingCanvas::new(100.0, 100.0);

        renderer.draw_frame(&mut canvas, Some(&state(0, vec![0.0; 4], Rgb::WHITE)));
        renderer.draw_frame(&mut canvas, Some(&state(3, vec![0.0; 4], Rgb::WHITE)));
        renderer.draw_frame(&mut canvas, Some(&state(4, vec![0.0; 4], Rgb::WHITE)));

        assert_eq!(renderer.stats().chunks_skipped, 2);
    }
}
