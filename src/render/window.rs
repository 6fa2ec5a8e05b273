//! Macroquad window surface.
//!
//! Runs the render loop on the display's refresh schedule: one snapshot, one
//! full redraw and one present per frame.

use super::{Canvas, Point, Renderer};
use crate::audio::CaptureHandle;
use crate::controller::{RenderSurface, RunSummary, StopFlag, WindowSettings};
use crate::error::{PipelineError, Result};
use crate::pipeline::{FrameReader, Rgb};
use macroquad::color::Color;
use macroquad::input::{is_key_pressed, is_quit_requested, prevent_quit, KeyCode};
use macroquad::shapes::draw_line;
use macroquad::window::{clear_background, next_frame, screen_height, screen_width, Conf};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

fn to_color(rgb: Rgb) -> Color {
    Color::from_rgba(rgb.0, rgb.1, rgb.2, 255)
}

/// Draws straight onto the current macroquad frame.
pub struct MacroquadCanvas;

impl Canvas for MacroquadCanvas {
    fn size(&self) -> (f32, f32) {
        (screen_width(), screen_height())
    }

    fn clear(&mut self, color: Rgb) {
        clear_background(to_color(color));
    }

    fn polyline(&mut self, points: &[Point], thickness: f32, color: Rgb) {
        let color = to_color(color);
        for segment in points.windows(2) {
            draw_line(segment[0].x, segment[0].y, segment[1].x, segment[1].y, thickness, color);
        }
    }
}

/// A single macroquad window.
pub struct MacroquadSurface {
    settings: WindowSettings,
}

impl MacroquadSurface {
    pub fn new(settings: WindowSettings) -> Self {
        Self { settings }
    }

    fn conf(&self) -> Conf {
        Conf {
            window_title: self.settings.title.clone(),
            window_width: self.settings.width as i32,
            window_height: self.settings.height as i32,
            high_dpi: false,
            ..Default::default()
        }
    }
}

impl RenderSurface for MacroquadSurface {
    fn run(
        self,
        reader: FrameReader,
        renderer: Renderer,
        stop: StopFlag,
        capture: CaptureHandle,
    ) -> Result<RunSummary> {
        let outcome: Rc<RefCell<Option<RunSummary>>> = Rc::new(RefCell::new(None));
        let conf = self.conf();

        tracing::debug!(
            "Opening window '{}' ({}x{})",
            conf.window_title,
            conf.window_width,
            conf.window_height
        );

        // The loop future owns the capture handle: if window creation panics,
        // unwinding drops the future and with it the stream.
        let slot = Rc::clone(&outcome);
        let launched = run_catching_panics(move || {
            macroquad::Window::from_config(conf, render_loop(reader, renderer, stop, capture, slot));
        });

        if let Err(reason) = launched {
            tracing::error!("Window creation failed: {}", reason);
            return Err(PipelineError::RenderInit(reason));
        }

        let summary = outcome.borrow_mut().take();
        summary.ok_or_else(|| {
            PipelineError::RenderInit("window closed before the render loop started".to_string())
        })
    }
}

/// Runs `f`, turning a panic into its message.
///
/// The default panic hook is swapped out meanwhile so a window system that
/// panics (miniquad does when no display is available) does not print a
/// backtrace notice ahead of the error report.
fn run_catching_panics<F: FnOnce()>(f: F) -> std::result::Result<(), String> {
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(|info| {
        tracing::debug!("Window system panicked: {}", info);
    }));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    panic::set_hook(previous_hook);

    outcome.map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "window system panicked".to_string())
    })
}

async fn render_loop(
    mut reader: FrameReader,
    mut renderer: Renderer,
    stop: StopFlag,
    capture: CaptureHandle,
    outcome: Rc<RefCell<Option<RunSummary>>>,
) {
    prevent_quit();
    let mut canvas = MacroquadCanvas;
    let mut waiting_for_audio = true;
    let mut reported_overruns = 0;
    tracing::debug!("Render loop started for '{}'", capture.device_name());

    loop {
        if stop.is_stop_requested() {
            tracing::info!("Stop requested, leaving render loop");
            break;
        }
        if is_quit_requested() || is_key_pressed(KeyCode::Escape) {
            tracing::info!("Window closed by user");
            stop.request_stop();
            break;
        }

        if waiting_for_audio && reader.has_update() {
            tracing::debug!("First audio chunk received");
            waiting_for_audio = false;
        }

        // the capture thread never logs; report its overruns from here
        let counts = capture.stats();
        if counts.overruns > reported_overruns {
            tracing::warn!(
                "Audio input overrun: {} chunk(s) lost so far",
                counts.chunks_lost
            );
            reported_overruns = counts.overruns;
        }

        renderer.draw_frame(&mut canvas, reader.snapshot());
        next_frame().await;
    }

    let capture = capture.close();
    *outcome.borrow_mut() = Some(RunSummary {
        capture,
        render: renderer.stats(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panics_become_error_messages() {
        assert_eq!(run_catching_panics(|| {}), Ok(()));
        assert_eq!(
            run_catching_panics(|| panic!("XOpenDisplay() failed!")),
            Err("XOpenDisplay() failed!".to_string())
        );
        let display = ":0";
        assert_eq!(
            run_catching_panics(|| panic!("cannot open display {display}")),
            Err("cannot open display :0".to_string())
        );
        assert_eq!(
            run_catching_panics(|| std::panic::panic_any(7u8)),
            Err("window system panicked".to_string())
        );
    }
}
