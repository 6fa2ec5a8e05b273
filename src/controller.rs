//! Pipeline setup, run and teardown.
//!
//! The controller resolves the input device, connects the capture callback to
//! the render loop through the transfer channel, and guarantees the capture
//! stream is stopped on every exit path before the render surface goes away.

use crate::audio::{self, AudioBackend, CaptureCounts, CaptureHandle, CaptureSettings, DeviceDescriptor, DeviceDirectory};
use crate::error::Result;
use crate::pipeline::{compute_level, map_to_color, transfer_channel, ColorThresholdTable, FrameReader};
use crate::render::{RenderStats, RenderStyle, Renderer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative termination request shared by the render loop and signal
/// handlers.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Sets the flag on SIGINT and SIGTERM instead of terminating the process.
    pub fn register_signals(&self) -> std::io::Result<()> {
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.0))?;
        }
        Ok(())
    }
}

/// Window geometry and title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Fully resolved configuration the controller runs with.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input device id, `None` for the system default
    pub device: Option<usize>,
    pub capture: CaptureSettings,
    pub window: WindowSettings,
    pub style: RenderStyle,
    pub colors: Arc<ColorThresholdTable>,
}

/// What happened during a run, logged at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub capture: CaptureCounts,
    pub render: RenderStats,
}

impl RunSummary {
    /// Chunks delivered to the render side but replaced by a newer one before
    /// any frame showed them.
    ///
    /// The renderer sees every sequence gap, including the numbers skipped for
    /// chunks lost to overruns; those are counted by the capture side.
    pub fn chunks_superseded(&self) -> u64 {
        self.render
            .chunks_skipped
            .saturating_sub(self.capture.chunks_lost)
    }
}

/// A display the render loop runs on.
pub trait RenderSurface {
    /// Creates the surface and draws frames from `reader` until `stop` is set
    /// or the user closes the window.
    ///
    /// Implementations must close `capture` before releasing the surface, and
    /// must let it drop if the surface cannot be created.
    ///
    /// # Errors
    /// - `RenderInit` if the window or drawing context cannot be created
    fn run(
        self,
        reader: FrameReader,
        renderer: Renderer,
        stop: StopFlag,
        capture: CaptureHandle,
    ) -> Result<RunSummary>;
}

pub struct Controller {
    config: PipelineConfig,
    stop: StopFlag,
}

impl Controller {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stop: StopFlag::new(),
        }
    }

    /// Handle for requesting termination from outside the render loop.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Runs the pipeline until the render loop ends.
    ///
    /// Every setup step fails before the next one starts, so a failed run never
    /// leaves a capture stream or window behind.
    ///
    /// # Errors
    /// - `DeviceQuery`, `DeviceNotFound`, `UnsupportedConfiguration` while
    ///   resolving the device
    /// - `DeviceOpen` if the capture stream cannot be started
    /// - `RenderInit` if the render surface cannot be created
    pub fn run<B, S>(self, backend: &B, surface: S) -> Result<RunSummary>
    where
        B: AudioBackend + ?Sized,
        S: RenderSurface,
    {
        let Controller { config, stop } = self;

        let directory = DeviceDirectory::query(backend)?;
        let device = directory.resolve(config.device, &config.capture)?;
        tracing::info!(
            "Input device resolved: #{} '{}'{}",
            device.id,
            device.name,
            if device.is_default { " (default)" } else { "" }
        );

        tracing::debug!(
            "Color thresholds: {}",
            config
                .colors
                .entries()
                .iter()
                .map(|(db, color)| format!("{db} dB => {color}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let (mut publisher, reader) = transfer_channel(config.capture.chunk_size);
        let colors = Arc::clone(&config.colors);
        let capture = audio::capture::open(backend, device, config.capture, move |chunk| {
            let level = compute_level(&chunk.samples);
            let color = map_to_color(level, &colors);
            publisher.publish(chunk, level, color);
        })?;

        let renderer = Renderer::new(config.style);
        let summary = surface.run(reader, renderer, stop, capture)?;

        tracing::info!(
            "Visualizer stopped: {} frames drawn, {} chunks captured, {} superseded before display, {} lost to overruns",
            summary.render.frames_drawn,
            summary.capture.delivered,
            summary.chunks_superseded(),
            summary.capture.chunks_lost
        );
        Ok(summary)
    }
}

/// Enumerates input devices without opening any stream or window.
///
/// # Errors
/// - `DeviceQuery` if the audio subsystem is unavailable
pub fn list_devices<B: AudioBackend + ?Sized>(backend: &B) -> Result<Vec<DeviceDescriptor>> {
    Ok(DeviceDirectory::query(backend)?.into_devices())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::{CaptureStats, ChunkSink, InputStream};
    use crate::audio::chunk::ChunkAssembler;
    use crate::audio::device::InputConfigRange;
    use crate::audio::AudioChunk;
    use crate::config::file::ColorsConfig;
    use crate::error::PipelineError;
    use crate::pipeline::Rgb;
    use crate::render::tests::{DrawCall, RecordingCanvas};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Backend whose streams synchronously feed a fixed signal when opened.
    #[derive(Default)]
    struct FakeBackend {
        devices: Vec<DeviceDescriptor>,
        fail_query: bool,
        fail_open: bool,
        signal: Vec<f32>,
        opened: AtomicUsize,
        stopped: Arc<AtomicUsize>,
        sinks: Mutex<Vec<ChunkSink>>,
    }

    impl FakeBackend {
        fn with_devices(count: usize) -> Self {
            let devices = (0..count)
                .map(|id| DeviceDescriptor {
                    id,
                    name: format!("Fake Input {id}"),
                    is_default: id == 0,
                    input_configs: vec![InputConfigRange {
                        channels: 1,
                        min_sample_rate: 8000,
                        max_sample_rate: 96000,
                        buffer_size: None,
                    }],
                })
                .collect();
            Self {
                devices,
                ..Self::default()
            }
        }

        fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }
    }

    struct FakeStream {
        stopped: Arc<AtomicUsize>,
    }

    impl InputStream for FakeStream {
        fn stop(&mut self) -> anyhow::Result<()> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl AudioBackend for FakeBackend {
        fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
            if self.fail_query {
                return Err(PipelineError::DeviceQuery("no audio host".into()));
            }
            Ok(self.devices.clone())
        }

        fn open_input(
            &self,
            device: &DeviceDescriptor,
            settings: &CaptureSettings,
            mut sink: ChunkSink,
            stats: Arc<CaptureStats>,
        ) -> Result<Box<dyn InputStream>> {
            if self.fail_open {
                return Err(PipelineError::DeviceOpen {
                    device: device.name.clone(),
                    reason: "device busy".into(),
                });
            }
            self.opened.fetch_add(1, Ordering::SeqCst);

            let mut assembler = ChunkAssembler::new(settings.chunk_size);
            assembler.push(self.signal.iter().copied(), |chunk| {
                stats.record_delivery();
                sink(chunk);
            });
            self.sinks.lock().unwrap().push(sink);

            Ok(Box::new(FakeStream {
                stopped: Arc::clone(&self.stopped),
            }))
        }
    }

    /// Surface that draws a single frame into a recording canvas.
    struct FakeSurface {
        canvas: Arc<Mutex<RecordingCanvas>>,
        fail_init: bool,
    }

    impl FakeSurface {
        fn new() -> (Self, Arc<Mutex<RecordingCanvas>>) {
            let canvas = Arc::new(Mutex::new(RecordingCanvas::new(1000.0, 500.0)));
            let surface = Self {
                canvas: Arc::clone(&canvas),
                fail_init: false,
            };
            (surface, canvas)
        }
    }

    impl RenderSurface for FakeSurface {
        fn run(
            self,
            mut reader: FrameReader,
            mut renderer: Renderer,
            stop: StopFlag,
            capture: CaptureHandle,
        ) -> Result<RunSummary> {
            if self.fail_init {
                return Err(PipelineError::RenderInit("no display".into()));
            }
            let mut canvas = self.canvas.lock().unwrap();
            while !stop.is_stop_requested() {
                renderer.draw_frame(&mut *canvas, reader.snapshot());
                stop.request_stop();
            }
            Ok(RunSummary {
                capture: capture.close(),
                render: renderer.stats(),
            })
        }
    }

    fn config(device: Option<usize>) -> PipelineConfig {
        PipelineConfig {
            device,
            capture: CaptureSettings {
                sample_rate: 44100,
                chunk_size: 1024,
            },
            window: WindowSettings {
                title: "test".into(),
                width: 1000,
                height: 500,
            },
            style: RenderStyle {
                background: Rgb::BLACK,
                line_thickness: 2.0,
            },
            colors: Arc::new(ColorsConfig::default().to_table().unwrap()),
        }
    }

    fn polyline_color(canvas: &RecordingCanvas) -> Option<Rgb> {
        canvas.calls.iter().find_map(|call| match call {
            DrawCall::Polyline { color, .. } => Some(*color),
            _ => None,
        })
    }

    #[test]
    fn test_full_scale_signal_renders_in_top_color() {
        let backend = FakeBackend {
            signal: vec![1.0; 1024],
            ..FakeBackend::with_devices(3)
        };
        let (surface, canvas) = FakeSurface::new();

        let summary = Controller::new(config(None)).run(&backend, surface).unwrap();

        assert_eq!(polyline_color(&canvas.lock().unwrap()), Some(Rgb::RED));
        assert_eq!(summary.capture.delivered, 1);
        assert_eq!(summary.render.frames_drawn, 1);
        assert_eq!(backend.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_silence_renders_in_lowest_color() {
        let backend = FakeBackend {
            signal: vec![0.0; 2048],
            ..FakeBackend::with_devices(1)
        };
        let (surface, canvas) = FakeSurface::new();

        let summary = Controller::new(config(Some(0))).run(&backend, surface).unwrap();

        assert_eq!(polyline_color(&canvas.lock().unwrap()), Some(Rgb::WHITE));
        // the first of the two chunks was superseded before the frame
        assert_eq!(summary.render.chunks_skipped, 1);
    }

    #[test]
    fn test_no_data_yet_draws_background() {
        let backend = FakeBackend::with_devices(1);
        let (surface, canvas) = FakeSurface::new();

        Controller::new(config(None)).run(&backend, surface).unwrap();

        assert_eq!(canvas.lock().unwrap().calls, vec![DrawCall::Clear(Rgb::BLACK)]);
    }

    #[test]
    fn test_unknown_device_id_aborts_before_capture() {
        let backend = FakeBackend::with_devices(3);
        let (surface, canvas) = FakeSurface::new();

        let err = Controller::new(config(Some(5))).run(&backend, surface).unwrap_err();

        assert_eq!(
            err,
            PipelineError::DeviceNotFound {
                id: Some(5),
                available: 3
            }
        );
        assert_eq!(backend.opened(), 0);
        assert!(canvas.lock().unwrap().calls.is_empty());
    }

    #[test]
    fn test_query_failure_is_reported() {
        let backend = FakeBackend {
            fail_query: true,
            ..FakeBackend::with_devices(1)
        };
        let (surface, _) = FakeSurface::new();

        let err = Controller::new(config(None)).run(&backend, surface).unwrap_err();
        assert!(matches!(err, PipelineError::DeviceQuery(_)));
    }

    #[test]
    fn test_open_failure_never_starts_render_loop() {
        let backend = FakeBackend {
            fail_open: true,
            ..FakeBackend::with_devices(1)
        };
        let (surface, canvas) = FakeSurface::new();

        let err = Controller::new(config(None)).run(&backend, surface).unwrap_err();

        assert!(matches!(err, PipelineError::DeviceOpen { .. }));
        assert!(canvas.lock().unwrap().calls.is_empty());
    }

    #[test]
    fn test_render_init_failure_still_stops_capture() {
        let backend = FakeBackend::with_devices(1);
        let (mut surface, _) = FakeSurface::new();
        surface.fail_init = true;

        let err = Controller::new(config(None)).run(&backend, surface).unwrap_err();

        assert!(matches!(err, PipelineError::RenderInit(_)));
        assert_eq!(backend.opened(), 1);
        assert_eq!(backend.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_list_devices_never_opens_capture() {
        let backend = FakeBackend::with_devices(3);

        let devices = list_devices(&backend).unwrap();

        assert_eq!(devices.len(), 3);
        assert_eq!(devices[2].name, "Fake Input 2");
        assert_eq!(backend.opened(), 0);
    }

    #[test]
    fn test_overrun_losses_are_not_counted_as_superseded() {
        let summary = RunSummary {
            capture: CaptureCounts {
                delivered: 10,
                overruns: 1,
                chunks_lost: 3,
            },
            render: RenderStats {
                frames_drawn: 8,
                empty_frames: 0,
                // 3 lost + 2 replaced before a frame showed them
                chunks_skipped: 5,
            },
        };
        assert_eq!(summary.chunks_superseded(), 2);

        let no_gaps_seen = RunSummary {
            render: RenderStats::default(),
            ..summary
        };
        assert_eq!(no_gaps_seen.chunks_superseded(), 0);
    }

    #[test]
    fn test_stop_flag_is_shared() {
        let controller = Controller::new(config(None));
        let flag = controller.stop_flag();
        flag.request_stop();
        assert!(controller.stop.is_stop_requested());
    }

    #[test]
    fn test_chunk_sink_receives_fixed_size_chunks() {
        let backend = FakeBackend {
            signal: vec![0.25; 3000],
            ..FakeBackend::with_devices(1)
        };
        let device = backend.devices[0].clone();
        let received = Arc::new(Mutex::new(Vec::<AudioChunk>::new()));
        let sink = Arc::clone(&received);

        let handle = audio::capture::open(
            &backend,
            &device,
            CaptureSettings {
                sample_rate: 44100,
                chunk_size: 1024,
            },
            move |chunk| sink.lock().unwrap().push(chunk.clone()),
        )
        .unwrap();
        let counts = handle.close();

        let chunks = received.lock().unwrap();
        assert_eq!(counts.delivered, 2);
        assert_eq!(chunks.iter().map(|c| c.sequence).collect::<Vec<_>>(), vec![0, 1]);
        assert!(chunks.iter().all(|c| c.samples.len() == 1024));
    }
}
