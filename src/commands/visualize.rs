//! Live waveform visualization.
//!
//! Loads the configuration, resolves the input device, and runs the capture and
//! render pipeline until the window is closed or the process is interrupted.

use crate::audio::{CpalBackend, DeviceDirectory};
use crate::commands::select_device::prompt_for_device;
use crate::config::{ConfigOverrides, DeviceSelection, LivewaveConfig};
use crate::controller::Controller;
use crate::render::MacroquadSurface;

/// Runs the visualizer.
///
/// # Errors
/// - If the configuration cannot be loaded or is invalid
/// - If the device cannot be resolved or opened
/// - If the window cannot be created
pub fn handle_visualize(overrides: ConfigOverrides, select_device: bool) -> anyhow::Result<()> {
    tracing::info!("=== livewave started ===");

    let mut config = LivewaveConfig::load()?;
    config.apply(&overrides);
    let mut pipeline = config.to_pipeline_config()?;

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, chunk_size={}, window={}x{}",
        config.audio.device,
        pipeline.capture.sample_rate,
        pipeline.capture.chunk_size,
        pipeline.window.width,
        pipeline.window.height
    );

    let backend = CpalBackend::new();

    if select_device {
        let directory = DeviceDirectory::query(&backend)?;
        pipeline.device = prompt_for_device(directory.devices(), &pipeline.capture)?;
    }

    let device_label = pipeline
        .device
        .map(DeviceSelection::Id)
        .unwrap_or_default()
        .to_string();
    println!("Starting audio stream from device {device_label}...");
    println!(
        "Sample Rate: {} Hz, Chunk Size: {} frames",
        pipeline.capture.sample_rate, pipeline.capture.chunk_size
    );
    println!("Close the window (or press Escape) to stop.");

    let surface = MacroquadSurface::new(pipeline.window.clone());
    let controller = Controller::new(pipeline);
    controller
        .stop_flag()
        .register_signals()
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    controller.run(&backend, surface)?;

    println!("Audio stream stopped.");
    tracing::info!("=== livewave exited successfully ===");
    Ok(())
}
