//! Error kinds for the capture/render pipeline.
//!
//! Every variant is a setup failure: they are raised before the capture stream
//! or the render loop starts and abort the run. Sample loss while running is
//! counted by the capture source, never raised.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while building the capture/render pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// The audio subsystem could not be queried for input devices
    #[error("Failed to enumerate audio input devices: {0}")]
    DeviceQuery(String),

    /// The requested device id does not exist
    #[error("Audio input device {} not found ({available} device(s) available)", display_id(.id))]
    DeviceNotFound { id: Option<usize>, available: usize },

    /// The device cannot capture with the requested settings
    #[error(
        "Device '{device}' does not support {sample_rate}Hz capture with {chunk_size}-sample chunks: {reason}"
    )]
    UnsupportedConfiguration {
        device: String,
        sample_rate: u32,
        chunk_size: usize,
        reason: String,
    },

    /// The input stream could not be opened or started
    #[error("Failed to open audio input on '{device}': {reason}")]
    DeviceOpen { device: String, reason: String },

    /// The window or render surface could not be created
    #[error("Failed to initialize the render window: {0}")]
    RenderInit(String),

    /// Configuration values are out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn display_id(id: &Option<usize>) -> String {
    match id {
        Some(id) => format!("#{id}"),
        None => "(system default)".to_string(),
    }
}

impl PipelineError {
    /// Troubleshooting guidance printed after the diagnostic.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DeviceQuery(_) => {
                Some("Check that an audio server (PipeWire, PulseAudio, CoreAudio, WASAPI) is running.")
            }
            Self::DeviceNotFound { .. } => {
                Some("Run 'livewave list-devices' to see available device IDs, or use --select-device.")
            }
            Self::UnsupportedConfiguration { .. } => Some(
                "Try the device's native sample rate (see 'livewave list-devices') or a different chunk size.",
            ),
            Self::DeviceOpen { .. } => Some(
                "Is another application using the audio device? Make sure this program has permission to access the microphone.",
            ),
            Self::RenderInit(_) => Some("Make sure a graphical display is available (DISPLAY / WAYLAND_DISPLAY)."),
            Self::InvalidConfig(_) => Some("Check ~/.config/livewave/livewave.toml."),
        }
    }
}
