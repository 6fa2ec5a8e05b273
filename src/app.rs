//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::config::{ConfigOverrides, DeviceSelection};
use crate::logging;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// Live audio waveform visualizer
#[derive(Parser)]
#[command(name = "livewave")]
#[command(version)]
#[command(about = "Live audio waveform visualizer with level-based coloring")]
#[command(long_about = "Live audio waveform visualizer with level-based coloring.\n\nCaptures audio from an input device and draws the most recent chunk as a\nwaveform. The line color follows the chunk's loudness in dBFS.\n\nDEFAULT COMMAND:\n    If no command is specified, 'run' is used by default.\n    Run options (-d, --sample-rate, ...) can be used without saying 'run'.\n\nEXAMPLES:\n    # Visualize the default input device\n    $ livewave\n\n    # Visualize device #2 at 48kHz\n    $ livewave -d 2 --sample-rate 48000\n\n    # Pick the device from a list\n    $ livewave --select-device\n\n    # Show available devices\n    $ livewave list-devices")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/livewave/livewave.toml\n    Logs:               ~/.local/state/livewave/livewave.log.*"
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the visualizer; they override the config file.
#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Input device ID (see `livewave list-devices`)
    #[arg(short, long, value_name = "ID")]
    device: Option<usize>,

    /// Choose the input device interactively before starting
    #[arg(long, conflicts_with = "device")]
    select_device: bool,

    /// Capture sample rate in Hz
    #[arg(long, value_name = "HZ")]
    sample_rate: Option<u32>,

    /// Samples per visualized chunk
    #[arg(long, value_name = "N")]
    chunk_size: Option<usize>,

    /// Window width in pixels
    #[arg(long, value_name = "PX")]
    width: Option<u32>,

    /// Window height in pixels
    #[arg(long, value_name = "PX")]
    height: Option<u32>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            device: self.device.map(DeviceSelection::Id),
            sample_rate: self.sample_rate,
            chunk_size: self.chunk_size,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Open the waveform window (default)
    ///
    /// Close the window, press Escape or send Ctrl+C to stop.
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in livewave.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    /// Useful for troubleshooting issues.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   livewave completions bash > livewave.bash
    ///   livewave completions zsh > _livewave
    ///   livewave completions fish > livewave.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If the visualizer cannot be set up (device, configuration, window)
pub fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that don't need logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "livewave", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return commands::handle_list_devices();
        }
        Some(Commands::Logs) => {
            return commands::handle_logs();
        }
        _ => {}
    }

    logging::init_logging()?;

    let args = match cli.command {
        Some(Commands::Run(args)) => args,
        None => cli.run,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    };

    if let Err(e) = commands::handle_visualize(args.overrides(), args.select_device) {
        // cliclack already displayed the cancellation
        let err_msg = e.to_string();
        if args.select_device && (err_msg.contains("cancelled") || err_msg.contains("interrupted"))
        {
            tracing::info!("Device selection cancelled");
            process::exit(0);
        }
        tracing::error!("{e}");
        return Err(e);
    }

    Ok(())
}
