mod app;
mod audio;
mod commands;
mod config;
mod controller;
mod error;
mod logging;
mod pipeline;
mod render;

use error::PipelineError;
use std::process;

fn main() {
    if let Err(e) = app::run() {
        eprintln!("Error: {e}");
        if let Some(hint) = e.downcast_ref::<PipelineError>().and_then(PipelineError::hint) {
            eprintln!();
            eprintln!("{hint}");
        }
        process::exit(1);
    }
}
