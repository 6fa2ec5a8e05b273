//! Interactive input device selection.

use crate::audio::{CaptureSettings, DeviceDescriptor};
use crate::commands::list_devices::describe_configs;
use cliclack::{intro, log, outro, select};
use console::style;

/// Prompts the user to pick one of `devices`.
///
/// Returns the chosen device id, or `None` (system default) if the chosen
/// device cannot capture with `settings`.
///
/// # Errors
/// - If there are no devices to choose from
/// - If the prompt is cancelled
pub fn prompt_for_device(
    devices: &[DeviceDescriptor],
    settings: &CaptureSettings,
) -> anyhow::Result<Option<usize>> {
    if devices.is_empty() {
        return Err(anyhow::anyhow!("No audio input devices found on this system."));
    }

    intro(style(" select input device ").on_white().black())?;

    let mut select_prompt = select("Select the input device to visualize:");
    for device in devices {
        let label = if device.is_default {
            format!("{} [DEFAULT]", device.name)
        } else {
            device.name.clone()
        };
        select_prompt = select_prompt.item(device.id, label, describe_configs(device));
    }
    if let Some(default) = devices.iter().find(|d| d.is_default) {
        select_prompt = select_prompt.initial_value(default.id);
    }

    let selected: usize = select_prompt
        .interact()
        .map_err(|e| anyhow::anyhow!("Selection cancelled: {e}"))?;

    let Some(device) = devices.iter().find(|d| d.id == selected) else {
        return Ok(None);
    };

    match device.supports(settings) {
        Ok(()) => {
            outro(format!("Using '{}'", device.name))?;
            tracing::info!("Device selected interactively: #{} '{}'", device.id, device.name);
            Ok(Some(device.id))
        }
        Err(reason) => {
            log::warning(format!("'{}' cannot be used: {reason}", device.name))?;
            outro("Using the default device instead.")?;
            tracing::warn!(
                "Selected device #{} '{}' rejected ({}), falling back to default",
                device.id,
                device.name,
                reason
            );
            Ok(None)
        }
    }
}
