//! Interactive device setup use case

use std::time::Duration;

use thiserror::Error;

use crate::domain::config::{AppConfig, DeviceConfig};
use crate::domain::device::DeviceDescriptor;
use crate::domain::error::ConfigError;

use super::devices::collect_devices;
use super::ports::{CastError, Caster, ConfigStore};

/// Errors from the setup use case
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result of a setup run.
#[derive(Debug)]
pub enum SetupOutcome {
    /// A device was selected and persisted.
    Saved(DeviceConfig),
    /// Discovery came back empty; nothing to select.
    NoDevices,
    /// The user aborted the selection.
    Cancelled,
}

/// Discover devices, let the caller pick one, and persist the selection.
///
/// The selector receives the discovered devices and returns an index, or
/// None to abort. The saved device replaces any previous one wholesale;
/// other config fields are preserved.
pub async fn run_setup<S, F>(
    casters: &[Box<dyn Caster>],
    store: &S,
    timeout: Duration,
    select: F,
) -> Result<SetupOutcome, SetupError>
where
    S: ConfigStore,
    F: Fn(&[DeviceDescriptor]) -> Option<usize>,
{
    let devices = collect_devices(casters, timeout).await?;
    if devices.is_empty() {
        return Ok(SetupOutcome::NoDevices);
    }

    let Some(index) = select(&devices) else {
        return Ok(SetupOutcome::Cancelled);
    };
    let Some(descriptor) = devices.get(index) else {
        return Ok(SetupOutcome::Cancelled);
    };

    let device = DeviceConfig::from_descriptor(descriptor);
    let existing = store.load().await.unwrap_or_else(|_| AppConfig::empty());
    let config = AppConfig {
        device: Some(device.clone()),
        ..existing
    };
    store.save(&config).await?;

    Ok(SetupOutcome::Saved(device))
}
