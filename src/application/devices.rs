//! Device discovery across protocol clients

use std::time::Duration;

use crate::domain::device::DeviceDescriptor;

use super::ports::{CastError, Caster};

/// Discover devices across every given protocol client.
///
/// An empty result is success - no devices on the network is a normal
/// outcome, not a failure. A discovery transport failure is an error.
pub async fn collect_devices(
    casters: &[Box<dyn Caster>],
    timeout: Duration,
) -> Result<Vec<DeviceDescriptor>, CastError> {
    let mut devices = Vec::new();
    for caster in casters {
        devices.extend(caster.discover(timeout).await?);
    }
    Ok(devices)
}
