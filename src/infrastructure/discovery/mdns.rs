//! mDNS discovery adapter
//!
//! Both supported protocols advertise over mDNS: Cast devices under
//! `_googlecast._tcp` (TXT keys `id`, `fn`, `md`) and AirPlay devices under
//! `_airplay._tcp` (TXT keys `deviceid`, `model`). Browsing is blocking and
//! runs for the full timeout so slow devices get a chance to answer; callers
//! wrap it in `spawn_blocking`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};

use crate::application::ports::CastError;
use crate::domain::device::{DeviceDescriptor, Protocol};

/// mDNS service type per protocol
const fn service_type(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Airplay => "_airplay._tcp.local.",
        Protocol::Googlecast => "_googlecast._tcp.local.",
    }
}

/// Browse the local network for devices of one protocol.
///
/// Blocks for the full timeout. Responders are deduplicated by service
/// fullname. An empty result is not an error.
pub fn browse(protocol: Protocol, timeout: Duration) -> Result<Vec<DeviceDescriptor>, CastError> {
    let daemon =
        ServiceDaemon::new().map_err(|e| CastError::Discovery(format!("mDNS daemon: {e}")))?;
    let ty = service_type(protocol);
    let events = daemon
        .browse(ty)
        .map_err(|e| CastError::Discovery(format!("mDNS browse: {e}")))?;

    let mut found: HashMap<String, DeviceDescriptor> = HashMap::new();
    let deadline = Instant::now() + timeout;

    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(remaining) {
            Ok(ServiceEvent::ServiceResolved(info)) => {
                if let Some(descriptor) = descriptor_from(protocol, &info) {
                    found.insert(info.get_fullname().to_string(), descriptor);
                }
            }
            Ok(_) => {}
            Err(_) => break, // Timeout or daemon gone.
        }
    }

    let _ = daemon.stop_browse(ty);
    let _ = daemon.shutdown();

    let mut devices: Vec<DeviceDescriptor> = found.into_values().collect();
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Map a resolved mDNS service to a device descriptor.
///
/// Returns None when the record carries no usable address.
fn descriptor_from(protocol: Protocol, info: &ServiceInfo) -> Option<DeviceDescriptor> {
    let address: IpAddr = (*info.get_addresses_v4().into_iter().next()?).into();
    let instance = instance_name(info.get_fullname(), service_type(protocol));

    let (id, name) = match protocol {
        Protocol::Googlecast => (
            info.get_property_val_str("id")
                .unwrap_or(instance)
                .to_string(),
            info.get_property_val_str("fn")
                .unwrap_or(instance)
                .to_string(),
        ),
        Protocol::Airplay => (
            info.get_property_val_str("deviceid")
                .unwrap_or(instance)
                .to_string(),
            instance.to_string(),
        ),
    };

    Some(DeviceDescriptor {
        id,
        name,
        address,
        port: info.get_port(),
        protocol,
    })
}

/// Strip the service-type suffix from an mDNS fullname.
fn instance_name<'a>(fullname: &'a str, ty: &str) -> &'a str {
    fullname
        .strip_suffix(ty)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(fullname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_types_match_protocols() {
        assert_eq!(service_type(Protocol::Airplay), "_airplay._tcp.local.");
        assert_eq!(service_type(Protocol::Googlecast), "_googlecast._tcp.local.");
    }

    #[test]
    fn instance_name_strips_service_suffix() {
        assert_eq!(
            instance_name("Kitchen._airplay._tcp.local.", "_airplay._tcp.local."),
            "Kitchen"
        );
    }

    #[test]
    fn instance_name_keeps_unrelated_fullname() {
        assert_eq!(
            instance_name("weird-record", "_airplay._tcp.local."),
            "weird-record"
        );
    }
}
