//! Application configuration value objects

use serde::{Deserialize, Serialize};

use crate::domain::device::{DeviceDescriptor, Protocol};

/// Default local streaming port
pub const DEFAULT_PORT: u16 = 8537;

/// Default audio directory (relative to the working directory)
pub const DEFAULT_AUDIO_DIR: &str = "audio";

/// Default discovery timeout in seconds
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 5;

/// The single saved speaker the player targets.
///
/// Overwritten wholesale on re-setup; there are no concurrent writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub protocol: Protocol,
    /// AirPlay pairing credential, written back after `--pair`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

impl DeviceConfig {
    /// Build the config record for a freshly selected device.
    pub fn from_descriptor(descriptor: &DeviceDescriptor) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            address: descriptor.address.to_string(),
            port: descriptor.port,
            protocol: descriptor.protocol,
            credentials: None,
        }
    }
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub device: Option<DeviceConfig>,
    pub port: Option<u16>,
    pub audio_dir: Option<String>,
    pub discovery_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Create config with default values (no device - setup fills that in)
    pub fn defaults() -> Self {
        Self {
            device: None,
            port: Some(DEFAULT_PORT),
            audio_dir: Some(DEFAULT_AUDIO_DIR.to_string()),
            discovery_timeout_secs: Some(DEFAULT_DISCOVERY_TIMEOUT_SECS),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            device: other.device.or(self.device),
            port: other.port.or(self.port),
            audio_dir: other.audio_dir.or(self.audio_dir),
            discovery_timeout_secs: other.discovery_timeout_secs.or(self.discovery_timeout_secs),
        }
    }

    /// Get the streaming port, or the default if not set
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Get the audio directory, or the default if not set
    pub fn audio_dir_or_default(&self) -> &str {
        self.audio_dir.as_deref().unwrap_or(DEFAULT_AUDIO_DIR)
    }

    /// Get the discovery timeout, or the default if not set
    pub fn discovery_timeout_or_default(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.discovery_timeout_secs
                .unwrap_or(DEFAULT_DISCOVERY_TIMEOUT_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn descriptor() -> DeviceDescriptor {
        DeviceDescriptor {
            id: "aa:bb:cc".to_string(),
            name: "Kitchen".to_string(),
            address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            port: 7000,
            protocol: Protocol::Airplay,
        }
    }

    #[test]
    fn defaults_have_expected_values() {
        let config = AppConfig::defaults();
        assert!(config.device.is_none());
        assert_eq!(config.port, Some(DEFAULT_PORT));
        assert_eq!(config.audio_dir, Some("audio".to_string()));
        assert_eq!(config.discovery_timeout_secs, Some(5));
    }

    #[test]
    fn empty_has_all_none() {
        let config = AppConfig::empty();
        assert!(config.device.is_none());
        assert!(config.port.is_none());
        assert!(config.audio_dir.is_none());
    }

    #[test]
    fn merge_other_takes_precedence() {
        let base = AppConfig {
            port: Some(9000),
            audio_dir: Some("clips".to_string()),
            ..Default::default()
        };
        let other = AppConfig {
            port: Some(9100),
            audio_dir: None, // Should not override
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.port, Some(9100));
        assert_eq!(merged.audio_dir, Some("clips".to_string()));
    }

    #[test]
    fn merge_keeps_saved_device() {
        let base = AppConfig {
            device: Some(DeviceConfig::from_descriptor(&descriptor())),
            ..Default::default()
        };
        let merged = base.merge(AppConfig::empty());
        assert_eq!(merged.device.unwrap().name, "Kitchen");
    }

    #[test]
    fn from_descriptor_has_no_credentials() {
        let device = DeviceConfig::from_descriptor(&descriptor());
        assert_eq!(device.id, "aa:bb:cc");
        assert_eq!(device.address, "192.168.1.20");
        assert_eq!(device.port, 7000);
        assert_eq!(device.protocol, Protocol::Airplay);
        assert!(device.credentials.is_none());
    }

    #[test]
    fn accessors_fall_back_to_defaults() {
        let config = AppConfig::empty();
        assert_eq!(config.port_or_default(), DEFAULT_PORT);
        assert_eq!(config.audio_dir_or_default(), "audio");
        assert_eq!(
            config.discovery_timeout_or_default(),
            std::time::Duration::from_secs(5)
        );
    }

    #[test]
    fn device_config_toml_round_trip() {
        let config = AppConfig {
            device: Some(DeviceConfig {
                id: "uuid-1".to_string(),
                name: "Living Room TV".to_string(),
                address: "192.168.1.30".to_string(),
                port: 8009,
                protocol: Protocol::Googlecast,
                credentials: None,
            }),
            ..AppConfig::defaults()
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.device, config.device);
    }
}
