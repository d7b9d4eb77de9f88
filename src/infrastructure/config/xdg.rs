//! XDG config store adapter

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// XDG-compliant config store
pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    /// Create a new XDG config store with default path
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("herald");

        Self {
            path: config_dir.join("config.toml"),
        }
    }

    /// Create with custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_toml(content: &str) -> Result<AppConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn to_toml(config: &AppConfig) -> Result<String, ConfigError> {
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.exists() {
            // No file yet is not an error; setup has simply not run.
            return Ok(AppConfig::empty());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Self::parse_toml(&content)
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let content = Self::to_toml(config)?;

        fs::write(&self.path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::DeviceConfig;
    use crate::domain::device::Protocol;

    #[test]
    fn default_path_is_xdg() {
        let store = XdgConfigStore::new();
        let path = store.path();
        assert!(path.to_string_lossy().contains("herald"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn custom_path() {
        let store = XdgConfigStore::with_path("/custom/path/config.toml");
        assert_eq!(store.path(), PathBuf::from("/custom/path/config.toml"));
    }

    #[test]
    fn parse_toml_with_device_table() {
        let content = r#"
port = 9000
audio_dir = "clips"

[device]
id = "AA:BB:CC:DD:EE:FF"
name = "Kitchen speaker"
address = "192.168.1.42"
port = 8009
protocol = "googlecast"
"#;

        let config = XdgConfigStore::parse_toml(content).unwrap();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.audio_dir, Some("clips".to_string()));
        let device = config.device.unwrap();
        assert_eq!(device.name, "Kitchen speaker");
        assert_eq!(device.protocol, Protocol::Googlecast);
        assert!(device.credentials.is_none());
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = XdgConfigStore::with_path(dir.path().join("config.toml"));

        let mut config = AppConfig::empty();
        config.device = Some(DeviceConfig {
            id: "F0CA".to_string(),
            name: "Den".to_string(),
            address: "10.0.0.7".to_string(),
            port: 7000,
            protocol: Protocol::Airplay,
            credentials: Some("1234".to_string()),
        });

        store.save(&config).await.unwrap();
        assert!(store.exists());

        let loaded = store.load().await.unwrap();
        let device = loaded.device.unwrap();
        assert_eq!(device.name, "Den");
        assert_eq!(device.credentials.as_deref(), Some("1234"));
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let store = XdgConfigStore::with_path("/nonexistent/herald/config.toml");
        let config = store.load().await.unwrap();
        assert!(config.device.is_none());
        assert!(config.port.is_none());
    }
}
