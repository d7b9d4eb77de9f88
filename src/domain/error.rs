//! Domain error types

use thiserror::Error;

/// Error when parsing a protocol tag
#[derive(Debug, Clone, Error)]
#[error("Invalid protocol: \"{input}\". Valid protocols are: airplay, googlecast")]
pub struct ProtocolParseError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("No device configured. Run 'herald --setup' first")]
    NoDevice,
}
