//! Protocol client port interfaces
//!
//! One `Caster` variant exists per supported protocol. The saved protocol tag
//! selects which variant handles an invocation; the variants delegate the
//! actual casting work to their protocol libraries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::config::DeviceConfig;
use crate::domain::device::{Credentials, DeviceDescriptor, Protocol};

/// Casting errors
#[derive(Debug, Error)]
pub enum CastError {
    #[error("Device \"{0}\" not found on the network. Run 'herald --setup' to reconfigure")]
    DeviceNotFound(String),

    #[error("\"{device}\" requires pairing. Run 'herald --pair' and enter the PIN shown on the device")]
    AuthenticationRequired { device: String },

    #[error("Cannot reach \"{device}\" at {address}: {reason}")]
    NetworkUnreachable {
        device: String,
        address: String,
        reason: String,
    },

    #[error("Pairing is not supported for {0} devices")]
    PairingUnsupported(Protocol),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Callback used during pairing to obtain the PIN the device displays.
/// Returns None when the user aborts.
pub type PinPrompt = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// A URL the target device should fetch and play.
#[derive(Debug, Clone)]
pub struct MediaUrl {
    pub url: String,
    pub content_type: String,
    /// True for the unbounded live broadcast stream
    pub live: bool,
}

impl MediaUrl {
    pub fn file(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.into(),
            live: false,
        }
    }

    pub fn live(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: "audio/mpeg".to_string(),
            live: true,
        }
    }
}

/// Port for a protocol client variant.
#[async_trait]
pub trait Caster: Send + Sync {
    /// The protocol this variant speaks.
    fn protocol(&self) -> Protocol;

    /// Scan the network for devices of this protocol.
    ///
    /// An empty result is not an error.
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, CastError>;

    /// Pair with a device, producing a credential the caller must persist.
    ///
    /// AirPlay only; the Cast variant returns `CastError::PairingUnsupported`.
    async fn pair(
        &self,
        device: &DeviceDescriptor,
        read_pin: PinPrompt,
    ) -> Result<Credentials, CastError>;

    /// Connect to the saved device.
    ///
    /// Fails fast with `NetworkUnreachable` when the device cannot be
    /// reached; no silent retry.
    async fn connect(&self, config: &DeviceConfig) -> Result<Box<dyn CastSession>, CastError>;
}

/// An open session with a device.
#[async_trait]
pub trait CastSession: Send {
    /// Tell the device to fetch and play the given URL.
    async fn play(&mut self, media: &MediaUrl) -> Result<(), CastError>;

    /// Stop playback and tear the session down.
    async fn stop(&mut self) -> Result<(), CastError>;
}
