//! Device identity value objects

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ProtocolParseError;

/// Casting protocol a speaker talks.
///
/// The saved protocol tag selects which protocol client variant handles an
/// invocation; exactly one variant is ever constructed per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Airplay,
    Googlecast,
}

impl Protocol {
    /// All supported protocols, in discovery order.
    pub const ALL: [Protocol; 2] = [Protocol::Airplay, Protocol::Googlecast];

    /// The stable tag used in config files and CLI output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Protocol::Airplay => "airplay",
            Protocol::Googlecast => "googlecast",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "airplay" => Ok(Protocol::Airplay),
            "googlecast" | "cast" | "chromecast" => Ok(Protocol::Googlecast),
            _ => Err(ProtocolParseError {
                input: s.to_string(),
            }),
        }
    }
}

/// A speaker found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Stable identifier advertised over mDNS (Cast `id`, AirPlay `deviceid`)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Network address
    pub address: IpAddr,
    /// Control port (7000 for AirPlay, 8009 for Cast)
    pub port: u16,
    /// Protocol the device was discovered under
    pub protocol: Protocol,
}

/// Pairing credential produced by AirPlay PIN pairing.
///
/// Stored verbatim in the config file and sent as HTTP Basic authorization
/// on subsequent control requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
