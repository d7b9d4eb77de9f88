//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with mDNS, the casting protocols, cpal, LAME, and the
//! local streaming server.

pub mod capture;
pub mod cast;
pub mod config;
pub mod discovery;
pub mod encode;
pub mod recording;
pub mod server;

// Re-export adapters
pub use capture::CpalMic;
pub use cast::{create_caster, AirplayCaster, GoogleCastCaster};
pub use config::XdgConfigStore;
pub use encode::Mp3LiveEncoder;
pub use server::{StreamServer, StreamSource};
