//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod caster;
pub mod capture;
pub mod config;
pub mod encoder;

// Re-export common types
pub use caster::{CastError, CastSession, Caster, MediaUrl, PinPrompt};
pub use capture::{CaptureError, MicHandle, MicSource, PcmFrames, ProgressCallback};
pub use config::ConfigStore;
pub use encoder::{EncodeError, EncoderHandle, LiveEncoder};
