//! Application layer - use cases and port interfaces

pub mod broadcast;
pub mod devices;
pub mod ports;
pub mod record;
pub mod setup;

pub use broadcast::{BroadcastError, BroadcastState, LiveBroadcaster};
pub use devices::collect_devices;
pub use record::{record_clip, RecordedClip};
pub use setup::{run_setup, SetupError, SetupOutcome};
