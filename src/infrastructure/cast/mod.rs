//! Protocol client adapters

mod airplay;
mod googlecast;

pub use airplay::AirplayCaster;
pub use googlecast::GoogleCastCaster;

use crate::application::ports::Caster;
use crate::domain::device::Protocol;

/// Create the protocol client variant for a protocol tag.
///
/// Exactly one variant per invocation; the tag decides which.
pub fn create_caster(protocol: Protocol) -> Box<dyn Caster> {
    match protocol {
        Protocol::Airplay => Box::new(AirplayCaster::new()),
        Protocol::Googlecast => Box::new(GoogleCastCaster::new()),
    }
}

/// Create one client per supported protocol, for discovery across all of them.
pub fn create_all_casters() -> Vec<Box<dyn Caster>> {
    Protocol::ALL.into_iter().map(create_caster).collect()
}
