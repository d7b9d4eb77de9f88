//! Live stream encoding adapters

mod mp3;
mod resample;

pub use mp3::Mp3LiveEncoder;
