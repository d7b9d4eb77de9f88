//! Recorded-clip persistence

mod flac;

pub use flac::{encode_to_flac, write_clip_file, FlacError};
