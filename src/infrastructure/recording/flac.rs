//! FLAC encoding for recorded clips
//!
//! Clips recorded with `--record` are kept lossless so replaying them over
//! the speaker does not stack two lossy codecs. The clip is written to a
//! temp file that the static streamer then serves.

use std::path::PathBuf;

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

use crate::application::record::RecordedClip;

/// Bits per sample (16-bit audio)
const BITS_PER_SAMPLE: usize = 16;

/// Number of channels (mono)
const CHANNELS: usize = 1;

/// FLAC encoding errors
#[derive(Debug, thiserror::Error)]
pub enum FlacError {
    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC write failed: {0}")]
    Write(String),

    #[error("Failed to write clip file: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode mono i16 PCM samples to FLAC bytes
pub fn encode_to_flac(pcm_samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, FlacError> {
    // flacenc works on i32 samples internally.
    let samples_i32: Vec<i32> = pcm_samples.iter().map(|&s| s as i32).collect();

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| FlacError::Config(format!("{:?}", e)))?;

    let source = MemSource::from_samples(
        &samples_i32,
        CHANNELS,
        BITS_PER_SAMPLE,
        sample_rate as usize,
    );

    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| FlacError::Encode(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    flac_stream
        .write(&mut sink)
        .map_err(|e| FlacError::Write(e.to_string()))?;

    Ok(sink.into_inner())
}

/// Encode a clip and write it to a temp file, returning the path.
///
/// The file is overwritten on each run; the clip only needs to live long
/// enough to be streamed once.
pub fn write_clip_file(clip: &RecordedClip) -> Result<PathBuf, FlacError> {
    let data = encode_to_flac(&clip.samples, clip.sample_rate)?;
    let path = std::env::temp_dir().join("herald-clip.flac");
    std::fs::write(&path, data)?;
    Ok(path)
}
