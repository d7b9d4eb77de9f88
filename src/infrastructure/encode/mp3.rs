//! Real-time MP3 encoding of captured PCM
//!
//! Runs on a dedicated OS thread so encoding never blocks the runtime or
//! the audio callback. PCM batches come in over the bounded frame channel,
//! MP3 chunks go out over a tokio broadcast channel that the HTTP server
//! fans out to clients. When the device rate is one LAME does not accept,
//! the stream is resampled to 48kHz first.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm, Quality};
use tokio::sync::broadcast;

use super::resample::StreamResampler;
use crate::application::ports::{EncodeError, EncoderHandle, LiveEncoder, PcmFrames};

/// Sample rates LAME accepts directly
const LAME_SAMPLE_RATES: [u32; 9] = [
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000,
];

/// Rate everything else gets resampled to
const FALLBACK_SAMPLE_RATE: u32 = 48_000;

/// How long to wait for the encoder thread to initialize
const INIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Pick the rate the encoder will run at for a given capture rate.
fn encoder_rate(capture_rate: u32) -> u32 {
    if LAME_SAMPLE_RATES.contains(&capture_rate) {
        capture_rate
    } else {
        FALLBACK_SAMPLE_RATE
    }
}

fn create_encoder(sample_rate: u32) -> Result<mp3lame_encoder::Encoder, EncodeError> {
    let init_err = |e: mp3lame_encoder::BuildError| EncodeError::Init(e.to_string());

    let mut builder =
        Builder::new().ok_or_else(|| EncodeError::Init("LAME allocation failed".into()))?;
    builder.set_num_channels(1).map_err(init_err)?;
    builder.set_sample_rate(sample_rate).map_err(init_err)?;
    builder.set_brate(Bitrate::Kbps128).map_err(init_err)?;
    builder.set_quality(Quality::Best).map_err(init_err)?;
    builder.build().map_err(init_err)
}

/// Encode one batch and broadcast the resulting chunk.
///
/// A send error only means no client is subscribed right now; the chunk is
/// discarded and encoding carries on.
fn encode_and_broadcast(
    lame: &mut mp3lame_encoder::Encoder,
    samples: &[i16],
    out: &broadcast::Sender<Bytes>,
) {
    // LAME sizing recommendation: 1.25 * samples + 7200.
    let estimated_size = (samples.len() as f64 * 1.25 + 7200.0) as usize;
    let mut mp3_buffer: Vec<u8> = Vec::with_capacity(estimated_size);

    match lame.encode(MonoPcm(samples), mp3_buffer.spare_capacity_mut()) {
        Ok(bytes_written) => {
            if bytes_written > 0 {
                // SAFETY: LAME wrote exactly `bytes_written` bytes.
                unsafe {
                    mp3_buffer.set_len(bytes_written);
                }
                let _ = out.send(Bytes::from(mp3_buffer));
            }
        }
        Err(e) => {
            eprintln!("LAME encoding error: {:?}", e);
        }
    }
}

/// Flush LAME's internal buffers and broadcast the final chunk.
fn flush_and_broadcast(lame: &mut mp3lame_encoder::Encoder, out: &broadcast::Sender<Bytes>) {
    let mut mp3_buffer: Vec<u8> = Vec::with_capacity(7200);
    if let Ok(bytes_written) = lame.flush::<FlushNoGap>(mp3_buffer.spare_capacity_mut()) {
        if bytes_written > 0 {
            // SAFETY: LAME wrote exactly `bytes_written` bytes.
            unsafe {
                mp3_buffer.set_len(bytes_written);
            }
            let _ = out.send(Bytes::from(mp3_buffer));
        }
    }
}

/// MP3 live encoder backed by LAME
pub struct Mp3LiveEncoder;

impl Mp3LiveEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Mp3LiveEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveEncoder for Mp3LiveEncoder {
    fn spawn(
        &self,
        frames: PcmFrames,
        out: broadcast::Sender<Bytes>,
    ) -> Result<EncoderHandle, EncodeError> {
        let capture_rate = frames.sample_rate;
        let target_rate = encoder_rate(capture_rate);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), EncodeError>>();

        // Encoder and resampler are built on the worker thread; init errors
        // are reported back before this function returns.
        let join = thread::spawn(move || {
            let mut lame = match create_encoder(target_rate) {
                Ok(lame) => lame,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let mut resampler = if capture_rate != target_rate {
                match StreamResampler::new(capture_rate, target_rate) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        let _ = ready_tx.send(Err(EncodeError::Init(e)));
                        return;
                    }
                }
            } else {
                None
            };
            let _ = ready_tx.send(Ok(()));

            // Runs until the capture side closes the frame channel.
            while let Ok(batch) = frames.frames.recv() {
                match resampler.as_mut() {
                    Some(resampler) => match resampler.push(&batch) {
                        Ok(resampled) if !resampled.is_empty() => {
                            encode_and_broadcast(&mut lame, &resampled, &out);
                        }
                        Ok(_) => {}
                        Err(e) => eprintln!("Resampler error: {}", e),
                    },
                    None => encode_and_broadcast(&mut lame, &batch, &out),
                }
            }

            if let Some(mut resampler) = resampler.take() {
                if let Ok(tail) = resampler.flush() {
                    if !tail.is_empty() {
                        encode_and_broadcast(&mut lame, &tail, &out);
                    }
                }
            }
            flush_and_broadcast(&mut lame, &out);
        });

        match ready_rx.recv_timeout(INIT_TIMEOUT) {
            Ok(Ok(())) => Ok(EncoderHandle::new(join)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EncodeError::Init(
                "Encoder thread did not start in time".into(),
            )),
        }
    }
}
