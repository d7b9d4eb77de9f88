//! Streaming mono resampler built on rubato
//!
//! The FFT resampler wants fixed-size input blocks, but capture batches
//! arrive at whatever size the device driver picks. Incoming samples are
//! buffered until a full block is available; `flush` zero-pads the tail so
//! no audio is lost at shutdown.

use rubato::{FftFixedIn, Resampler};

/// Resampler block size in frames
const CHUNK_SIZE: usize = 1024;

pub struct StreamResampler {
    resampler: FftFixedIn<f32>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, String> {
        let resampler = FftFixedIn::<f32>::new(
            source_rate as usize,
            target_rate as usize,
            CHUNK_SIZE,
            2, // Sub-chunks
            1, // Mono
        )
        .map_err(|e| format!("Resampler init failed: {}", e))?;

        Ok(Self {
            resampler,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
        })
    }

    /// Feed a batch of samples, returning whatever full blocks produced.
    pub fn push(&mut self, samples: &[i16]) -> Result<Vec<i16>, String> {
        self.pending
            .extend(samples.iter().map(|&s| s as f32 / 32768.0));

        let mut output = Vec::new();
        loop {
            let needed = self.resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }

            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            let resampled = self
                .resampler
                .process(&[chunk], None)
                .map_err(|e| format!("Resampling failed: {}", e))?;
            output.extend(resampled[0].iter().map(|&s| (s * 32767.0) as i16));
        }

        Ok(output)
    }

    /// Drain buffered samples, padding the final block with silence.
    pub fn flush(&mut self) -> Result<Vec<i16>, String> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let needed = self.resampler.input_frames_next();
        let mut chunk: Vec<f32> = self.pending.drain(..).collect();
        chunk.resize(needed, 0.0);

        let resampled = self
            .resampler
            .process(&[chunk], None)
            .map_err(|e| format!("Resampling failed: {}", e))?;

        Ok(resampled[0].iter().map(|&s| (s * 32767.0) as i16).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_batches_buffer_until_full_block() {
        let mut resampler = StreamResampler::new(48_000, 48_000).unwrap();
        // Well under one block; nothing should come out yet.
        let out = resampler.push(&[100i16; 256]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn downsampling_halves_sample_count() {
        let mut resampler = StreamResampler::new(48_000, 24_000).unwrap();
        let input = vec![0i16; 48_000];
        let mut output = resampler.push(&input).unwrap();
        output.extend(resampler.flush().unwrap());

        // One second in should come out as roughly half a second.
        // The FFT pipeline holds back some latency frames, hence the slack.
        let expected = 24_000;
        assert!(
            (output.len() as i64 - expected).unsigned_abs() < 8192,
            "got {} samples",
            output.len()
        );
    }
}
