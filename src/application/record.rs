//! Fixed-duration recording use case

use super::ports::{CaptureError, MicSource, ProgressCallback};

/// A finished recording, ready to be encoded into an artifact.
#[derive(Debug, Clone)]
pub struct RecordedClip {
    /// Mono i16 samples in capture order
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl RecordedClip {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Record `seconds` of audio from the microphone.
///
/// Collects whole frames until the target sample count is reached, then
/// releases the microphone and trims the clip to exactly the requested
/// duration. Returns early with whatever was captured if the device closes
/// the frame channel first.
pub async fn record_clip<M: MicSource>(
    mic: &M,
    seconds: u64,
    on_progress: Option<ProgressCallback>,
) -> Result<RecordedClip, CaptureError> {
    let (frames, handle) = mic.open().await?;
    let sample_rate = frames.sample_rate;
    // Saturating: callers bound the duration, but an absurd value must not
    // overflow the sample count.
    let target = usize::try_from((sample_rate as u64).saturating_mul(seconds))
        .unwrap_or(usize::MAX);

    let rx = frames.frames;
    let collected = tokio::task::spawn_blocking(move || {
        // Preallocate at most a minute; longer clips grow as they fill.
        let mut samples: Vec<i16> = Vec::with_capacity(target.min(sample_rate as usize * 60));
        while samples.len() < target {
            match rx.recv() {
                Ok(frame) => {
                    samples.extend_from_slice(&frame);
                    if let Some(progress) = &on_progress {
                        let elapsed_ms =
                            (samples.len().min(target) as u64 * 1000) / sample_rate as u64;
                        progress(elapsed_ms, seconds * 1000);
                    }
                }
                Err(_) => break, // Capture stopped underneath us.
            }
        }
        samples
    })
    .await
    .map_err(|e| CaptureError::CaptureFailed(format!("Collector task failed: {e}")))?;

    handle.close();

    if collected.is_empty() {
        return Err(CaptureError::CaptureFailed("No audio data captured".into()));
    }

    let mut samples = collected;
    samples.truncate(target);

    Ok(RecordedClip {
        samples,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::application::ports::{MicHandle, PcmFrames};

    /// Mic stub that emits an endless monotonic ramp in fixed-size frames.
    struct RampMic {
        sample_rate: u32,
        frame_len: usize,
        open_flag: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MicSource for RampMic {
        async fn open(&self) -> Result<(PcmFrames, MicHandle), CaptureError> {
            self.open_flag.store(true, Ordering::SeqCst);
            let (tx, rx) = crossbeam_channel::bounded(4);
            let frame_len = self.frame_len;
            let open = Arc::clone(&self.open_flag);
            std::thread::spawn(move || {
                let mut n: i16 = 0;
                while open.load(Ordering::SeqCst) {
                    let frame: Vec<i16> = (0..frame_len)
                        .map(|_| {
                            n = n.wrapping_add(1);
                            n
                        })
                        .collect();
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
            });
            Ok((
                PcmFrames {
                    frames: rx,
                    sample_rate: self.sample_rate,
                },
                MicHandle::new(Arc::clone(&self.open_flag)),
            ))
        }
    }

    #[tokio::test]
    async fn clip_has_exactly_requested_duration() {
        let open_flag = Arc::new(AtomicBool::new(false));
        let mic = RampMic {
            sample_rate: 1000,
            frame_len: 64,
            open_flag: Arc::clone(&open_flag),
        };

        let clip = record_clip(&mic, 5, None).await.unwrap();
        assert_eq!(clip.samples.len(), 5000);
        assert!((clip.duration_secs() - 5.0).abs() < f64::EPSILON);
        assert!(!open_flag.load(Ordering::SeqCst), "mic not released");
    }

    #[tokio::test]
    async fn clip_preserves_capture_order() {
        let mic = RampMic {
            sample_rate: 256,
            frame_len: 32,
            open_flag: Arc::new(AtomicBool::new(false)),
        };

        let clip = record_clip(&mic, 1, None).await.unwrap();
        for (i, sample) in clip.samples.iter().enumerate() {
            assert_eq!(*sample, (i as i16).wrapping_add(1));
        }
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let mic = RampMic {
            sample_rate: 512,
            frame_len: 128,
            open_flag: Arc::new(AtomicBool::new(false)),
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let progress: ProgressCallback = Arc::new(move |elapsed, total| {
            seen_clone.lock().unwrap().push((elapsed, total));
        });

        record_clip(&mic, 2, Some(progress)).await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        let (last_elapsed, last_total) = *seen.last().unwrap();
        assert_eq!(last_total, 2000);
        assert_eq!(last_elapsed, 2000);
    }
}
