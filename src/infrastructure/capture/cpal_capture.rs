//! Microphone capture using cpal
//!
//! Opens the default input device with a mono-preferring configuration and
//! pushes fixed batches of mono i16 samples into a bounded channel. The
//! device callback only ever does a `try_send`; when the consumer falls
//! behind, the newest batch is dropped rather than stalling the audio
//! thread.
//!
//! cpal::Stream is not Send, so the stream lives on a dedicated thread that
//! parks until the handle is closed, then drops the stream to release the
//! device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Sender, TrySendError};

use crate::application::ports::{CaptureError, MicHandle, MicSource, PcmFrames};

/// Frame channel depth. At typical callback sizes this is several seconds
/// of backlog before frames start being dropped.
const CHANNEL_CAPACITY: usize = 256;

/// How long to wait for the capture thread to report readiness
const OPEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Rate requested from the device when supported
const PREFERRED_SAMPLE_RATE: u32 = 48_000;

/// Microphone source backed by the system default input device
pub struct CpalMic;

impl CpalMic {
    pub fn new() -> Self {
        Self
    }

    /// Get the default input device
    fn get_input_device() -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        host.default_input_device()
            .ok_or(CaptureError::NoInputDevice)
    }

    /// Get a suitable input configuration, preferring mono and i16/f32
    fn get_input_config(
        device: &cpal::Device,
    ) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to get configs: {}", e)))?;

        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;

        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let is_better = match &best_config {
                None => true,
                Some(current) => config.channels() < current.channels(),
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let config_range =
            best_config.ok_or(CaptureError::StartFailed("No suitable config found".into()))?;

        // Prefer 48kHz when the device supports it, otherwise take the
        // highest rate it offers.
        let sample_format = config_range.sample_format();
        let sample_rate = if config_range.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
            && config_range.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
        {
            cpal::SampleRate(PREFERRED_SAMPLE_RATE)
        } else {
            config_range.max_sample_rate()
        };
        let config = StreamConfig {
            channels: config_range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        Ok((config, sample_format))
    }

    /// Mix stereo (or more channels) down to mono
    fn to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels == 1 {
            return samples.to_vec();
        }

        samples
            .chunks(channels as usize)
            .map(|chunk| {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    }

    /// Push a batch into the channel without ever blocking the audio thread
    fn push_frames(tx: &Sender<Vec<i16>>, frames: Vec<i16>) {
        match tx.try_send(frames) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {} // Consumer is behind; drop the batch.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl Default for CpalMic {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MicSource for CpalMic {
    async fn open(&self) -> Result<(PcmFrames, MicHandle), CaptureError> {
        let (frame_tx, frame_rx) = bounded::<Vec<i16>>(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, CaptureError>>();

        let open = Arc::new(AtomicBool::new(true));
        let open_flag = Arc::clone(&open);

        std::thread::spawn(move || {
            let device = match CpalMic::get_input_device() {
                Ok(d) => d,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let (config, sample_format) = match CpalMic::get_input_config(&device) {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let sample_rate = config.sample_rate.0;
            let channels = config.channels;

            let stream_result = match sample_format {
                SampleFormat::I16 => {
                    let tx = frame_tx.clone();
                    device.build_input_stream(
                        &config,
                        move |data: &[i16], _: &cpal::InputCallbackInfo| {
                            CpalMic::push_frames(&tx, CpalMic::to_mono(data, channels));
                        },
                        |err| eprintln!("Audio stream error: {}", err),
                        None,
                    )
                }

                SampleFormat::F32 => {
                    let tx = frame_tx.clone();
                    device.build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            let i16_data: Vec<i16> =
                                data.iter().map(|&s| (s * 32767.0) as i16).collect();
                            CpalMic::push_frames(&tx, CpalMic::to_mono(&i16_data, channels));
                        },
                        |err| eprintln!("Audio stream error: {}", err),
                        None,
                    )
                }

                _ => {
                    let _ = ready_tx.send(Err(CaptureError::StartFailed(
                        "Unsupported sample format".into(),
                    )));
                    return;
                }
            };

            let stream = match stream_result {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(CaptureError::StartFailed(e.to_string())));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::StartFailed(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(sample_rate));

            // Hold the stream until the handle closes.
            while open_flag.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(50));
            }

            // Dropping the stream releases the device; dropping the sender
            // closes the frame channel so the consumer winds down.
            drop(stream);
            drop(frame_tx);
        });

        let readiness = tokio::task::spawn_blocking(move || ready_rx.recv_timeout(OPEN_TIMEOUT))
            .await
            .map_err(|e| CaptureError::StartFailed(format!("Capture task failed: {}", e)))?;

        let sample_rate = match readiness {
            Ok(result) => result?,
            Err(_) => {
                open.store(false, Ordering::SeqCst);
                return Err(CaptureError::StartFailed(
                    "Input device did not start in time".into(),
                ));
            }
        };

        Ok((
            PcmFrames {
                frames: frame_rx,
                sample_rate,
            },
            MicHandle::new(open),
        ))
    }
}
