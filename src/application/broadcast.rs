//! Live broadcast use case
//!
//! Drives the capture -> encode -> broadcast pipeline through its lifecycle:
//! `Idle -> Capturing -> Streaming -> Stopped`. The HTTP layer subscribes to
//! the broadcast channel handed to `start` and relays chunks to the device.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::broadcast;

use super::ports::{CaptureError, EncodeError, EncoderHandle, LiveEncoder, MicHandle, MicSource};

/// Broadcast lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastState {
    Idle,
    Capturing,
    Streaming,
    Stopped,
}

/// Errors from the broadcast use case
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Broadcast already started")]
    AlreadyStarted,
}

/// Live microphone broadcaster.
///
/// Owns the microphone handle and the encoder thread for one session.
/// Stopping closes the microphone first so the frame channel drains, then
/// waits for the encoder to flush, which ends every chunked HTTP response.
pub struct LiveBroadcaster<M: MicSource, E: LiveEncoder> {
    mic: M,
    encoder: E,
    state: BroadcastState,
    mic_handle: Option<MicHandle>,
    encoder_handle: Option<EncoderHandle>,
}

impl<M: MicSource, E: LiveEncoder> LiveBroadcaster<M, E> {
    pub fn new(mic: M, encoder: E) -> Self {
        Self {
            mic,
            encoder,
            state: BroadcastState::Idle,
            mic_handle: None,
            encoder_handle: None,
        }
    }

    pub fn state(&self) -> BroadcastState {
        self.state
    }

    /// Open the microphone and start encoding into `out`.
    ///
    /// Returns the capture sample rate on success.
    pub async fn start(&mut self, out: broadcast::Sender<Bytes>) -> Result<u32, BroadcastError> {
        if self.state != BroadcastState::Idle {
            return Err(BroadcastError::AlreadyStarted);
        }

        let (frames, mic_handle) = self.mic.open().await?;
        self.state = BroadcastState::Capturing;
        let sample_rate = frames.sample_rate;

        let encoder_handle = match self.encoder.spawn(frames, out) {
            Ok(handle) => handle,
            Err(e) => {
                // Encoder refused to start: release the microphone again.
                mic_handle.close();
                self.state = BroadcastState::Stopped;
                return Err(e.into());
            }
        };

        self.mic_handle = Some(mic_handle);
        self.encoder_handle = Some(encoder_handle);
        self.state = BroadcastState::Streaming;
        Ok(sample_rate)
    }

    /// Stop the broadcast: release the microphone, flush the encoder, and
    /// close the broadcast channel so connected clients see end-of-stream.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.mic_handle.take() {
            handle.close();
        }
        if let Some(encoder) = self.encoder_handle.take() {
            // The encoder drains the closing frame channel and flushes.
            let _ = tokio::task::spawn_blocking(move || encoder.finish()).await;
        }
        self.state = BroadcastState::Stopped;
    }
}
