//! Live encoder port interface

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::broadcast;

use super::capture::PcmFrames;

/// Encoder errors
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("Failed to initialize encoder: {0}")]
    Init(String),
}

/// Handle to a running encoder thread.
pub struct EncoderHandle {
    join: std::thread::JoinHandle<()>,
}

impl EncoderHandle {
    pub fn new(join: std::thread::JoinHandle<()>) -> Self {
        Self { join }
    }

    /// Wait for the encoder to drain its input and flush.
    ///
    /// Blocking; call from a blocking context. Returns once the final
    /// chunks have been broadcast.
    pub fn finish(self) {
        let _ = self.join.join();
    }
}

/// Port for the real-time compressed-stream encoder.
///
/// The encoder runs on its own OS thread, consuming PCM frames until the
/// frame channel closes, and broadcasts encoded chunks to every HTTP
/// subscriber in capture order.
pub trait LiveEncoder: Send + Sync {
    fn spawn(
        &self,
        frames: PcmFrames,
        out: broadcast::Sender<Bytes>,
    ) -> Result<EncoderHandle, EncodeError>;
}
