//! Microphone capture port interface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crossbeam_channel::Receiver;
use thiserror::Error;

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),
}

/// Progress callback type for reporting recording progress.
/// Parameters: (elapsed_ms, total_ms)
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Mono i16 PCM frames flowing out of an open capture session.
///
/// The channel is bounded and the producer never blocks on it: when the
/// consumer falls behind, the newest frame is dropped whole. Frames that do
/// arrive are in capture order.
pub struct PcmFrames {
    pub frames: Receiver<Vec<i16>>,
    pub sample_rate: u32,
}

/// Handle to an open microphone.
///
/// `close` asks the capture thread to drop the input stream, which releases
/// the device and closes the frame channel.
#[derive(Clone)]
pub struct MicHandle {
    open: Arc<AtomicBool>,
}

impl MicHandle {
    pub fn new(open: Arc<AtomicBool>) -> Self {
        Self { open }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Port for opening the microphone.
#[async_trait]
pub trait MicSource: Send + Sync {
    /// Open the default input device and start capturing.
    async fn open(&self) -> Result<(PcmFrames, MicHandle), CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mic_handle_close_clears_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        let handle = MicHandle::new(Arc::clone(&flag));
        assert!(handle.is_open());
        handle.close();
        assert!(!handle.is_open());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
