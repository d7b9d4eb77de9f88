//! Google Cast protocol client adapter
//!
//! Delegates to the `rust_cast` library: connect to the device's port 8009,
//! launch the default media receiver, and hand it the local streaming URL.
//! The library API is blocking and its channels are not Send, so the session
//! runs on a dedicated worker thread that owns the connection, answers the
//! receiver's heartbeat pings, and takes commands over a channel.

use std::sync::mpsc;
use std::time::Duration;

use async_trait::async_trait;
use rust_cast::channels::heartbeat::HeartbeatResponse;
use rust_cast::channels::media::{Media, StreamType};
use rust_cast::channels::receiver::CastDeviceApp;
use rust_cast::{CastDevice, ChannelMessage};

use crate::application::ports::{CastError, CastSession, Caster, MediaUrl, PinPrompt};
use crate::domain::config::DeviceConfig;
use crate::domain::device::{Credentials, DeviceDescriptor, Protocol};
use crate::infrastructure::discovery;

/// Well-known destination for the receiver platform itself
const DEFAULT_DESTINATION_ID: &str = "receiver-0";

/// How long to wait for the worker to finish connecting
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for a command to be acknowledged
const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// How long to wait for the worker thread to exit after a stop
const WORKER_EXIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Google Cast protocol client
pub struct GoogleCastCaster;

impl GoogleCastCaster {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GoogleCastCaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Caster for GoogleCastCaster {
    fn protocol(&self) -> Protocol {
        Protocol::Googlecast
    }

    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceDescriptor>, CastError> {
        tokio::task::spawn_blocking(move || discovery::browse(Protocol::Googlecast, timeout))
            .await
            .map_err(|e| CastError::Discovery(format!("Discovery task failed: {e}")))?
    }

    async fn pair(
        &self,
        _device: &DeviceDescriptor,
        _read_pin: PinPrompt,
    ) -> Result<Credentials, CastError> {
        // Cast devices are pairing-free.
        Err(CastError::PairingUnsupported(Protocol::Googlecast))
    }

    async fn connect(&self, config: &DeviceConfig) -> Result<Box<dyn CastSession>, CastError> {
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CastError>>();

        let address = config.address.clone();
        let port = config.port;
        let name = config.name.clone();
        let join = std::thread::spawn(move || worker(address, port, name, ready_tx, command_rx));

        let readiness = tokio::task::spawn_blocking(move || ready_rx.recv_timeout(CONNECT_TIMEOUT))
            .await
            .map_err(|e| CastError::Protocol(format!("Connect task failed: {e}")))?;
        match readiness {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(CastError::NetworkUnreachable {
                    device: config.name.clone(),
                    address: config.address.clone(),
                    reason: "connection handshake timed out".to_string(),
                })
            }
        }

        Ok(Box::new(GoogleCastSession {
            commands: command_tx,
            worker: Some(join),
        }))
    }
}

/// Commands forwarded to the worker thread.
enum Command {
    Play {
        media: MediaUrl,
        reply: mpsc::Sender<Result<(), CastError>>,
    },
    Stop {
        reply: mpsc::Sender<Result<(), CastError>>,
    },
}

fn protocol_err(e: rust_cast::errors::Error) -> CastError {
    CastError::Protocol(format!("Cast: {e}"))
}

/// Worker loop owning the (non-Send) cast connection.
///
/// Connects, reports readiness, waits for the play command, then pumps the
/// message stream answering heartbeat pings so the receiver keeps the
/// session alive. Heartbeats arrive every few seconds, which bounds how
/// long a stop command can sit in the queue.
fn worker(
    address: String,
    port: u16,
    name: String,
    ready: mpsc::Sender<Result<(), CastError>>,
    commands: mpsc::Receiver<Command>,
) {
    let device = match CastDevice::connect_without_host_verification(address.clone(), port) {
        Ok(device) => device,
        Err(e) => {
            let _ = ready.send(Err(CastError::NetworkUnreachable {
                device: name,
                address,
                reason: e.to_string(),
            }));
            return;
        }
    };
    if let Err(e) = device
        .connection
        .connect(DEFAULT_DESTINATION_ID)
        .and_then(|_| device.heartbeat.ping())
    {
        let _ = ready.send(Err(protocol_err(e)));
        return;
    }
    let _ = ready.send(Ok(()));

    // Nothing to pump until playback starts; block on the first command.
    let mut session_id: Option<String> = None;
    match commands.recv() {
        Ok(Command::Play { media, reply }) => {
            let result = load_media(&device, &media);
            match result {
                Ok(id) => {
                    session_id = Some(id);
                    let _ = reply.send(Ok(()));
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                    return;
                }
            }
        }
        Ok(Command::Stop { reply }) => {
            let _ = reply.send(Ok(()));
            return;
        }
        Err(_) => return, // Session dropped before use.
    }

    loop {
        match commands.try_recv() {
            Ok(Command::Stop { reply }) => {
                let result = match session_id.take() {
                    Some(id) => device.receiver.stop_app(id.as_str()).map_err(protocol_err),
                    None => Ok(()),
                };
                let _ = reply.send(result);
                return;
            }
            Ok(Command::Play { media, reply }) => {
                let _ = reply.send(load_media(&device, &media).map(|id| {
                    session_id = Some(id);
                }));
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => return,
        }

        match device.receive() {
            Ok(ChannelMessage::Heartbeat(response)) => {
                if let HeartbeatResponse::Ping = response {
                    let _ = device.heartbeat.pong();
                }
            }
            Ok(_) => {}
            Err(_) => return, // Connection gone; nothing left to control.
        }
    }
}

/// Launch the default media receiver and hand it the URL to play.
///
/// Returns the receiver app session id, needed to stop it later.
fn load_media(device: &CastDevice<'_>, media: &MediaUrl) -> Result<String, CastError> {
    let app = device
        .receiver
        .launch_app(&CastDeviceApp::DefaultMediaReceiver)
        .map_err(protocol_err)?;
    device
        .connection
        .connect(app.transport_id.as_str())
        .map_err(protocol_err)?;

    let stream_type = if media.live {
        StreamType::Live
    } else {
        StreamType::Buffered
    };
    device
        .media
        .load(
            app.transport_id.as_str(),
            app.session_id.as_str(),
            &Media {
                content_id: media.url.clone(),
                content_type: media.content_type.clone(),
                stream_type,
                duration: None,
                metadata: None,
            },
        )
        .map_err(protocol_err)?;

    Ok(app.session_id)
}

/// An open Cast session, proxying commands to the worker thread.
struct GoogleCastSession {
    commands: mpsc::Sender<Command>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl GoogleCastSession {
    async fn send(&self, command: Command, reply: mpsc::Receiver<Result<(), CastError>>) -> Result<(), CastError> {
        self.commands
            .send(command)
            .map_err(|_| CastError::Protocol("Cast worker is gone".to_string()))?;
        tokio::task::spawn_blocking(move || reply.recv_timeout(COMMAND_TIMEOUT))
            .await
            .map_err(|e| CastError::Protocol(format!("Command task failed: {e}")))?
            .map_err(|_| CastError::Protocol("Cast device did not acknowledge".to_string()))?
    }
}

#[async_trait]
impl CastSession for GoogleCastSession {
    async fn play(&mut self, media: &MediaUrl) -> Result<(), CastError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(
            Command::Play {
                media: media.clone(),
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    async fn stop(&mut self) -> Result<(), CastError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let result = self
            .send(Command::Stop { reply: reply_tx }, reply_rx)
            .await;
        if let Some(worker) = self.worker.take() {
            join_with_timeout(worker, WORKER_EXIT_TIMEOUT).await;
        }
        result
    }
}

/// Join the worker thread, giving up after `timeout`.
///
/// A device that goes silent without closing the TCP connection leaves the
/// worker blocked in a socket read. That thread cannot be interrupted, so
/// after the timeout it is detached and left to die with the process.
async fn join_with_timeout(worker: std::thread::JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while !worker.is_finished() {
        if std::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let _ = worker.join();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finished_worker_joins_cleanly() {
        let handle = std::thread::spawn(|| {});
        assert!(join_with_timeout(handle, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn silent_worker_cannot_hang_shutdown() {
        // Simulates a worker stuck in a socket read against a dead device.
        let (tx, rx) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || {
            let _ = rx.recv();
        });

        let start = std::time::Instant::now();
        assert!(!join_with_timeout(handle, Duration::from_millis(200)).await);
        assert!(start.elapsed() < Duration::from_secs(2));
        drop(tx);
    }
}
