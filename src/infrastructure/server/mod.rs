//! Local HTTP server the target device streams from
//!
//! Built on Axum. One server instance serves exactly one source: either a
//! static audio file at `/audio` or the live MP3 broadcast at `/live.mp3`.
//! It binds to `0.0.0.0` so the speaker can fetch from this machine's LAN
//! address, and shuts down gracefully when the session ends.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use futures::stream::StreamExt;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};

/// Route for static file playback
pub const FILE_ROUTE: &str = "/audio";

/// Route for the live broadcast
pub const LIVE_ROUTE: &str = "/live.mp3";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind streaming port: {0}")]
    Bind(std::io::Error),

    #[error("Could not determine local address: {0}")]
    LocalAddress(std::io::Error),
}

/// What the server streams.
///
/// The live variant holds a `Receiver`, never a `Sender`: the encoder owns
/// the only sender, so when it stops the channel closes and every chunked
/// response ends instead of stalling the device.
pub enum StreamSource {
    /// Serve one local file whole
    File { path: PathBuf, content_type: String },
    /// Fan out live MP3 chunks from the encoder
    Live { chunks: broadcast::Receiver<Bytes> },
}

impl StreamSource {
    pub fn route(&self) -> &'static str {
        match self {
            StreamSource::File { .. } => FILE_ROUTE,
            StreamSource::Live { .. } => LIVE_ROUTE,
        }
    }
}

/// State for the static file handler
struct FileState {
    path: PathBuf,
    content_type: String,
}

/// A running streaming server
pub struct StreamServer {
    addr: SocketAddr,
    route: &'static str,
    shutdown: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl StreamServer {
    /// Bind and start serving. Port 0 picks an ephemeral port.
    pub async fn start(port: u16, source: StreamSource) -> Result<Self, ServerError> {
        let route = source.route();
        let app = match source {
            StreamSource::File { path, content_type } => Router::new().route(
                FILE_ROUTE,
                get(serve_file).with_state(Arc::new(FileState { path, content_type })),
            ),
            StreamSource::Live { chunks } => {
                Router::new().route(LIVE_ROUTE, get(serve_live).with_state(Arc::new(chunks)))
            }
        };

        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .map_err(ServerError::Bind)?;
        let addr = listener.local_addr().map_err(ServerError::Bind)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                eprintln!("Streaming server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            route,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// The address the server actually bound
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL the device should fetch, advertised with the given local IP.
    pub fn url_for(&self, host: IpAddr) -> String {
        format!("http://{}:{}{}", host, self.addr.port(), self.route)
    }

    /// Stop accepting connections and wait for the server to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Serve the configured file in one response.
///
/// Files here are short reminder clips, so reading the whole file into
/// memory keeps the handler simple and makes byte-identity trivial.
async fn serve_file(State(state): State<Arc<FileState>>) -> Response {
    match tokio::fs::read(&state.path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, state.content_type.clone())],
            Body::from(bytes),
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Stream live MP3 chunks with chunked transfer encoding.
///
/// Each subscriber gets chunks in broadcast order. A lagging subscriber
/// skips the chunks it missed and picks the stream back up. Once the
/// encoder drops its sender the channel closes and the body ends.
async fn serve_live(State(chunks): State<Arc<broadcast::Receiver<Bytes>>>) -> Response {
    let rx = chunks.resubscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(bytes) => Some(Ok::<_, std::io::Error>(bytes)),
            Err(_) => None,
        }
    });

    let body = Body::from_stream(stream);
    ([(header::CONTENT_TYPE, "audio/mpeg")], body).into_response()
}

/// Figure out which local address the device would see us on.
///
/// Connecting a UDP socket does no traffic; it just asks the kernel which
/// interface routes toward the device.
pub fn local_ip_toward(device_addr: IpAddr) -> Result<IpAddr, ServerError> {
    let socket = std::net::UdpSocket::bind(("0.0.0.0", 0)).map_err(ServerError::LocalAddress)?;
    socket
        .connect((device_addr, 1))
        .map_err(ServerError::LocalAddress)?;
    let local = socket.local_addr().map_err(ServerError::LocalAddress)?;
    Ok(local.ip())
}

/// Content type for a local audio file, by extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_by_extension() {
        assert_eq!(guess_content_type(Path::new("chime.mp3")), "audio/mpeg");
        assert_eq!(guess_content_type(Path::new("clip.FLAC")), "audio/flac");
        assert_eq!(guess_content_type(Path::new("note.m4a")), "audio/mp4");
        assert_eq!(
            guess_content_type(Path::new("mystery")),
            "application/octet-stream"
        );
    }

    #[test]
    fn source_selects_route() {
        let file = StreamSource::File {
            path: PathBuf::from("a.mp3"),
            content_type: "audio/mpeg".into(),
        };
        assert_eq!(file.route(), FILE_ROUTE);

        let (_tx, rx) = broadcast::channel::<Bytes>(8);
        let live = StreamSource::Live { chunks: rx };
        assert_eq!(live.route(), LIVE_ROUTE);
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let (_tx, rx) = broadcast::channel::<Bytes>(8);
        let server = StreamServer::start(0, StreamSource::Live { chunks: rx })
            .await
            .unwrap();
        assert_ne!(server.addr().port(), 0);
        let url = server.url_for("192.168.1.10".parse().unwrap());
        assert!(url.starts_with("http://192.168.1.10:"));
        assert!(url.ends_with(LIVE_ROUTE));
        server.shutdown().await;
    }
}
