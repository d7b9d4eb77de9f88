//! Streaming server integration tests
//!
//! These exercise the HTTP path a speaker takes, over a real socket on an
//! ephemeral port.

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::broadcast;

use herald::infrastructure::server::{StreamServer, StreamSource, FILE_ROUTE, LIVE_ROUTE};

#[tokio::test]
async fn static_file_is_served_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chime.mp3");
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &payload).unwrap();

    let server = StreamServer::start(
        0,
        StreamSource::File {
            path,
            content_type: "audio/mpeg".to_string(),
        },
    )
    .await
    .unwrap();

    let url = format!("http://127.0.0.1:{}{}", server.addr().port(), FILE_ROUTE);
    let response = reqwest::get(&url).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "audio/mpeg"
    );

    let body = response.bytes().await.unwrap();
    assert_eq!(body.as_ref(), payload.as_slice());

    server.shutdown().await;
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let server = StreamServer::start(
        0,
        StreamSource::File {
            path: "/nonexistent/ghost.mp3".into(),
            content_type: "audio/mpeg".to_string(),
        },
    )
    .await
    .unwrap();

    let url = format!("http://127.0.0.1:{}{}", server.addr().port(), FILE_ROUTE);
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    server.shutdown().await;
}

#[tokio::test]
async fn live_stream_delivers_chunks_in_order() {
    let (chunks, live_rx) = broadcast::channel::<Bytes>(64);
    let server = StreamServer::start(0, StreamSource::Live { chunks: live_rx })
        .await
        .unwrap();

    // Subscribe before sending so nothing is missed.
    let url = format!("http://127.0.0.1:{}{}", server.addr().port(), LIVE_ROUTE);
    let response = reqwest::get(&url).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "audio/mpeg"
    );

    // Monotonic payload lets us verify ordering even if the transport
    // coalesces chunks.
    let mut sent = Vec::new();
    for i in 0..32u16 {
        let chunk: Vec<u8> = i.to_le_bytes().repeat(16);
        sent.extend_from_slice(&chunk);
        chunks.send(Bytes::from(chunk)).unwrap();
    }

    let mut received = Vec::new();
    let mut body = response.bytes_stream();
    while received.len() < sent.len() {
        match tokio::time::timeout(std::time::Duration::from_secs(5), body.next()).await {
            Ok(Some(Ok(chunk))) => received.extend_from_slice(&chunk),
            Ok(Some(Err(e))) => panic!("stream error: {e}"),
            Ok(None) => break,
            Err(_) => panic!("timed out waiting for chunks"),
        }
    }

    assert_eq!(received, sent);
    server.shutdown().await;
}

#[tokio::test]
async fn live_response_ends_when_encoder_stops() {
    let (chunks, live_rx) = broadcast::channel::<Bytes>(8);
    let server = StreamServer::start(0, StreamSource::Live { chunks: live_rx })
        .await
        .unwrap();

    let url = format!("http://127.0.0.1:{}{}", server.addr().port(), LIVE_ROUTE);
    let response = reqwest::get(&url).await.unwrap();

    chunks.send(Bytes::from_static(b"tail")).unwrap();
    // Encoder shutdown drops the only sender; the device must see
    // end-of-stream rather than a stalled connection.
    drop(chunks);

    let mut body = response.bytes_stream();
    let ended = tokio::time::timeout(std::time::Duration::from_secs(3), async {
        while let Some(chunk) = body.next().await {
            chunk.unwrap();
        }
    })
    .await;
    assert!(ended.is_ok(), "response kept streaming after producer stopped");

    server.shutdown().await;
}

#[tokio::test]
async fn lagging_client_skips_rather_than_stalls() {
    // Channel capacity 4, but 32 chunks sent before the client reads any.
    let (chunks, live_rx) = broadcast::channel::<Bytes>(4);
    let server = StreamServer::start(0, StreamSource::Live { chunks: live_rx })
        .await
        .unwrap();

    let url = format!("http://127.0.0.1:{}{}", server.addr().port(), LIVE_ROUTE);
    let response = reqwest::get(&url).await.unwrap();

    for i in 0..32u8 {
        chunks.send(Bytes::from(vec![i; 8])).unwrap();
    }
    // Nothing more is coming; the final chunk marks the tail.
    let mut body = response.bytes_stream();
    let mut last_seen = None;
    for _ in 0..64 {
        match tokio::time::timeout(std::time::Duration::from_millis(500), body.next()).await {
            Ok(Some(Ok(chunk))) => last_seen = chunk.last().copied(),
            _ => break,
        }
    }

    // The client lost the overwritten chunks but still caught up to the end.
    assert_eq!(last_seen, Some(31));
    server.shutdown().await;
}
