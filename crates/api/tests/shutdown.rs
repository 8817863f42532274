//! Graceful shutdown with live subscriptions open, served on a real socket.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{submit, TestApp};
use review_api::shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Send a raw HTTP/1.1 GET and read until the response head arrives.
async fn open_stream(addr: std::net::SocketAddr, path: &str) -> (TcpStream, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nAccept: text/event-stream\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before response head");
        head.extend_from_slice(&buf[..n]);
    }
    (stream, String::from_utf8_lossy(&head).into_owned())
}

#[tokio::test]
async fn shutdown_closes_open_streams_and_stops_server() {
    let app = TestApp::new().await;
    let id = submit(&app).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (trigger, signal) = oneshot::channel::<()>();
    let coordinator = Arc::clone(&app.state.coordinator);
    let router = app.router.clone();
    let server = tokio::spawn(async move {
        let signal = async move {
            let _ = signal.await;
        };
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown::graceful(signal, coordinator))
            .await
    });

    let (mut stream, head) = open_stream(addr, &format!("/api/v1/result/subscribe/{id}")).await;
    assert!(head.starts_with("HTTP/1.1 200 OK"), "unexpected head: {head}");
    app.wait_for_subscriber(id).await;

    trigger.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(3), server)
        .await
        .expect("server should stop within 3s")
        .unwrap()
        .unwrap();
    assert_eq!(app.pending_subscriptions(), 0);

    // The stream ends without any event frame.
    let mut rest = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(1), stream.read_to_end(&mut rest)).await;
    assert!(!String::from_utf8_lossy(&rest).contains("event:"));
}

#[tokio::test]
async fn subscribe_after_shutdown_began_ends_at_once() {
    let app = TestApp::new().await;
    let id = submit(&app).await;
    app.state.coordinator.close_subscriptions();

    let response = tokio::time::timeout(
        Duration::from_secs(3),
        app.get(&format!("/api/v1/result/subscribe/{id}")),
    )
    .await
    .unwrap();

    let body = tokio::time::timeout(Duration::from_secs(3), common::body_text(response))
        .await
        .expect("stream should end immediately");
    assert!(common::parse_sse(&body).is_empty());
}
