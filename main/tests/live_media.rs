//! Integration tests for the live media session, run against an in-process
//! WebSocket endpoint standing in for the controller's camera stream.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use pindeck::session::{LiveMediaSession, StreamState};
use pindeck_api::ClientMessage;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

const RECONNECT_DELAY: Duration = Duration::from_millis(100);

#[derive(Default)]
struct FakeStream {
    connections: AtomicUsize,
    received: Mutex<Vec<String>>,
    /// What the handler does with an accepted socket.
    behavior: Behavior,
}

#[derive(Default, Copy, Clone, PartialEq, Eq)]
enum Behavior {
    /// Push one metadata message and one binary frame, then stay open.
    #[default]
    Push,
    /// Drop the socket right away.
    DropImmediately,
    /// Read inbound messages and record them.
    Record,
}

async fn start_stream_server(state: Arc<FakeStream>) -> Url {
    let app = Router::new()
        .route("/ws/camera", get(ws_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/ws/camera").parse().unwrap()
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<FakeStream>>,
) -> axum::response::Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<FakeStream>) {
    state.connections.fetch_add(1, Ordering::SeqCst);
    match state.behavior {
        Behavior::DropImmediately => {}
        Behavior::Push => {
            let metadata = json!({
                "type": "detections",
                "detections": [
                    {"class": "car", "confidence": 0.92},
                    {"class": "person", "confidence": 0.81}
                ],
                "target_objects": ["person"],
                "auto_movement": false
            });
            let _ = socket.send(Message::Text(metadata.to_string())).await;
            let _ = socket.send(Message::Binary(vec![0xFF, 0xD8, 0xFF])).await;
            // Keep the connection open until the client goes away.
            while let Some(Ok(_)) = socket.recv().await {}
        }
        Behavior::Record => {
            while let Some(Ok(message)) = socket.recv().await {
                if let Message::Text(text) = message {
                    state.received.lock().unwrap().push(text);
                }
            }
        }
    }
}

#[tokio::test]
async fn receives_metadata_and_frames() {
    let state = Arc::new(FakeStream::default());
    let url = start_stream_server(Arc::clone(&state)).await;
    let session = LiveMediaSession::start(url, RECONNECT_DELAY);
    session.set_target("per");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(session.state(), StreamState::Open);
    let detections = session.detections();
    assert_eq!(detections.len(), 2);
    assert_eq!(detections[1].class, "person");
    assert_eq!(session.target_objects(), vec!["person"]);
    assert!(session.target_found());
    let frame = session.latest_frame().expect("no frame received");
    assert_eq!(frame.as_bytes(), &[0xFF, 0xD8, 0xFF]);
    // Changing the target re-evaluates the current batch immediately.
    session.set_target("zzz");
    assert!(!session.target_found());
    session.close();
}

#[tokio::test]
async fn reconnects_after_loss_until_torn_down() {
    let state = Arc::new(FakeStream {
        behavior: Behavior::DropImmediately,
        ..Default::default()
    });
    let url = start_stream_server(Arc::clone(&state)).await;
    let session = LiveMediaSession::start(url, RECONNECT_DELAY);
    // Every drop must be followed by a reconnect after the fixed delay.
    sleep(Duration::from_millis(350)).await;
    assert!(state.connections.load(Ordering::SeqCst) >= 2);
    // Teardown stops the cycle for good.
    session.close();
    sleep(Duration::from_millis(50)).await;
    let after_close = state.connections.load(Ordering::SeqCst);
    sleep(Duration::from_millis(300)).await;
    assert_eq!(state.connections.load(Ordering::SeqCst), after_close);
    assert_eq!(session.state(), StreamState::Closed);
}

#[tokio::test]
async fn teardown_cancels_pending_retry() {
    let state = Arc::new(FakeStream {
        behavior: Behavior::DropImmediately,
        ..Default::default()
    });
    let url = start_stream_server(Arc::clone(&state)).await;
    let session = LiveMediaSession::start(url, Duration::from_millis(300));
    // Let exactly one attempt happen, then tear down inside the backoff.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(state.connections.load(Ordering::SeqCst), 1);
    session.close();
    sleep(Duration::from_millis(500)).await;
    assert_eq!(state.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn outbound_messages_reach_the_controller() {
    let state = Arc::new(FakeStream {
        behavior: Behavior::Record,
        ..Default::default()
    });
    let url = start_stream_server(Arc::clone(&state)).await;
    let session = LiveMediaSession::start(url, RECONNECT_DELAY);
    sleep(Duration::from_millis(100)).await;
    session
        .set_target_objects(vec!["person".to_owned()])
        .unwrap();
    session.send(ClientMessage::GetStatus).unwrap();
    sleep(Duration::from_millis(200)).await;
    let received = state.received.lock().unwrap().clone();
    assert_eq!(received.len(), 2);
    let first: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(first["type"], "set_target_objects");
    assert_eq!(first["params"][0], "person");
    let second: serde_json::Value = serde_json::from_str(&received[1]).unwrap();
    assert_eq!(second["type"], "get_status");
    session.close();
}
