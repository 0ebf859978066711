//! The live media session: a long-lived duplex channel that receives pushed
//! binary camera frames and textual detection metadata, and reconnects after
//! a fixed delay whenever the transport drops.

use crate::domain::find_target;
use crate::session::ControllerSession;
use crate::CommandError;
use futures::{SinkExt, StreamExt};
use pindeck_api::{ClientMessage, Detection, StreamMessage};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

/// Where the session currently stands. `Closed` flips back to `Connecting`
/// after the reconnect delay unless the owning view tore the session down.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, derive_more::Display)]
pub enum StreamState {
    #[default]
    #[display(fmt = "idle")]
    Idle,
    #[display(fmt = "connecting")]
    Connecting,
    #[display(fmt = "open")]
    Open,
    #[display(fmt = "closed")]
    Closed,
}

/// One encoded camera image. Cheap to clone; the session keeps at most one
/// current frame and drops the superseded buffer.
#[derive(Clone, Debug)]
pub struct Frame {
    bytes: Arc<[u8]>,
}

impl Frame {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Default)]
struct StreamFields {
    state: StreamState,
    detections: Vec<Detection>,
    target_objects: Vec<String>,
    auto_movement: bool,
    detection_enabled: bool,
    /// Locally configured substring the detection labels are matched against.
    target: String,
    target_found: bool,
    frame: Option<Frame>,
}

type SharedStream = Arc<RwLock<StreamFields>>;

/// Client side of the controller's live media channel.
///
/// Runs on its own task from `start` until [`Self::close`] (or drop). All
/// accessors read the latest pushed values; none of them block on network.
pub struct LiveMediaSession {
    shared: SharedStream,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LiveMediaSession {
    /// Connects to the given `ws://`/`wss://` URL and keeps the session
    /// alive, retrying after `reconnect_delay` on every loss.
    pub fn start(url: Url, reconnect_delay: Duration) -> Self {
        let shared: SharedStream = Arc::default();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_session(
            url,
            reconnect_delay,
            Arc::clone(&shared),
            outbound_rx,
            shutdown_rx,
        ));
        Self {
            shared,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
            task,
        }
    }

    pub fn state(&self) -> StreamState {
        self.shared.read().unwrap().state
    }

    /// Latest detection batch, replaced wholesale on every metadata update.
    pub fn detections(&self) -> Vec<Detection> {
        self.shared.read().unwrap().detections.clone()
    }

    pub fn target_objects(&self) -> Vec<String> {
        self.shared.read().unwrap().target_objects.clone()
    }

    pub fn auto_movement(&self) -> bool {
        self.shared.read().unwrap().auto_movement
    }

    pub fn detection_enabled(&self) -> bool {
        self.shared.read().unwrap().detection_enabled
    }

    /// Whether the configured target substring matched any label in the
    /// latest detection batch. Consulted by the auto-movement policy.
    pub fn target_found(&self) -> bool {
        self.shared.read().unwrap().target_found
    }

    pub fn latest_frame(&self) -> Option<Frame> {
        self.shared.read().unwrap().frame.clone()
    }

    /// Sets the local target substring and re-evaluates it against the
    /// current batch right away.
    pub fn set_target(&self, target: impl Into<String>) {
        let mut fields = self.shared.write().unwrap();
        fields.target = target.into();
        fields.target_found = find_target(&fields.detections, &fields.target).is_some();
    }

    /// Queues a message for the controller. Delivery is best-effort; while
    /// the channel is down, queued messages go out after the reconnect.
    pub fn send(&self, message: ClientMessage) -> Result<(), &'static str> {
        self.outbound.send(message).map_err(|_| "couldn't send")
    }

    pub fn send_control(&self, command: impl Into<String>) -> Result<(), &'static str> {
        self.send(ClientMessage::Control {
            command: command.into(),
        })
    }

    pub fn set_target_objects(&self, objects: Vec<String>) -> Result<(), &'static str> {
        self.send(ClientMessage::SetTargetObjects { params: objects })
    }

    pub fn toggle_detection(&self) -> Result<(), &'static str> {
        self.send(ClientMessage::ToggleDetection)
    }

    pub fn toggle_auto_movement(&self) -> Result<(), &'static str> {
        self.send(ClientMessage::ToggleAutoMovement)
    }

    pub fn request_status(&self) -> Result<(), &'static str> {
        self.send(ClientMessage::GetStatus)
    }

    /// Tears the session down. Cancels a pending reconnect if one is waiting;
    /// no further connection attempts happen afterwards.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for LiveMediaSession {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

impl ControllerSession {
    /// Opens the live media channel at the given path (e.g. `/ws/camera`),
    /// deriving the WebSocket URL from the current base URL.
    pub fn start_live_media(&self, path: &str) -> Result<LiveMediaSession, CommandError> {
        let mut url = self.base_url();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| CommandError::Transport("can't derive ws url from base url".into()))?;
        let url = url
            .join(path)
            .map_err(|e| CommandError::Transport(format!("invalid ws path {path}: {e}")))?;
        Ok(LiveMediaSession::start(url, self.config.reconnect_delay))
    }
}

async fn run_session(
    url: Url,
    reconnect_delay: Duration,
    shared: SharedStream,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientMessage>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        set_state(&shared, StreamState::Connecting);
        let connected = tokio::select! {
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
            _ = shutdown_rx.changed() => break,
        };
        match connected {
            Ok((socket, _)) => {
                debug!("live media channel open");
                set_state(&shared, StreamState::Open);
                let (mut sink, mut stream) = socket.split();
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            let _ = sink.close().await;
                            set_state(&shared, StreamState::Closed);
                            return;
                        }
                        queued = outbound_rx.recv() => {
                            // The sender lives in the session handle; a closed
                            // channel means the handle is gone.
                            let Some(message) = queued else {
                                let _ = sink.close().await;
                                set_state(&shared, StreamState::Closed);
                                return;
                            };
                            match serde_json::to_string(&message) {
                                Ok(json) => {
                                    if sink.send(Message::Text(json)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("couldn't serialize outbound message: {e}"),
                            }
                        }
                        incoming = stream.next() => match incoming {
                            Some(Ok(Message::Text(text))) => apply_metadata(&shared, &text),
                            Some(Ok(Message::Binary(bytes))) => apply_frame(&shared, bytes),
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("live media channel error: {e}");
                                break;
                            }
                        }
                    }
                }
                set_state(&shared, StreamState::Closed);
            }
            Err(e) => {
                warn!("live media connect failed: {e}");
                set_state(&shared, StreamState::Closed);
            }
        }
        // Fixed backoff before the next attempt; an explicit teardown in the
        // meantime cancels it.
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = shutdown_rx.changed() => break,
        }
    }
    set_state(&shared, StreamState::Closed);
}

fn set_state(shared: &SharedStream, state: StreamState) {
    shared.write().unwrap().state = state;
}

fn apply_metadata(shared: &SharedStream, text: &str) {
    let message = match serde_json::from_str::<StreamMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            // Malformed metadata is skipped, never fatal for the channel.
            warn!("unparseable live media message: {e}");
            return;
        }
    };
    match message {
        StreamMessage::Detections {
            detections,
            target_objects,
            auto_movement,
        } => {
            let mut fields = shared.write().unwrap();
            fields.detections = detections;
            fields.target_objects = target_objects;
            fields.auto_movement = auto_movement;
            fields.target_found = find_target(&fields.detections, &fields.target).is_some();
        }
        StreamMessage::Status {
            detection_enabled,
            auto_movement,
            target_objects,
        } => {
            let mut fields = shared.write().unwrap();
            fields.detection_enabled = detection_enabled;
            fields.auto_movement = auto_movement;
            fields.target_objects = target_objects;
        }
        StreamMessage::Ack { command } => debug!("controller acknowledged {command}"),
        StreamMessage::Unknown => debug!("ignoring unknown live media message"),
    }
}

fn apply_frame(shared: &SharedStream, bytes: Vec<u8>) {
    let mut fields = shared.write().unwrap();
    // Release the superseded buffer before storing the new one so a
    // long-running session doesn't accumulate frames.
    let previous = fields.frame.take();
    drop(previous);
    fields.frame = Some(Frame::new(bytes));
}
