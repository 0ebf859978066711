use serde::{Deserialize, Serialize};

/// One detected object in a camera frame.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    /// Confidence score in [0, 1].
    #[serde(default)]
    pub confidence: f64,
}

/// Text frame pushed by the controller over the live media channel.
///
/// Binary frames on the same channel are JPEG-encoded camera images and have
/// no representation here.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Latest detection batch. Replaces the previous batch completely, there
    /// is no identity tracking across frames.
    Detections {
        #[serde(default)]
        detections: Vec<Detection>,
        #[serde(default)]
        target_objects: Vec<String>,
        #[serde(default)]
        auto_movement: bool,
    },
    /// Controller-side feature flags.
    Status {
        #[serde(default)]
        detection_enabled: bool,
        #[serde(default)]
        auto_movement: bool,
        #[serde(default)]
        target_objects: Vec<String>,
    },
    /// Acknowledgement of an outbound control message.
    Ack { command: String },
    /// Message types this client doesn't know. Tolerated so a newer
    /// controller doesn't kill the session.
    #[serde(other)]
    Unknown,
}

/// Text frame sent by the client over the live media channel.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Control { command: String },
    ToggleDetection,
    SetTargetObjects { params: Vec<String> },
    ToggleAutoMovement,
    GetStatus,
}
