//! The client synchronization session.
//!
//! One [`ControllerSession`] per remote controller. It owns every piece of
//! mutable client-side state (pin/motor mirrors, connection status), so there
//! are no ambient globals; callers get handed the session.

mod dispatch;
mod mirror;
mod stream;

pub use dispatch::*;
pub use stream::*;

use crate::{CommandError, Config};
use pindeck_api::{MotorPinStatus, PinNumber, PinState, PwmState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use url::Url;

/// Outcome of the most recent request, in badge form. Not persisted.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, derive_more::Display)]
pub enum ConnectionStatus {
    #[default]
    #[display(fmt = "disconnected")]
    Disconnected,
    #[display(fmt = "connecting")]
    Connecting,
    #[display(fmt = "connected")]
    Connected,
    #[display(fmt = "error")]
    Error,
}

/// Last-known view of the remote pin/motor configuration.
///
/// Mappings in here are only ever replaced wholesale by a refresh, never
/// patched, so the client can't diverge structurally from the server (it can
/// only be stale, by up to one polling interval).
#[derive(Clone, Debug, Default)]
pub struct MirrorState {
    pub pins: HashMap<PinNumber, PinState>,
    pub available_pins: HashMap<PinNumber, String>,
    pub predefined_pins: HashMap<String, PinNumber>,
    pub motor_status: HashMap<String, MotorPinStatus>,
}

/// Client session for one remote GPIO/motor controller.
pub struct ControllerSession {
    pub(crate) http: reqwest::Client,
    pub(crate) config: Config,
    // Runtime-editable, hence behind its own lock.
    base_url: RwLock<Url>,
    // We don't take the async RwLock by Tokio because we need to access this
    // in sync code (status badges, snapshots for rendering), too.
    state: RwLock<MirrorState>,
    status: RwLock<ConnectionStatus>,
    // Single-flight locks serializing read-then-write toggles per pin.
    toggle_locks: Mutex<HashMap<PinNumber, Arc<tokio::sync::Mutex<()>>>>,
}

impl ControllerSession {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: RwLock::new(config.base_url.clone()),
            config,
            state: RwLock::new(MirrorState::default()),
            status: RwLock::new(ConnectionStatus::default()),
            toggle_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read().unwrap()
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        *self.status.write().unwrap() = status;
    }

    pub fn base_url(&self) -> Url {
        self.base_url.read().unwrap().clone()
    }

    /// Points the session at a different controller. Takes effect for every
    /// request issued afterwards; in-flight requests keep their old target.
    pub fn set_base_url(&self, base_url: Url) {
        *self.base_url.write().unwrap() = base_url;
    }

    /// Snapshot of the complete mirror. Cloned out so the lock is held only
    /// briefly and never across rendering.
    pub fn mirror(&self) -> MirrorState {
        self.state.read().unwrap().clone()
    }

    pub fn pin_level(&self, pin: PinNumber) -> Option<bool> {
        self.state.read().unwrap().pins.get(&pin).map(|p| p.value)
    }

    pub fn pin_pwm(&self, pin: PinNumber) -> Option<PwmState> {
        self.state
            .read()
            .unwrap()
            .pins
            .get(&pin)
            .and_then(|p| p.pwm)
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, CommandError> {
        self.base_url
            .read()
            .unwrap()
            .join(path)
            .map_err(|e| CommandError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    pub(crate) fn replace_pins(
        &self,
        pins: HashMap<PinNumber, PinState>,
        available_pins: HashMap<PinNumber, String>,
    ) {
        // One write lock for both mappings so no reader ever observes a
        // half-updated snapshot.
        let mut state = self.state.write().unwrap();
        state.pins = pins;
        state.available_pins = available_pins;
    }

    pub(crate) fn replace_motor_status(&self, motor_status: HashMap<String, MotorPinStatus>) {
        self.state.write().unwrap().motor_status = motor_status;
    }

    pub(crate) fn replace_predefined_pins(&self, predefined_pins: HashMap<String, PinNumber>) {
        self.state.write().unwrap().predefined_pins = predefined_pins;
    }

    pub(crate) fn toggle_lock(&self, pin: PinNumber) -> Arc<tokio::sync::Mutex<()>> {
        self.toggle_locks
            .lock()
            .unwrap()
            .entry(pin)
            .or_default()
            .clone()
    }
}
