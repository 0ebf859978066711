//! The state mirror: best-effort, eventually-consistent snapshots of remote
//! pin and motor state, refreshed by polling.

use crate::session::{ConnectionStatus, ControllerSession};
use crate::CommandError;
use pindeck_api::{ErrorResponse, MotorStatusResponse, PinsAllResponse, PredefinedPinsResponse};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

impl ControllerSession {
    /// Reads the full pin + available-pin mapping and replaces the local one.
    ///
    /// Failures are never fatal: they are logged, the previous snapshot stays
    /// visible (stale-but-available) and the status badge flips to `error`.
    pub async fn refresh_pins(&self) {
        match self.fetch_json::<PinsAllResponse>("/pins/all").await {
            Ok(response) => self.replace_pins(response.pins, response.available_pins),
            Err(e) => {
                warn!("pin refresh failed: {e}");
                self.set_status(ConnectionStatus::Error);
            }
        }
    }

    /// Same contract as [`Self::refresh_pins`], scoped to motor status.
    pub async fn refresh_motors(&self) {
        match self.fetch_json::<MotorStatusResponse>("/motor/status").await {
            Ok(response) => self.replace_motor_status(response.motor_status),
            Err(e) => {
                warn!("motor refresh failed: {e}");
                self.set_status(ConnectionStatus::Error);
            }
        }
    }

    /// Loads the name → pin mapping. Sourced once after connecting; the
    /// mapping is read-only from the client's perspective.
    pub async fn refresh_predefined_pins(&self) {
        match self
            .fetch_json::<PredefinedPinsResponse>("/pins/predefined")
            .await
        {
            Ok(response) => self.replace_predefined_pins(response.pins),
            Err(e) => warn!("predefined pin refresh failed: {e}"),
        }
    }

    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, CommandError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CommandError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.detail,
                Err(_) => format!("request failed with status {status}"),
            };
            return Err(CommandError::Rejected { status, message });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| CommandError::Parse(e.to_string()))
    }

    /// Starts the repeating refresh timer. Refreshes run only while the
    /// status is `connected` so a downed link doesn't turn into a retry
    /// storm. The timer dies with the returned handle.
    pub fn spawn_polling(self: &Arc<Self>) -> PollingHandle {
        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(session.config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if session.status() != ConnectionStatus::Connected {
                    debug!("skipping refresh, not connected");
                    continue;
                }
                session.refresh_pins().await;
                session.refresh_motors().await;
            }
        });
        PollingHandle { task }
    }
}

/// Owns the polling timer. Dropping (or stopping) it cancels the timer;
/// refreshes already in flight are left to resolve.
pub struct PollingHandle {
    task: JoinHandle<()>,
}

impl PollingHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
