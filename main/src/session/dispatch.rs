//! The command dispatcher: exactly one side-effecting request per user
//! action, with consistent error surfacing. Every domain command re-syncs
//! the relevant mirror on success so the visible state is the authoritative
//! post-command state, not an optimistic local guess.

use crate::session::{ConnectionStatus, ControllerSession, LiveMediaSession};
use crate::CommandError;
use pindeck_api::{
    ConfigurePinRequest, DigitalWriteRequest, DriveRequest, ErrorResponse, PinNumber, PwmState,
    PwmStartRequest, PwmUpdateRequest, TankDriveRequest,
};
use reqwest::Method;
use serde::Serialize;
use tracing::debug;

/// Carrier frequency used when starting a PWM session without an explicit one.
pub const DEFAULT_PWM_FREQUENCY: f64 = 1000.0;

/// Speed used by directional drive commands when the caller doesn't care.
pub const DEFAULT_DRIVE_SPEED: f64 = 50.0;

impl ControllerSession {
    /// Sends one request against the controller.
    ///
    /// Success doubles as a liveness signal and flips the status badge to
    /// `connected`. Failures are classified as transport (no response),
    /// rejection (non-success status, message extracted from the structured
    /// error body when possible) or parse.
    pub async fn issue_command<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), CommandError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        debug!("issuing {method} {url}");
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CommandError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.detail,
                Err(_) => format!("command failed with status {status}"),
            };
            return Err(CommandError::Rejected { status, message });
        }
        self.set_status(ConnectionStatus::Connected);
        Ok(())
    }

    async fn post(&self, path: &str) -> Result<(), CommandError> {
        self.issue_command::<()>(Method::POST, path, None).await
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), CommandError> {
        self.issue_command(Method::POST, path, Some(body)).await
    }

    async fn put_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), CommandError> {
        self.issue_command(Method::PUT, path, Some(body)).await
    }

    /// Explicit liveness probe with a hard abort timeout. Tries `/status`
    /// first, falls back to `/` for controllers that only answer the root.
    pub async fn probe(&self) -> Result<(), CommandError> {
        self.set_status(ConnectionStatus::Connecting);
        let result = match self.probe_once("/status").await {
            Err(CommandError::Rejected { .. }) => self.probe_once("/").await,
            other => other,
        };
        match result {
            Ok(()) => {
                self.set_status(ConnectionStatus::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_status(ConnectionStatus::Error);
                Err(e)
            }
        }
    }

    async fn probe_once(&self, path: &str) -> Result<(), CommandError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| CommandError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CommandError::Rejected {
                status,
                message: format!("probe failed with status {status}"),
            });
        }
        Ok(())
    }

    /// Probes the controller and fills the mirror for the first time.
    pub async fn connect(&self) -> Result<(), CommandError> {
        self.probe().await?;
        self.refresh_predefined_pins().await;
        self.refresh_pins().await;
        self.refresh_motors().await;
        Ok(())
    }

    // --- Pin commands ---

    pub async fn configure_pin(&self, request: &ConfigurePinRequest) -> Result<(), CommandError> {
        self.post_json("/pin/configure", request).await?;
        self.refresh_pins().await;
        Ok(())
    }

    pub async fn write_digital(&self, pin: PinNumber, value: bool) -> Result<(), CommandError> {
        self.post_json("/digital/write", &DigitalWriteRequest { pin, value })
            .await?;
        self.refresh_pins().await;
        Ok(())
    }

    pub async fn set_high(&self, pin: PinNumber) -> Result<(), CommandError> {
        self.post(&format!("/digital/high/{pin}")).await?;
        self.refresh_pins().await;
        Ok(())
    }

    pub async fn set_low(&self, pin: PinNumber) -> Result<(), CommandError> {
        self.post(&format!("/digital/low/{pin}")).await?;
        self.refresh_pins().await;
        Ok(())
    }

    pub async fn set_predefined_level(&self, name: &str, high: bool) -> Result<(), CommandError> {
        let level = if high { "high" } else { "low" };
        self.post(&format!("/pins/predefined/{name}/{level}"))
            .await?;
        self.refresh_pins().await;
        Ok(())
    }

    /// Reads the pin's current level from the mirror and writes its negation.
    /// Returns the requested new level.
    ///
    /// Toggles on the same pin from this session are serialized through a
    /// single-flight lock, so two quick toggles resolve sequentially and end
    /// up back at the original level. Toggles racing from *other* sessions
    /// remain unsynchronized.
    pub async fn toggle_pin(&self, pin: PinNumber) -> Result<bool, CommandError> {
        let lock = self.toggle_lock(pin);
        let _guard = lock.lock().await;
        let current = self.pin_level(pin).unwrap_or(false);
        let new = !current;
        self.write_digital(pin, new).await?;
        Ok(new)
    }

    // --- PWM commands ---

    /// Starts or updates PWM on a pin, deciding from the mirrored sub-state.
    ///
    /// The mirror can be stale by up to one polling interval, so this can
    /// issue a start against an already running session; accepted limitation.
    pub async fn set_pwm(
        &self,
        pin: PinNumber,
        duty_cycle: f64,
        frequency: Option<f64>,
    ) -> Result<(), CommandError> {
        let existing = self.pin_pwm(pin);
        match PwmDispatch::decide(existing.as_ref(), frequency) {
            PwmDispatch::Start { frequency } => {
                self.post_json(
                    "/pwm/start",
                    &PwmStartRequest {
                        pin,
                        frequency,
                        duty_cycle,
                    },
                )
                .await?;
            }
            PwmDispatch::Update => {
                self.put_json(
                    "/pwm/update",
                    &PwmUpdateRequest {
                        pin,
                        duty_cycle,
                        frequency,
                    },
                )
                .await?;
            }
        }
        self.refresh_pins().await;
        Ok(())
    }

    pub async fn stop_pwm(&self, pin: PinNumber) -> Result<(), CommandError> {
        self.post(&format!("/pwm/stop/{pin}")).await?;
        self.refresh_pins().await;
        Ok(())
    }

    /// Releases all pin configuration on the controller.
    pub async fn cleanup_pins(&self) -> Result<(), CommandError> {
        self.post("/pins/cleanup").await?;
        self.refresh_pins().await;
        Ok(())
    }

    // --- Motor commands ---

    /// Tank drive with independent signed side speeds, clamped to −100..=100.
    pub async fn drive_tank(&self, left: f64, right: f64) -> Result<(), CommandError> {
        let request = TankDriveRequest {
            left: left.clamp(-100.0, 100.0),
            right: right.clamp(-100.0, 100.0),
        };
        self.post_json("/motor/tank", &request).await?;
        self.refresh_motors().await;
        Ok(())
    }

    /// Directional drive, speed clamped to 0..=100.
    pub async fn drive(&self, direction: Direction, speed: f64) -> Result<(), CommandError> {
        let request = DriveRequest {
            speed: speed.clamp(0.0, 100.0),
        };
        self.post_json(direction.path(), &request).await?;
        self.refresh_motors().await;
        Ok(())
    }

    pub async fn stop_motors(&self) -> Result<(), CommandError> {
        self.post("/motor/stop").await?;
        self.refresh_motors().await;
        Ok(())
    }

    /// Auto-movement policy gate: drives forward only while the live media
    /// session currently sees the configured target object. Refuses without
    /// issuing a request otherwise.
    pub async fn forward_if_target_visible(
        &self,
        live: &LiveMediaSession,
        speed: f64,
    ) -> Result<(), CommandError> {
        if !live.target_found() {
            return Err(CommandError::TargetNotVisible);
        }
        self.drive(Direction::Forward, speed).await
    }
}

/// Directional motor commands the controller understands.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    /// Pivot in place, only one side driven.
    SpinLeft,
    SpinRight,
}

impl Direction {
    fn path(self) -> &'static str {
        use Direction::*;
        match self {
            Forward => "/motor/forward",
            Backward => "/motor/backward",
            Left => "/motor/left",
            Right => "/motor/right",
            SpinLeft => "/motor/spin-left",
            SpinRight => "/motor/spin-right",
        }
    }
}

/// Which PWM request a `set_pwm` call must translate to.
///
/// Start and update are different operations server-side (a second start
/// would error or reset phase), so the client decides from its own mirror.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum PwmDispatch {
    Start { frequency: f64 },
    Update,
}

impl PwmDispatch {
    pub fn decide(existing: Option<&PwmState>, requested_frequency: Option<f64>) -> Self {
        match existing {
            None => PwmDispatch::Start {
                frequency: requested_frequency.unwrap_or(DEFAULT_PWM_FREQUENCY),
            },
            Some(_) => PwmDispatch::Update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pwm_without_sub_state_starts_with_default_frequency() {
        let dispatch = PwmDispatch::decide(None, None);
        assert_eq!(
            dispatch,
            PwmDispatch::Start {
                frequency: DEFAULT_PWM_FREQUENCY
            }
        );
    }

    #[test]
    fn pwm_without_sub_state_honors_requested_frequency() {
        let dispatch = PwmDispatch::decide(None, Some(440.0));
        assert_eq!(dispatch, PwmDispatch::Start { frequency: 440.0 });
    }

    #[test]
    fn pwm_with_sub_state_updates_instead_of_starting_again() {
        let existing = PwmState {
            frequency: 1000.0,
            duty_cycle: 30.0,
        };
        let dispatch = PwmDispatch::decide(Some(&existing), None);
        assert_eq!(dispatch, PwmDispatch::Update);
        // Even an explicit frequency must not restart the session.
        let dispatch = PwmDispatch::decide(Some(&existing), Some(2000.0));
        assert_eq!(dispatch, PwmDispatch::Update);
    }
}
