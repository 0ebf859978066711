use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Addressable digital I/O channel number on the remote controller (BCM numbering).
pub type PinNumber = u8;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinMode {
    #[default]
    Unconfigured,
    Output,
    Input,
}

#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pull {
    Up,
    Down,
    Off,
}

/// PWM sub-state of an output pin.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PwmState {
    pub frequency: f64,
    pub duty_cycle: f64,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PinState {
    #[serde(default)]
    pub mode: PinMode,
    #[serde(default)]
    pub value: bool,
    #[serde(default)]
    pub pwm: Option<PwmState>,
}

/// Response of `GET /pins/all`.
///
/// Both mappings always arrive complete, so the client can replace its view
/// wholesale instead of merging.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct PinsAllResponse {
    #[serde(default)]
    pub pins: HashMap<PinNumber, PinState>,
    #[serde(default)]
    pub available_pins: HashMap<PinNumber, String>,
}

/// Response of `GET /pins/predefined` (human-readable name → channel).
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct PredefinedPinsResponse {
    #[serde(default)]
    pub pins: HashMap<String, PinNumber>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MotorPinStatus {
    pub current_value: bool,
    #[serde(default)]
    pub pwm: Option<PwmState>,
}

/// Response of `GET /motor/status`.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct MotorStatusResponse {
    #[serde(default)]
    pub motor_status: HashMap<String, MotorPinStatus>,
}

/// Body of `POST /pin/configure`.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConfigurePinRequest {
    pub pin: PinNumber,
    pub mode: PinMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull: Option<Pull>,
}

/// Body of `POST /digital/write`.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DigitalWriteRequest {
    pub pin: PinNumber,
    pub value: bool,
}

/// Body of `POST /pwm/start`.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PwmStartRequest {
    pub pin: PinNumber,
    pub frequency: f64,
    pub duty_cycle: f64,
}

/// Body of `PUT /pwm/update`. Frequency is optional because updating only the
/// duty cycle must not reset the carrier.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PwmUpdateRequest {
    pub pin: PinNumber,
    pub duty_cycle: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
}

/// Body of `POST /motor/tank`. Speeds are signed percentages, −100..=100.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TankDriveRequest {
    pub left: f64,
    pub right: f64,
}

/// Body of the directional motor commands (`/motor/forward` etc.).
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DriveRequest {
    pub speed: f64,
}

/// Structured failure body the controller attaches to non-success responses.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_pins_all() {
        let json = r#"{
            "pins": {
                "18": {"mode": "output", "value": true, "pwm": {"frequency": 1000.0, "duty_cycle": 50.0}},
                "23": {"mode": "input", "value": false}
            },
            "available_pins": {"18": "GPIO18", "23": "GPIO23"}
        }"#;
        let response: PinsAllResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.pins.len(), 2);
        let pin18 = &response.pins[&18];
        assert_eq!(pin18.mode, PinMode::Output);
        assert!(pin18.value);
        assert_eq!(
            pin18.pwm,
            Some(PwmState {
                frequency: 1000.0,
                duty_cycle: 50.0
            })
        );
        assert_eq!(response.available_pins[&23], "GPIO23");
    }

    #[test]
    fn deserialize_motor_status() {
        let json = r#"{"motor_status":{"IN1":{"current_value":true}}}"#;
        let response: MotorStatusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.motor_status.len(), 1);
        assert!(response.motor_status["IN1"].current_value);
        assert_eq!(response.motor_status["IN1"].pwm, None);
    }

    #[test]
    fn pwm_update_without_frequency_omits_the_field() {
        let request = PwmUpdateRequest {
            pin: 18,
            duty_cycle: 75.0,
            frequency: None,
        };
        let json = serde_json::to_value(request).unwrap();
        assert!(json.get("frequency").is_none());
    }
}
