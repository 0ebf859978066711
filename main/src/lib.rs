//! Client session runtime for a remotely hosted GPIO/motor controller.
//!
//! The controller itself (GPIO driver, PWM generator, motor H-bridge, object
//! detection) runs elsewhere and is reached purely over HTTP and WebSocket.
//! This crate owns the client side of that conversation:
//!
//! - a [state mirror](session::ControllerSession) that keeps an
//!   eventually-consistent snapshot of remote pin/motor state via polling,
//! - a command dispatcher that turns user intents into exactly one request
//!   each and re-syncs the mirror afterwards,
//! - a [live media session](session::LiveMediaSession) that receives pushed
//!   camera frames and detection metadata and reconnects on loss.

mod domain;
mod infrastructure;
pub mod session;

pub use domain::*;
pub use infrastructure::*;
