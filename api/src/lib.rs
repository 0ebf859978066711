//! Wire types for the remote GPIO/motor controller.
//!
//! Everything in here is plain data with serde derives, shaped exactly like
//! the JSON the controller speaks. No I/O happens in this crate.

mod http;
mod ws;

pub use http::*;
pub use ws::*;
