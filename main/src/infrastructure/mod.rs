mod config;
mod tracing_util;

pub use config::*;
pub use tracing_util::*;
