mod error;
mod target;

pub use error::*;
pub use target::*;
