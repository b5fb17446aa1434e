//! Schema module - Configuration, progress and history types for program search.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
