//! Compute module - program representation and execution.

mod isa;
mod machine;
mod program;

pub mod evolution;

pub use isa::*;
pub use machine::*;
pub use program::*;
