//! Configuration types for the bytecode machine.

use serde::{Deserialize, Serialize};

/// Execution limits and buffer growth for the virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// Maximum decode steps per execution before forced termination.
    #[serde(default = "default_cycle_budget")]
    pub cycle_budget: u64,
    /// Bytes added to the output buffer each time it fills up.
    #[serde(default = "default_chunk")]
    pub output_chunk: usize,
    /// Cells added to the memory array each time a write lands past its end.
    #[serde(default = "default_chunk")]
    pub memory_chunk: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            cycle_budget: default_cycle_budget(),
            output_chunk: default_chunk(),
            memory_chunk: default_chunk(),
        }
    }
}

fn default_cycle_budget() -> u64 {
    100_000
}
fn default_chunk() -> usize {
    128
}

impl VmConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_budget == 0 {
            return Err(ConfigError::InvalidCycleBudget);
        }
        if self.output_chunk == 0 {
            return Err(ConfigError::InvalidChunk("output"));
        }
        if self.memory_chunk == 0 {
            return Err(ConfigError::InvalidChunk("memory"));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cycle budget must be non-zero")]
    InvalidCycleBudget,
    #[error("The {0} growth chunk must be non-zero")]
    InvalidChunk(&'static str),
}
