//! Search configuration types for evolving text-emitting programs.
//!
//! This module provides the configuration records for a generational search
//! run (population shape, stagnation thresholds, VM limits) together with the
//! progress and history types reported while the search runs.

use serde::{Deserialize, Serialize};

use super::{ConfigError, VmConfig};

/// Top-level configuration for one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Bytes the evolved program should emit. Compared byte-exactly.
    #[serde(with = "byte_text")]
    pub target: Vec<u8>,
    /// Input bytes fed to every program through the `in` instruction.
    #[serde(default, with = "byte_text")]
    pub input: Vec<u8>,
    /// Virtual machine limits.
    #[serde(default)]
    pub vm: VmConfig,
    /// Population and reproduction settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Stagnation detection thresholds.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target: b"stars are made of weird stuff".to_vec(),
            input: Vec::new(),
            vm: VmConfig::default(),
            population: PopulationConfig::default(),
            controller: ControllerConfig::default(),
            random_seed: None,
        }
    }
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in the population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Length in bytes of freshly generated programs (multiple of 3).
    #[serde(default = "default_program_length")]
    pub program_length: usize,
    /// Per-slot mutation probability reached by the last preserved rank.
    /// Rank 0 is never mutated; intensity grows linearly with rank.
    #[serde(default = "default_elite_mutation")]
    pub elite_mutation: f32,
    /// Optional generation budget. The search itself never gives up.
    #[serde(default)]
    pub max_generations: Option<u64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            program_length: default_program_length(),
            elite_mutation: default_elite_mutation(),
            max_generations: None,
        }
    }
}

fn default_population_size() -> usize {
    128
}
fn default_program_length() -> usize {
    128 * 3
}
fn default_elite_mutation() -> f32 {
    0.1
}

/// Stagnation thresholds for the convergence controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Generations with an unchanged winning score before a shake.
    #[serde(default = "default_plateau_threshold")]
    pub plateau_threshold: u64,
    /// Generations between forced shakes, whatever the score does.
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            plateau_threshold: default_plateau_threshold(),
            stall_threshold: default_stall_threshold(),
        }
    }
}

fn default_plateau_threshold() -> u64 {
    4_000
}
fn default_stall_threshold() -> u64 {
    40_000
}

/// Byte strings in JSON: a string when the bytes are UTF-8, otherwise an
/// array of byte values. Either form is accepted on input.
mod byte_text {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Bytes(Vec<u8>),
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(bytes) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.serialize_bytes(bytes),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) => text.into_bytes(),
            Repr::Bytes(bytes) => bytes,
        })
    }
}

// ============================================================================
// Progress and History Types
// ============================================================================

/// Progress update handed to callbacks once per generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generation index (0-based).
    pub generation: u64,
    /// Winning score of this generation.
    pub best_score: i64,
    /// Average score of the scored individuals this generation.
    pub avg_score: f64,
    /// Output of the winner, decoded lossily as UTF-8.
    pub best_output: String,
    /// Program length of the winner in bytes.
    pub best_program_length: usize,
    /// Number of shakes applied so far.
    pub shakes: u64,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best score per generation.
    pub best_score: Vec<i64>,
    /// Average score per generation.
    pub avg_score: Vec<f64>,
    /// Generations at which a shake fired.
    pub shakes: Vec<u64>,
}

/// Reason the search stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The winner emitted the target text.
    TargetReached,
    /// The controller declared the search finished for another reason.
    ControllerDone,
    /// Reached the configured generation budget.
    MaxGenerations,
}

// ============================================================================
// Validation
// ============================================================================

/// Search configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchConfigError {
    #[error("Population size must be at least 4, got {0}")]
    PopulationTooSmall(usize),
    #[error("Program length {0} must be a non-zero multiple of 3")]
    InvalidProgramLength(usize),
    #[error("Elite mutation must be within [0, 1], got {0}")]
    InvalidMutation(f32),
    #[error("Target text must not be empty")]
    EmptyTarget,
    #[error("Thresholds must be non-zero")]
    InvalidThreshold,
    #[error("VM config validation failed: {0}")]
    VmConfigError(#[from] ConfigError),
}

impl SearchConfig {
    /// Validate search configuration.
    pub fn validate(&self) -> Result<(), SearchConfigError> {
        self.vm.validate()?;

        if self.population.size < 4 {
            return Err(SearchConfigError::PopulationTooSmall(self.population.size));
        }

        let length = self.population.program_length;
        if length == 0 || length % 3 != 0 {
            return Err(SearchConfigError::InvalidProgramLength(length));
        }

        if !(0.0..=1.0).contains(&self.population.elite_mutation) {
            return Err(SearchConfigError::InvalidMutation(
                self.population.elite_mutation,
            ));
        }

        if self.target.is_empty() {
            return Err(SearchConfigError::EmptyTarget);
        }

        if self.controller.plateau_threshold == 0 || self.controller.stall_threshold == 0 {
            return Err(SearchConfigError::InvalidThreshold);
        }

        Ok(())
    }
}
