//! Evolutionary search for programs whose output reads like language.
//!
//! # Overview
//!
//! The search system consists of:
//!
//! - **Fitness** (`fitness`): the [`Scorer`] seam and a bigram reference scorer
//! - **Genome Operations** (`genome`): random programs, mutation and crossover
//! - **Population** (`population`): ranking, shaking and reproduction
//! - **Controller** (`controller`): plateau and stall detection
//! - **Search** (`search`): the generational driver
//!
//! # Example
//!
//! ```rust,no_run
//! use babel_vm::schema::SearchConfig;
//! use babel_vm::compute::evolution::{BigramScorer, EvolutionEngine};
//!
//! let scorer = BigramScorer::from_path("corpus.txt").unwrap();
//! let config = SearchConfig {
//!     target: b"hello".to_vec(),
//!     ..Default::default()
//! };
//!
//! let mut engine = EvolutionEngine::new(config, scorer).unwrap();
//! let mut controller = engine.stagnation_controller();
//! let result = engine.run_with_callback(&mut controller, |progress| {
//!     println!("Generation {}: best score = {} {:?}",
//!         progress.generation, progress.best_score, progress.best_output);
//! });
//!
//! println!("Best output: {:?}", result.text());
//! ```

mod controller;
mod fitness;
mod genome;
mod population;
mod search;

pub use controller::{
    Controller, ControllerState, StagnationController, Verdict, WinnerSummary,
};
pub use fitness::{BigramScorer, Scorer, ScorerError};
pub use genome::{MAX_INTENSITY, ProgramRng, program_distance};
pub use population::Population;
pub use search::{EvolutionEngine, SearchResult, SearchStats};
