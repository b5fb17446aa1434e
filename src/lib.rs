//! babel-vm - Evolving bytecode programs that write plausible text.
//!
//! This crate pairs a tiny register machine with a generational search.
//! Candidate programs are executed against a fixed input, their output is
//! scored by a pluggable [`Scorer`](compute::evolution::Scorer), and the
//! population is ranked, crossed and mutated until the winner prints the
//! target text.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types for the machine and the search
//! - `compute`: Programs, the instruction set, the machine and evolution
//!
//! # Example
//!
//! ```rust
//! use babel_vm::compute::{Instruction, Machine, Opcode, assemble};
//!
//! // Register r holds r - 1 at start, so r31 + r31 + r6 = 65 ('A').
//! let program = assemble(&[
//!     Instruction::new(Opcode::Add, 1, 31, 31),
//!     Instruction::new(Opcode::Add, 1, 1, 6),
//!     Instruction::new(Opcode::Out, 1, 0, 0),
//! ]);
//!
//! let execution = Machine::default().run(&program, b"");
//! assert_eq!(execution.output, b"A");
//! assert!(!execution.crashed);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{BigramScorer, EvolutionEngine, Scorer};
pub use compute::{Individual, Machine, Program};
pub use schema::{SearchConfig, VmConfig};
