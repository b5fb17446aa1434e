//! Program manipulation utilities for evolutionary search.
//!
//! Provides random generation, crossover, and mutation operations.

use rand::prelude::*;

use crate::compute::{INSTRUCTION_WIDTH, Program};

/// Mutation intensity at which every instruction slot is replaced.
pub const MAX_INTENSITY: f32 = 1.0;

/// Random number generator wrapper for program operations.
pub struct ProgramRng {
    rng: StdRng,
}

impl ProgramRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate `length` uniformly random bytes.
    ///
    /// No instruction-level validity is needed: every bit pattern decodes.
    pub fn random_program(&mut self, length: usize) -> Program {
        let mut bytes = vec![0u8; length];
        self.rng.fill_bytes(&mut bytes);
        Program::from_bytes(bytes)
    }

    /// Replace each instruction slot with fresh random bytes with
    /// probability `intensity`. At [`MAX_INTENSITY`] or above every slot is
    /// replaced; at zero or below nothing changes.
    pub fn mutate(&mut self, program: &mut Program, intensity: f32) {
        if intensity <= 0.0 {
            return;
        }
        let always = intensity >= MAX_INTENSITY;

        for slot in 0..program.instruction_count() {
            if always || self.rng.r#gen::<f32>() < intensity {
                self.rng.fill_bytes(program.slot_mut(slot));
            }
        }
    }

    /// Single-cut crossover.
    ///
    /// Copies `first`, picks an instruction-aligned split point below its
    /// length, and overwrites the bytes from the split up to the shorter of
    /// the two lengths with `second`'s bytes. The child is as long as the
    /// shorter parent when that lies past the split, else as long as the
    /// split itself.
    pub fn crossover(&mut self, first: &Program, second: &Program) -> Program {
        let mut child = first.clone();
        if first.is_empty() {
            return child;
        }

        let split = self.rng.gen_range(0..first.instruction_count()) * INSTRUCTION_WIDTH;
        let shared = first.len().min(second.len());

        if shared > split {
            child.splice_from(second, split, shared);
            child.truncate(shared);
        } else {
            child.truncate(split);
        }

        child
    }

    /// Uniform index in `0..len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Fraction of instruction slots that differ between two programs.
///
/// Slots beyond the shorter program count as different.
pub fn program_distance(p1: &Program, p2: &Program) -> f32 {
    let longest = p1.instruction_count().max(p2.instruction_count());
    if longest == 0 {
        return 0.0;
    }

    let same = p1
        .instructions()
        .zip(p2.instructions())
        .filter(|(a, b)| a == b)
        .count();

    (longest - same) as f32 / longest as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_program() {
        let mut rng = ProgramRng::new(42);
        let program = rng.random_program(384);
        assert_eq!(program.len(), 384);
        assert!(program.as_bytes().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = ProgramRng::new(7).random_program(96);
        let b = ProgramRng::new(7).random_program(96);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let mut rng = ProgramRng::new(42);
        let original = rng.random_program(300);
        let mut program = original.clone();
        rng.mutate(&mut program, 0.0);
        assert_eq!(program, original);
    }

    #[test]
    fn test_max_intensity_replaces_every_slot() {
        let mut rng = ProgramRng::new(42);
        let original = Program::from_bytes(vec![0u8; 3 * 200]);
        let mut program = original.clone();
        rng.mutate(&mut program, MAX_INTENSITY);

        assert_eq!(program.len(), original.len());
        // A slot redrawn as all zeros has probability 2^-24 per slot.
        assert!(program.instructions().all(|slot| slot != [0, 0, 0]));
    }

    #[test]
    fn test_partial_intensity_changes_some_slots() {
        let mut rng = ProgramRng::new(42);
        let original = Program::from_bytes(vec![0u8; 3 * 1000]);
        let mut program = original.clone();
        rng.mutate(&mut program, 0.5);

        let distance = program_distance(&program, &original);
        assert!(distance > 0.3 && distance < 0.7, "distance {distance}");
    }

    #[test]
    fn test_crossover_prefix_and_length() {
        let mut rng = ProgramRng::new(42);
        let first = Program::from_bytes(vec![1u8; 30]);
        let second = Program::from_bytes(vec![2u8; 18]);

        for _ in 0..100 {
            let child = rng.crossover(&first, &second);
            assert_eq!(child.len() % INSTRUCTION_WIDTH, 0);
            assert!(child.len() >= 18 && child.len() < first.len());

            let split = child.as_bytes().iter().position(|&b| b == 2);
            match split {
                Some(split) => {
                    assert_eq!(child.len(), 18);
                    assert!(child.as_bytes()[..split].iter().all(|&b| b == 1));
                    assert!(child.as_bytes()[split..].iter().all(|&b| b == 2));
                }
                None => assert!(child.as_bytes().iter().all(|&b| b == 1)),
            }
        }
    }

    #[test]
    fn test_crossover_empty_parent() {
        let mut rng = ProgramRng::new(1);
        let second = rng.random_program(9);
        let child = rng.crossover(&Program::default(), &second);
        assert!(child.is_empty());
    }

    #[test]
    fn test_program_distance() {
        let mut rng = ProgramRng::new(42);
        let p1 = rng.random_program(99);
        let p2 = p1.clone();
        let p3 = rng.random_program(99);

        assert!(program_distance(&p1, &p2).abs() < 1e-6);
        assert!(program_distance(&p1, &p3) > 0.0);
        assert!((program_distance(&p1, &Program::default()) - 1.0).abs() < 1e-6);
    }
}
