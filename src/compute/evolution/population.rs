//! Fixed-size population of candidate programs.

use crate::compute::{Individual, Program};

use super::genome::{MAX_INTENSITY, ProgramRng, program_distance};

/// An ordered collection of individuals evolved together.
///
/// Order carries no meaning until [`Population::rank`] runs; afterwards
/// index 0 holds the generation's winner.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    /// `size` individuals with uniformly random programs.
    pub fn random(size: usize, program_length: usize, rng: &mut ProgramRng) -> Self {
        let individuals = (0..size)
            .map(|_| Individual::new(rng.random_program(program_length)))
            .collect();
        Self { individuals }
    }

    /// Seed the population with known programs and fill the remaining
    /// slots randomly. Extra programs beyond `size` are dropped.
    pub fn from_programs(
        programs: impl IntoIterator<Item = Program>,
        size: usize,
        program_length: usize,
        rng: &mut ProgramRng,
    ) -> Self {
        let mut individuals: Vec<Individual> = programs
            .into_iter()
            .take(size)
            .map(Individual::new)
            .collect();
        while individuals.len() < size {
            individuals.push(Individual::new(rng.random_program(program_length)));
        }
        Self { individuals }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individuals_mut(&mut self) -> &mut [Individual] {
        &mut self.individuals
    }

    /// Stable sort by score, highest first.
    pub fn rank(&mut self) {
        self.individuals.sort_by(|a, b| b.score.cmp(&a.score));
    }

    /// The individual at rank 0. Meaningful after [`Population::rank`].
    pub fn winner(&self) -> Option<&Individual> {
        self.individuals.first()
    }

    /// Replace every instruction of every individual.
    pub fn shake(&mut self, rng: &mut ProgramRng) {
        for individual in &mut self.individuals {
            rng.mutate(&mut individual.program, MAX_INTENSITY);
        }
    }

    /// Produce the next generation in place. Call after ranking.
    ///
    /// The better half is kept and mutated with an intensity that grows
    /// linearly with rank, reaching `elite_mutation` at the end of the half;
    /// rank 0 is left untouched. Every slot of the worse half is replaced by
    /// the crossover of two distinct donors drawn from the whole population,
    /// neither of them the slot being written.
    pub fn cross(&mut self, rng: &mut ProgramRng, elite_mutation: f32) {
        let size = self.individuals.len();
        let half = size / 2;

        for (rank, individual) in self.individuals[..half].iter_mut().enumerate().skip(1) {
            let intensity = elite_mutation * rank as f32 / half as f32;
            rng.mutate(&mut individual.program, intensity);
        }

        // Two distinct donors besides the slot itself.
        if size < 3 {
            return;
        }

        for slot in half..size {
            let first = pick_donor(rng, size, &[slot]);
            let second = pick_donor(rng, size, &[slot, first]);
            let child = rng.crossover(
                &self.individuals[first].program,
                &self.individuals[second].program,
            );
            self.individuals[slot] = Individual::new(child);
        }
    }

    /// Mean of the non-negative scores, or 0 when nothing is scored.
    pub fn average_score(&self) -> f64 {
        let (sum, count) = self
            .individuals
            .iter()
            .filter(|i| i.is_scored())
            .fold((0.0f64, 0usize), |(sum, count), i| {
                (sum + i.score as f64, count + 1)
            });
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    /// Mean program distance of every individual to the winner.
    pub fn diversity(&self) -> f32 {
        let Some(winner) = self.individuals.first() else {
            return 0.0;
        };
        if self.individuals.len() < 2 {
            return 0.0;
        }

        let total: f32 = self.individuals[1..]
            .iter()
            .map(|i| program_distance(&winner.program, &i.program))
            .sum();
        total / (self.individuals.len() - 1) as f32
    }
}

fn pick_donor(rng: &mut ProgramRng, size: usize, exclude: &[usize]) -> usize {
    loop {
        let candidate = rng.index(size);
        if !exclude.contains(&candidate) {
            return candidate;
        }
    }
}
