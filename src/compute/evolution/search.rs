//! Generational driver tying the machine, population and controller together.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::compute::{Individual, Machine, Program};
use crate::schema::{
    EvolutionHistory, EvolutionProgress, SearchConfig, SearchConfigError, StopReason,
};

use super::controller::{Controller, StagnationController, Verdict, WinnerSummary};
use super::fitness::Scorer;
use super::genome::ProgramRng;
use super::population::Population;

/// Statistics from a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStats {
    /// Generations evaluated.
    pub generations: u64,
    /// Program executions with scoring.
    pub total_evaluations: u64,
    /// Shakes applied.
    pub shakes: u64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
}

/// Final result of a search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Winner of the last evaluated generation.
    pub best: Individual,
    /// What the winner printed.
    pub output: Vec<u8>,
    /// Why the search stopped.
    pub stop_reason: StopReason,
    /// Statistics from the run.
    pub stats: SearchStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

impl SearchResult {
    /// Winner output decoded lossily as UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<S> {
    config: SearchConfig,
    machine: Machine,
    scorer: S,
    rng: ProgramRng,
    population: Population,
    history: EvolutionHistory,
    generation: u64,
    shakes: u64,
}

impl<S: Scorer> EvolutionEngine<S> {
    /// Create a new evolution engine with a random initial population.
    pub fn new(config: SearchConfig, scorer: S) -> Result<Self, SearchConfigError> {
        config.validate()?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        log::debug!("search seed: {seed:#x}");
        let mut rng = ProgramRng::new(seed);
        let population = Population::random(
            config.population.size,
            config.population.program_length,
            &mut rng,
        );

        Ok(Self {
            machine: Machine::new(config.vm.clone()),
            config,
            scorer,
            rng,
            population,
            history: EvolutionHistory::default(),
            generation: 0,
            shakes: 0,
        })
    }

    /// Replace the initial population with known programs, filling the
    /// rest randomly.
    pub fn with_programs(mut self, programs: impl IntoIterator<Item = Program>) -> Self {
        self.population = Population::from_programs(
            programs,
            self.config.population.size,
            self.config.population.program_length,
            &mut self.rng,
        );
        self
    }

    /// Controller configured from this engine's target and thresholds.
    pub fn stagnation_controller(&self) -> StagnationController {
        StagnationController::new(
            self.config.target.clone(),
            self.config.controller.clone(),
        )
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Generations completed so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Evaluate all individuals in the population.
    fn evaluate_population(&mut self) {
        let machine = &self.machine;
        let scorer: &dyn Scorer = &self.scorer;
        let input = self.config.input.as_slice();

        // Executions are independent; for_each returns once all are done.
        self.population
            .individuals_mut()
            .par_iter_mut()
            .for_each(|individual| {
                machine.evaluate(individual, input, Some(scorer));
            });
    }

    /// Run one generation: evaluate, rank, consult the controller and
    /// reproduce. Returns the stop reason when the search should end, with
    /// the winner left at rank 0.
    pub fn step<C, F>(&mut self, controller: &mut C, callback: &mut F) -> Option<StopReason>
    where
        C: Controller + ?Sized,
        F: FnMut(&EvolutionProgress),
    {
        self.evaluate_population();
        self.population.rank();

        let winner = &self.population.individuals()[0];
        let replay = self.machine.run(&winner.program, &self.config.input);
        let avg_score = self.population.average_score();

        self.history.best_score.push(winner.score);
        self.history.avg_score.push(avg_score);

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "generation {}: best {} avg {:.1} len {} diversity {:.3}",
                self.generation,
                winner.score,
                avg_score,
                winner.program.len(),
                self.population.diversity()
            );
        }

        callback(&EvolutionProgress {
            generation: self.generation,
            best_score: winner.score,
            avg_score,
            best_output: replay.text().into_owned(),
            best_program_length: winner.program.len(),
            shakes: self.shakes,
        });

        let verdict = controller.decide(
            self.generation,
            &WinnerSummary {
                score: winner.score,
                output: &replay.output,
            },
        );

        if verdict == Verdict::Done {
            let reason = if replay.output == self.config.target {
                StopReason::TargetReached
            } else {
                StopReason::ControllerDone
            };
            self.generation += 1;
            return Some(reason);
        }

        self.generation += 1;
        if let Some(max) = self.config.population.max_generations
            && self.generation >= max
        {
            return Some(StopReason::MaxGenerations);
        }

        if verdict == Verdict::Shake {
            self.shakes += 1;
            self.history.shakes.push(self.generation - 1);
            self.population.shake(&mut self.rng);
        }
        self.population
            .cross(&mut self.rng, self.config.population.elite_mutation);

        None
    }

    /// Run with progress callback until the controller is done or the
    /// generation budget runs out.
    pub fn run_with_callback<C, F>(&mut self, controller: &mut C, mut callback: F) -> SearchResult
    where
        C: Controller + ?Sized,
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        let first_generation = self.generation;

        let stop_reason = loop {
            if let Some(reason) = self.step(controller, &mut callback) {
                break reason;
            }
        };

        let best = self.population.individuals()[0].clone();
        let output = self
            .machine
            .run(&best.program, &self.config.input)
            .output;

        let generations = self.generation - first_generation;
        let total_evaluations = generations * self.population.len() as u64;
        let elapsed = start_time.elapsed().as_secs_f64();

        log::info!(
            "search stopped after {generations} generations ({stop_reason:?}), best score {}",
            best.score
        );

        SearchResult {
            best,
            output,
            stop_reason,
            stats: SearchStats {
                generations,
                total_evaluations,
                shakes: self.shakes,
                elapsed_seconds: elapsed,
                evaluations_per_second: total_evaluations as f64 / elapsed.max(1e-9),
            },
            history: self.history.clone(),
        }
    }

    /// Run with the given controller (blocking).
    pub fn run<C>(&mut self, controller: &mut C) -> SearchResult
    where
        C: Controller + ?Sized,
    {
        self.run_with_callback(controller, |_| {})
    }
}
