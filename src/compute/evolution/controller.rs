//! Convergence control: decides after each generation whether the search
//! continues, needs a shake, or is done.
//!
//! Two stagnation signals are tracked. A *plateau* is a run of generations
//! whose winning score does not change at all. The *stall* counter counts
//! every generation since the last shake, whatever the score does, and
//! kicks the search when it passes a much longer threshold. Either signal
//! triggers a shake, and a shake clears all counters.

use serde::{Deserialize, Serialize};

use crate::schema::ControllerConfig;

/// Controller decision for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Reproduce normally.
    Continue,
    /// Mutate the whole population at maximum intensity, then reproduce.
    Shake,
    /// Stop and return the current winner.
    Done,
}

/// What the controller gets to see of a generation's winner.
#[derive(Debug, Clone, Copy)]
pub struct WinnerSummary<'a> {
    pub score: i64,
    pub output: &'a [u8],
}

/// Strategy deciding how the search proceeds after each generation.
pub trait Controller {
    fn decide(&mut self, generation: u64, winner: &WinnerSummary<'_>) -> Verdict;
}

impl<F> Controller for F
where
    F: FnMut(u64, &WinnerSummary<'_>) -> Verdict,
{
    fn decide(&mut self, generation: u64, winner: &WinnerSummary<'_>) -> Verdict {
        self(generation, winner)
    }
}

/// Counters carried between generations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Winning score of the previous generation.
    pub last_score: i64,
    /// Consecutive generations with an unchanged winning score.
    pub same_score_streak: u64,
    /// Generations since the last shake.
    pub stall_counter: u64,
}

impl ControllerState {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Two-tier stagnation controller with byte-exact target detection.
#[derive(Debug, Clone)]
pub struct StagnationController {
    target: Vec<u8>,
    config: ControllerConfig,
    state: ControllerState,
}

impl StagnationController {
    pub fn new(target: impl Into<Vec<u8>>, config: ControllerConfig) -> Self {
        Self {
            target: target.into(),
            config,
            state: ControllerState::default(),
        }
    }

    pub fn target(&self) -> &[u8] {
        &self.target
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ControllerState {
        &mut self.state
    }
}

impl Controller for StagnationController {
    fn decide(&mut self, generation: u64, winner: &WinnerSummary<'_>) -> Verdict {
        if winner.output == self.target.as_slice() {
            log::info!("target reached at generation {generation}");
            return Verdict::Done;
        }

        let state = &mut self.state;

        if winner.score == state.last_score {
            state.same_score_streak += 1;
            if state.same_score_streak > self.config.plateau_threshold {
                log::info!(
                    "generation {generation}: score {} flat for {} generations, shaking",
                    winner.score,
                    state.same_score_streak
                );
                state.reset();
                return Verdict::Shake;
            }
        } else {
            state.same_score_streak = 0;
            state.last_score = winner.score;
        }

        state.stall_counter += 1;
        if state.stall_counter > self.config.stall_threshold {
            log::info!(
                "generation {generation}: {} generations since last shake, bumping",
                state.stall_counter
            );
            state.reset();
            return Verdict::Shake;
        }

        Verdict::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(plateau: u64, stall: u64) -> StagnationController {
        StagnationController::new(
            "AB",
            ControllerConfig {
                plateau_threshold: plateau,
                stall_threshold: stall,
            },
        )
    }

    fn summary(score: i64, output: &[u8]) -> WinnerSummary<'_> {
        WinnerSummary { score, output }
    }

    #[test]
    fn test_target_match_is_done() {
        let mut controller = controller(10, 100);
        assert_eq!(controller.decide(0, &summary(5, b"AB")), Verdict::Done);
    }

    #[test]
    fn test_target_match_is_byte_exact() {
        let mut controller = controller(10, 100);
        assert_eq!(controller.decide(0, &summary(5, b"ab")), Verdict::Continue);
        assert_eq!(controller.decide(1, &summary(5, b"AB\0")), Verdict::Continue);
    }

    #[test]
    fn test_forced_plateau_shakes_and_resets() {
        let mut controller = controller(4_000, 40_000);
        controller.state_mut().last_score = 12;
        controller.state_mut().same_score_streak = 4_001;

        assert_eq!(controller.decide(9, &summary(12, b"x")), Verdict::Shake);
        assert_eq!(controller.state().same_score_streak, 0);
        assert_eq!(controller.state(), &ControllerState::default());
    }

    #[test]
    fn test_plateau_after_threshold_generations() {
        let mut controller = controller(3, 1_000);
        let verdicts: Vec<Verdict> = (0..6)
            .map(|g| controller.decide(g, &summary(7, b"x")))
            .collect();
        // First call changes last_score from 0, then four repeats exceed 3.
        assert_eq!(
            verdicts,
            vec![
                Verdict::Continue,
                Verdict::Continue,
                Verdict::Continue,
                Verdict::Continue,
                Verdict::Shake,
                Verdict::Continue,
            ]
        );
    }

    #[test]
    fn test_changing_score_resets_streak() {
        let mut controller = controller(2, 1_000);
        for (g, score) in [1, 1, 2, 2, 1, 1].into_iter().enumerate() {
            assert_eq!(
                controller.decide(g as u64, &summary(score, b"x")),
                Verdict::Continue
            );
        }
        assert_eq!(controller.state().same_score_streak, 1);
        assert_eq!(controller.state().last_score, 1);
    }

    #[test]
    fn test_stall_without_improvement_shakes() {
        let mut controller = controller(1_000, 5);
        // Alternating scores never plateau.
        controller.decide(0, &summary(2, b"x"));
        let mut verdicts = Vec::new();
        for g in 1..8 {
            let score = if g % 2 == 0 { 2 } else { 1 };
            verdicts.push(controller.decide(g, &summary(score, b"x")));
        }
        assert_eq!(verdicts.iter().filter(|&&v| v == Verdict::Shake).count(), 1);
        assert_eq!(verdicts[4], Verdict::Shake);
    }

    #[test]
    fn test_stall_fires_even_while_improving() {
        let mut controller = controller(1_000, 3);
        let verdicts: Vec<Verdict> = (0..5)
            .map(|g| controller.decide(g, &summary(g as i64 + 1, b"x")))
            .collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Continue,
                Verdict::Continue,
                Verdict::Continue,
                Verdict::Shake,
                Verdict::Continue,
            ]
        );
        assert_eq!(controller.state().stall_counter, 1);
        assert_eq!(controller.state().last_score, 5);
    }

    #[test]
    fn test_closure_controller() {
        let mut calls = 0;
        let mut controller = |generation: u64, _: &WinnerSummary<'_>| {
            calls += 1;
            if generation >= 2 {
                Verdict::Done
            } else {
                Verdict::Continue
            }
        };
        assert_eq!(controller.decide(0, &summary(0, b"")), Verdict::Continue);
        assert_eq!(controller.decide(2, &summary(0, b"")), Verdict::Done);
        drop(controller);
        assert_eq!(calls, 2);
    }
}
