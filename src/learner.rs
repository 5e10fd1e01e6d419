//! Episode trajectory and the backward TD(0) pass over it.

use tracing::debug;

use crate::engine::{Board, Direction, Rank, Reward};
use crate::features::CONTRIBUTIONS;
use crate::weights::WeightStore;

/// After-states of one episode with the metadata their keys need.
///
/// Entry `i` holds the board after slide `i`, that slide's reward, and the
/// hint and previous move visible when it was chosen. The first entry of an
/// episode has no previous move: it reads as 0 and is never written.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    after_states: Vec<Board>,
    rewards: Vec<Reward>,
    hints: Vec<Rank>,
    moves: Vec<Option<Direction>>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, after: Board, reward: Reward, hint: Rank, mv: Option<Direction>) {
        self.after_states.push(after);
        self.rewards.push(reward);
        self.hints.push(hint);
        self.moves.push(mv);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.after_states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.after_states.is_empty()
    }

    pub fn clear(&mut self) {
        self.after_states.clear();
        self.rewards.clear();
        self.hints.clear();
        self.moves.clear();
    }

    pub fn after_states(&self) -> &[Board] {
        &self.after_states
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    pub fn moves(&self) -> &[Option<Direction>] {
        &self.moves
    }

    fn value(&self, store: &WeightStore, idx: usize) -> f32 {
        match self.moves[idx] {
            Some(mv) => store.value(&self.after_states[idx], mv, self.hints[idx]),
            None => 0.0,
        }
    }

    fn update(&self, store: &mut WeightStore, idx: usize, fix: f32) {
        if let Some(mv) = self.moves[idx] {
            store.update(&self.after_states[idx], mv, self.hints[idx], fix);
        }
    }
}

/// Summary of one training pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TdSummary {
    pub states: usize,
    pub mean_abs_error: f32,
}

/// TD(0) learner with learning rate `alpha`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TdLearner {
    pub alpha: f32,
}

impl TdLearner {
    pub fn new(alpha: f32) -> Self {
        Self { alpha }
    }

    /// Walk the trajectory newest to oldest, pulling each after-state's value
    /// toward `reward + value(successor)` and the terminal one toward 0.
    ///
    /// The trajectory is drained afterwards, also when `alpha == 0`.
    pub fn train(&self, store: &mut WeightStore, trajectory: &mut Trajectory) -> TdSummary {
        let n = trajectory.len();
        if n == 0 || self.alpha == 0.0 {
            trajectory.clear();
            return TdSummary { states: 0, mean_abs_error: 0.0 };
        }
        let scale = self.alpha / CONTRIBUTIONS as f32;
        let mut abs_error = 0.0f32;

        let terminal = n - 1;
        let error = 0.0 - trajectory.value(store, terminal);
        trajectory.update(store, terminal, error * scale);
        abs_error += error.abs();

        for prev in (0..terminal).rev() {
            let next = prev + 1;
            let error = trajectory.value(store, next) - trajectory.value(store, prev)
                + trajectory.rewards[next] as f32;
            trajectory.update(store, prev, error * scale);
            abs_error += error.abs();
        }

        let summary = TdSummary { states: n, mean_abs_error: abs_error / n as f32 };
        debug!(states = n, mean_abs_error = summary.mean_abs_error, "td pass");
        trajectory.clear();
        summary
    }
}
