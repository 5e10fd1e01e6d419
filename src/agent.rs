//! Agents that act on a board: the learning player and a read-only greedy
//! policy for evaluation.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::PlayerConfig;
use crate::engine::{Action, Board, Direction, Rank};
use crate::evaluator::best_slide;
use crate::learner::{TdLearner, TdSummary, Trajectory};
use crate::weights::{WeightError, WeightStore};

/// What an agent can see besides the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeContext {
    /// Last slide of the episode, `None` before the first one.
    pub previous_move: Option<Direction>,
    /// Rank of the next tile the environment will place.
    pub hint: Rank,
}

impl EpisodeContext {
    pub fn new(hint: Rank) -> Self {
        Self { previous_move: None, hint }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    EpisodeStart,
    EpisodeEnd,
}

pub trait Agent {
    /// Next action, or `None` when the agent has nothing legal to do.
    fn decide(&mut self, board: &Board, ctx: &EpisodeContext) -> Option<Action>;

    fn notify(&mut self, _event: Event) {}
}

/// Greedy TD player. Records every chosen slide and trains on episode end.
#[derive(Debug)]
pub struct Player {
    store: WeightStore,
    learner: TdLearner,
    trajectory: Trajectory,
    save_path: Option<PathBuf>,
    last_summary: TdSummary,
}

impl Player {
    pub fn new(store: WeightStore, alpha: f32) -> Self {
        Self {
            store,
            learner: TdLearner::new(alpha),
            trajectory: Trajectory::new(),
            save_path: None,
            last_summary: TdSummary::default(),
        }
    }

    /// Load weights from `config.load` if set, otherwise start from zeros.
    pub fn from_config(config: &PlayerConfig) -> Result<Self, WeightError> {
        let store = match &config.load {
            Some(path) => WeightStore::load(path, config.init)?,
            None => {
                debug!(topology = %config.init, "fresh weights");
                WeightStore::new(config.init)
            }
        };
        let mut player = Self::new(store, config.alpha);
        player.save_path = config.save.clone();
        info!(name = %config.name, alpha = config.alpha, topology = %config.init, "player ready");
        Ok(player)
    }

    pub fn store(&self) -> &WeightStore {
        &self.store
    }

    pub fn into_store(self) -> WeightStore {
        self.store
    }

    pub fn alpha(&self) -> f32 {
        self.learner.alpha
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Result of the most recent training pass.
    pub fn last_summary(&self) -> TdSummary {
        self.last_summary
    }

    /// Persist the weights to the configured save path, if any.
    pub fn finish(&self) -> Result<(), WeightError> {
        match &self.save_path {
            Some(path) => self.store.save(path),
            None => Ok(()),
        }
    }
}

impl Agent for Player {
    fn decide(&mut self, board: &Board, ctx: &EpisodeContext) -> Option<Action> {
        let best = best_slide(board, ctx, &self.store)?;
        self.trajectory.push(best.after, best.reward, ctx.hint, ctx.previous_move);
        Some(Action::Slide(best.direction))
    }

    fn notify(&mut self, event: Event) {
        match event {
            Event::EpisodeStart => self.trajectory.clear(),
            Event::EpisodeEnd => {
                self.last_summary = self.learner.train(&mut self.store, &mut self.trajectory);
            }
        }
    }
}

/// Greedy policy over borrowed weights. Never learns.
#[derive(Debug, Clone, Copy)]
pub struct Greedy<'a> {
    store: &'a WeightStore,
}

impl<'a> Greedy<'a> {
    pub fn new(store: &'a WeightStore) -> Self {
        Self { store }
    }
}

impl Agent for Greedy<'_> {
    fn decide(&mut self, board: &Board, ctx: &EpisodeContext) -> Option<Action> {
        best_slide(board, ctx, self.store).map(|c| Action::Slide(c.direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::features::Topology;

    fn topo() -> Topology {
        Topology::new(4, 4).unwrap()
    }

    #[test]
    fn decide_records_the_chosen_after_state() {
        engine::new();
        let mut player = Player::new(WeightStore::new(topo()), 0.1);
        let b = Board::from_cells([1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let action = player.decide(&b, &EpisodeContext::new(2)).unwrap();
        assert_eq!(action, Action::Slide(Direction::Left));
        assert_eq!(player.trajectory().len(), 1);
        assert_eq!(player.trajectory().rewards(), &[4]);
        assert_eq!(player.trajectory().after_states()[0].cell(0), 2);
    }

    #[test]
    fn terminal_board_yields_no_action_and_no_record() {
        engine::new();
        let mut player = Player::new(WeightStore::new(topo()), 0.1);
        let full = Board::from_cells([1, 2, 1, 2, 2, 1, 2, 1, 1, 2, 1, 2, 2, 1, 2, 1]);
        assert!(player.decide(&full, &EpisodeContext::new(1)).is_none());
        assert!(player.trajectory().is_empty());
    }

    #[test]
    fn decide_records_the_previous_move_as_key_context() {
        engine::new();
        let mut player = Player::new(WeightStore::new(topo()), 0.1);
        let mut b = Board::EMPTY;
        b.set_cell(5, 1);
        player.decide(&b, &EpisodeContext::new(1)).unwrap();
        let ctx = EpisodeContext { previous_move: Some(Direction::Right), hint: 2 };
        player.decide(&b, &ctx).unwrap();
        assert_eq!(player.trajectory().moves(), &[None, Some(Direction::Right)]);
    }

    #[test]
    fn episode_end_trains_and_drains() {
        engine::new();
        let mut store = WeightStore::new(topo());
        let b = Board::from_cells([1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        for dir in Direction::ALL {
            let (after, _) = b.shift(dir);
            store.update(&after, Direction::Down, 1, 1.0);
        }
        let ctx = EpisodeContext { previous_move: Some(Direction::Down), hint: 1 };

        let mut player = Player::new(store, 0.01);
        player.notify(Event::EpisodeStart);
        player.decide(&b, &ctx).unwrap();
        let after = player.trajectory().after_states()[0];
        let before = player.store().value(&after, Direction::Down, 1);
        assert!(before > 0.0);
        player.notify(Event::EpisodeEnd);
        assert!(player.trajectory().is_empty());
        assert_eq!(player.last_summary().states, 1);
        let trained = player.store().value(&after, Direction::Down, 1);
        assert!(trained < before && trained > 0.0, "{before} -> {trained}");
    }

    #[test]
    fn episode_start_discards_leftovers() {
        engine::new();
        let mut player = Player::new(WeightStore::new(topo()), 0.1);
        let mut b = Board::EMPTY;
        b.set_cell(5, 1);
        player.decide(&b, &EpisodeContext::new(1)).unwrap();
        player.notify(Event::EpisodeStart);
        assert!(player.trajectory().is_empty());
    }

    #[test]
    fn greedy_agrees_with_evaluator() {
        engine::new();
        let store = WeightStore::new(topo());
        let b = Board::from_cells([1, 1, 0, 3, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0]);
        let ctx = EpisodeContext::new(1);
        let mut greedy = Greedy::new(&store);
        let expected = best_slide(&b, &ctx, &store).map(|c| Action::Slide(c.direction));
        assert_eq!(greedy.decide(&b, &ctx), expected);
    }

    #[test]
    fn finish_writes_to_the_save_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.bin");
        let config = PlayerConfig {
            init: topo(),
            save: Some(path.clone()),
            ..PlayerConfig::default()
        };
        let player = Player::from_config(&config).unwrap();
        player.finish().unwrap();
        let back = WeightStore::load(&path, topo()).unwrap();
        assert_eq!(back.tables().len(), 4);
    }
}
