//! One-ply greedy policy over after-states.

use crate::agent::EpisodeContext;
use crate::engine::{Board, Direction, Reward, ILLEGAL_MOVE};
use crate::weights::WeightStore;

/// Order in which directions are tried. Ties keep the earliest.
pub const SEARCH_ORDER: [Direction; 4] = [Direction::Down, Direction::Left, Direction::Right, Direction::Up];

/// Evaluation of one legal slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub direction: Direction,
    pub after: Board,
    pub reward: Reward,
    /// `reward + value(after)`.
    pub score: f32,
}

/// Score every legal slide of `board`. Illegal directions are `None`; the
/// array follows [`SEARCH_ORDER`].
///
/// Every after-state is keyed by the context's previous move, not by the
/// candidate direction. Before the first slide of an episode there is no
/// previous move to key on, so the value term is 0.
pub fn candidates(board: &Board, ctx: &EpisodeContext, store: &WeightStore) -> [Option<Candidate>; 4] {
    SEARCH_ORDER.map(|direction| {
        let mut after = *board;
        let reward = after.slide(direction);
        if reward == ILLEGAL_MOVE {
            return None;
        }
        let value = match ctx.previous_move {
            Some(prev) => store.value(&after, prev, ctx.hint),
            None => 0.0,
        };
        Some(Candidate { direction, after, reward, score: reward as f32 + value })
    })
}

/// Best legal slide, or `None` when the episode is over.
///
/// ```
/// use ai_2048_td::agent::EpisodeContext;
/// use ai_2048_td::engine::{self as GameEngine, Board, Direction};
/// use ai_2048_td::evaluator::best_slide;
/// use ai_2048_td::features::Topology;
/// use ai_2048_td::weights::WeightStore;
/// GameEngine::new();
/// let store = WeightStore::new(Topology::new(4, 4).unwrap());
/// let mut b = Board::EMPTY;
/// b.set_cell(0, 1);
/// b.set_cell(1, 1);
/// let best = best_slide(&b, &EpisodeContext::new(1), &store).unwrap();
/// assert_eq!(best.reward, 4);
/// assert_eq!(best.direction, Direction::Left);
/// ```
pub fn best_slide(board: &Board, ctx: &EpisodeContext, store: &WeightStore) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates(board, ctx, store).into_iter().flatten() {
        match best {
            Some(ref current) if candidate.score <= current.score => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::features::Topology;

    fn store() -> WeightStore {
        WeightStore::new(Topology::new(6, 4).unwrap())
    }

    #[test]
    fn no_legal_slide_means_no_action() {
        engine::new();
        let full = Board::from_cells([1, 2, 1, 2, 2, 1, 2, 1, 1, 2, 1, 2, 2, 1, 2, 1]);
        let ctx = EpisodeContext { previous_move: Some(Direction::Up), hint: 1 };
        assert!(best_slide(&full, &ctx, &store()).is_none());
        assert!(candidates(&full, &ctx, &store()).iter().all(Option::is_none));
    }

    #[test]
    fn ties_keep_search_order() {
        engine::new();
        // a lone tile in the middle can move any way for zero reward
        let mut b = Board::EMPTY;
        b.set_cell(5, 2);
        let best = best_slide(&b, &EpisodeContext::new(1), &store()).unwrap();
        assert_eq!(best.direction, SEARCH_ORDER[0]);
        assert_eq!(best.reward, 0);
    }

    #[test]
    fn first_decision_ignores_weights() {
        engine::new();
        let mut weights = store();
        let mut b = Board::EMPTY;
        b.set_cell(5, 2);
        for dir in Direction::ALL {
            let (after, _) = b.shift(dir);
            weights.update(&after, dir, 1, 10.0);
        }
        let fresh = EpisodeContext::new(1);
        for c in candidates(&b, &fresh, &weights).into_iter().flatten() {
            assert_eq!(c.score, c.reward as f32);
        }
        assert_eq!(best_slide(&b, &fresh, &weights).unwrap().direction, Direction::Down);
    }

    #[test]
    fn values_are_keyed_by_the_previous_move() {
        engine::new();
        let mut weights = store();
        let b = Board::from_cells([1, 2, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        let (up_after, up_reward) = b.shift(Direction::Up);
        weights.update(&up_after, Direction::Left, 1, 10.0);

        let ctx = EpisodeContext { previous_move: Some(Direction::Left), hint: 1 };
        let up = candidates(&b, &ctx, &weights)
            .into_iter()
            .flatten()
            .find(|c| c.direction == Direction::Up)
            .unwrap();
        let by_previous = weights.value(&up_after, Direction::Left, 1);
        assert!(by_previous > 0.0);
        assert_eq!(weights.value(&up_after, Direction::Up, 1), 0.0);
        assert!((up.score - (up_reward as f32 + by_previous)).abs() < 1e-4);

        // the same weights are invisible under another previous move
        let other = EpisodeContext { previous_move: Some(Direction::Right), hint: 1 };
        for c in candidates(&b, &other, &weights).into_iter().flatten() {
            assert_eq!(c.score, c.reward as f32);
        }
    }

    #[test]
    fn evaluation_does_not_mutate_the_board() {
        engine::new();
        let b = Board::from_cells([1, 1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3]);
        let copy = b;
        let _ = best_slide(&b, &EpisodeContext::new(2), &store());
        assert_eq!(b, copy);
    }

    #[test]
    fn higher_reward_wins_without_weights() {
        engine::new();
        // merging the right column (two 3s) beats merging the top-left pair
        let b = Board::from_cells([1, 1, 0, 3, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0]);
        let best = best_slide(&b, &EpisodeContext::new(1), &store()).unwrap();
        assert_eq!(best.reward, 16);
        assert_eq!(best.direction, Direction::Down);
    }
}
