//! Tile environment: shuffled bag, revealed hint tile and bonus escalation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::agent::{Agent, EpisodeContext, Event};
use crate::engine::{Action, Board, Direction, Rank, MAX_RANK};

/// Ranks drawn in a shuffled order, refilled once exhausted.
#[derive(Debug, Clone)]
pub struct TileBag {
    ranks: Vec<Rank>,
    order: Vec<usize>,
    cursor: usize,
}

impl TileBag {
    pub const DEFAULT_RANKS: [Rank; 3] = [1, 2, 3];

    /// Bag over `ranks`, which must be non-empty and within `1..=15`.
    pub fn new<R: Rng + ?Sized>(ranks: Vec<Rank>, rng: &mut R) -> Result<Self, EnvironmentError> {
        if ranks.is_empty() {
            return Err(EnvironmentError::EmptyBag);
        }
        if let Some(&rank) = ranks.iter().find(|&&r| r == 0 || r > MAX_RANK) {
            return Err(EnvironmentError::InvalidRank(rank));
        }
        Ok(Self::from_valid(ranks, rng))
    }

    fn from_valid<R: Rng + ?Sized>(ranks: Vec<Rank>, rng: &mut R) -> Self {
        let mut bag = Self { order: (0..ranks.len()).collect(), ranks, cursor: 0 };
        bag.refill(rng);
        bag
    }

    pub fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
        self.cursor = 0;
    }

    /// Rank under the cursor.
    #[inline]
    pub fn scheduled(&self) -> Rank {
        self.ranks[self.order[self.cursor]]
    }

    /// Move the cursor, refilling on exhaustion.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cursor += 1;
        if self.cursor == self.ranks.len() {
            self.refill(rng);
        }
    }

    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("tile bag is empty")]
    EmptyBag,
    #[error("tile bag rank {0} is outside 1..=15")]
    InvalidRank(Rank),
    #[error("invalid bonus rule: {0}")]
    Bonus(#[from] BonusRuleError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BonusRuleError {
    #[error("bonus trip count must be positive")]
    ZeroTrip,
    #[error("bonus base rank {base} exceeds cap rank {cap}")]
    BaseAboveCap { base: Rank, cap: Rank },
    #[error("bonus base rank {base} is unreachable: trigger {trigger} minus gap {gap} leaves no room")]
    EmptyRange { base: Rank, trigger: Rank, gap: Rank },
    #[error("bonus ranks must not exceed 15")]
    RankTooLarge,
}

/// When and how the hint is replaced by an elevated bonus rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusRule {
    /// Counting starts once the board's max rank exceeds this.
    pub trigger_rank: Rank,
    pub base_rank: Rank,
    /// Bonus ranks stay this far below the board's max rank.
    pub rank_gap: Rank,
    /// Placements above the trigger before a bonus fires.
    pub trip_count: u32,
    pub cap_rank: Rank,
}

impl Default for BonusRule {
    fn default() -> Self {
        Self { trigger_rank: 6, base_rank: 4, rank_gap: 3, trip_count: 21, cap_rank: 11 }
    }
}

impl BonusRule {
    /// Every firing must have a non-empty rank range.
    pub fn validate(&self) -> Result<(), BonusRuleError> {
        if self.trip_count == 0 {
            return Err(BonusRuleError::ZeroTrip);
        }
        if self.trigger_rank > MAX_RANK || self.cap_rank > MAX_RANK || self.base_rank > MAX_RANK {
            return Err(BonusRuleError::RankTooLarge);
        }
        if self.base_rank > self.cap_rank {
            return Err(BonusRuleError::BaseAboveCap { base: self.base_rank, cap: self.cap_rank });
        }
        // the smallest max rank that counts is trigger + 1
        if (self.trigger_rank as u32 + 1) < self.base_rank as u32 + self.rank_gap as u32 {
            return Err(BonusRuleError::EmptyRange {
                base: self.base_rank,
                trigger: self.trigger_rank,
                gap: self.rank_gap,
            });
        }
        Ok(())
    }

    /// Inclusive range of bonus ranks for a board whose max rank is `max_rank`.
    pub fn range(&self, max_rank: Rank) -> (Rank, Rank) {
        let high = max_rank.saturating_sub(self.rank_gap).min(self.cap_rank);
        (self.base_rank, high.max(self.base_rank))
    }
}

/// Inserts one tile per turn and reveals the rank of the next.
#[derive(Debug, Clone)]
pub struct TileEnvironment {
    rng: StdRng,
    bag: TileBag,
    bonus: BonusRule,
    counter: u32,
    hint: Rank,
}

impl TileEnvironment {
    /// Rejects an empty or out-of-range bag and an invalid bonus rule.
    pub fn new(mut rng: StdRng, ranks: Vec<Rank>, bonus: BonusRule) -> Result<Self, EnvironmentError> {
        bonus.validate()?;
        let bag = TileBag::new(ranks, &mut rng)?;
        Ok(Self::with_bag(rng, bag, bonus))
    }

    /// Default bag and bonus rule over a seeded rng.
    pub fn seeded(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bag = TileBag::from_valid(TileBag::DEFAULT_RANKS.to_vec(), &mut rng);
        Self::with_bag(rng, bag, BonusRule::default())
    }

    fn with_bag(rng: StdRng, bag: TileBag, bonus: BonusRule) -> Self {
        let hint = bag.scheduled();
        Self { rng, bag, bonus, counter: 0, hint }
    }

    /// Fresh bag and counters for a new episode.
    pub fn open_episode(&mut self) {
        self.bag.refill(&mut self.rng);
        self.counter = 0;
        self.hint = self.bag.scheduled();
    }

    /// Rank of the next tile this environment will place.
    #[inline]
    pub fn hint(&self) -> Rank {
        self.hint
    }

    pub fn bonus_counter(&self) -> u32 {
        self.counter
    }

    /// Choose where the next tile goes and which rank it has.
    ///
    /// With no slide yet any empty cell is a candidate; afterwards only the
    /// wall opposite the slide is. `None` means every candidate is occupied.
    pub fn place(&mut self, board: &Board, previous_move: Option<Direction>) -> Option<Action> {
        match previous_move {
            None => self.place_opening(board),
            Some(dir) => self.place_after(board, dir),
        }
    }

    fn place_opening(&mut self, board: &Board) -> Option<Action> {
        let mut space: [usize; 16] = std::array::from_fn(|i| i);
        space.shuffle(&mut self.rng);
        let position = space.into_iter().find(|&pos| board.cell(pos) == 0)?;
        let rank = self.bag.scheduled();
        self.bag.advance(&mut self.rng);
        self.hint = self.bag.scheduled();
        Some(Action::Place { position, rank })
    }

    fn place_after(&mut self, board: &Board, dir: Direction) -> Option<Action> {
        let mut wall = dir.far_wall();
        wall.shuffle(&mut self.rng);
        let position = wall.into_iter().find(|&pos| board.cell(pos) == 0)?;
        let rank = self.hint;
        if self.bag.scheduled() == rank {
            self.bag.advance(&mut self.rng);
        }
        self.hint = self.bag.scheduled();

        let mut placed = *board;
        placed.set_cell(position, rank);
        let max = placed.max_rank();
        if max > self.bonus.trigger_rank {
            self.counter += 1;
            if self.counter >= self.bonus.trip_count {
                let (low, high) = self.bonus.range(max);
                self.hint = self.rng.gen_range(low..=high);
                self.counter = 0;
                trace!(hint = self.hint, max, "bonus hint");
            }
        }
        Some(Action::Place { position, rank })
    }
}

impl Agent for TileEnvironment {
    fn decide(&mut self, board: &Board, ctx: &EpisodeContext) -> Option<Action> {
        self.place(board, ctx.previous_move)
    }

    fn notify(&mut self, event: Event) {
        if event == Event::EpisodeStart {
            self.open_episode();
        }
    }
}
