//! Board engine: packed 4x4 state, directional slides and reward accounting.
//!
//! Slides are table-driven. The tables are built lazily on first use;
//! calling [`new`] up front keeps the one-time cost out of timed loops.

mod ops;
mod state;
mod tables;

pub use ops::shift;
pub use state::{Action, Board, Direction, Rank, Reward, ILLEGAL_MOVE, MAX_RANK};

/// Initialize internal tables on first use. Safe to call multiple times.
pub fn new() {
    tables::init();
}
