use std::sync::OnceLock;

use super::ops;
use super::state::{Direction, Reward};

/// Precomputed lookup tables for all possible 4-tile lines (16-bit packed).
///
/// Sliding a row or column depends only on its 4 nibbles, so the result of
/// every slide and its merge reward is computed once for all 2^16 lines.
///
/// - `shift_left/right[i]`: replacement row (low 16 bits).
/// - `shift_up/down[i]`: replacement column, spread one nibble per 16-bit lane.
/// - `reward_left/right[i]`: merge reward; up/down reuse them on columns.
pub(crate) struct Stores {
    pub(crate) shift_left: Box<[u64]>,
    pub(crate) shift_right: Box<[u64]>,
    pub(crate) shift_up: Box<[u64]>,
    pub(crate) shift_down: Box<[u64]>,
    pub(crate) reward_left: Box<[Reward]>,
    pub(crate) reward_right: Box<[Reward]>,
}

pub(crate) const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit lines

static STORES: OnceLock<Stores> = OnceLock::new();

/// Ensure lookup tables are initialized.
pub fn init() {
    let _ = STORES.get_or_init(create_stores);
}

#[inline(always)]
pub(crate) fn stores() -> &'static Stores {
    STORES.get_or_init(create_stores)
}

fn create_stores() -> Stores {
    // Allocate on the heap to keep stack frames small during init.
    let mut shift_left = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_right = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_up = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_down = vec![0u64; LINE_TABLE_SIZE];
    let mut reward_left = vec![0 as Reward; LINE_TABLE_SIZE];
    let mut reward_right = vec![0 as Reward; LINE_TABLE_SIZE];

    for val in 0..LINE_TABLE_SIZE {
        let line = val as u64;
        let (left, left_reward) = ops::shift_line(line, Direction::Left);
        let (right, right_reward) = ops::shift_line(line, Direction::Right);
        shift_left[val] = left;
        shift_right[val] = right;
        shift_up[val] = ops::shift_line(line, Direction::Up).0;
        shift_down[val] = ops::shift_line(line, Direction::Down).0;
        reward_left[val] = left_reward;
        reward_right[val] = right_reward;
    }

    Stores {
        shift_left: shift_left.into_boxed_slice(),
        shift_right: shift_right.into_boxed_slice(),
        shift_up: shift_up.into_boxed_slice(),
        shift_down: shift_down.into_boxed_slice(),
        reward_left: reward_left.into_boxed_slice(),
        reward_right: reward_right.into_boxed_slice(),
    }
}

#[inline(always)]
pub(crate) fn get_entry<T: Copy>(table: &[T], idx: u16) -> T {
    debug_assert!((idx as usize) < LINE_TABLE_SIZE);
    table[idx as usize]
}
