use std::fmt;

use super::ops;

// Internal type aliases for packed representation
pub(crate) type BoardRaw = u64;
pub(crate) type Line = u64;

/// Exponent stored in one nibble: 0 is empty, `n > 0` is the tile `2^n`.
pub type Rank = u8;

/// Sum of merge values produced by one slide, or [`ILLEGAL_MOVE`].
pub type Reward = i32;

/// Sentinel reward for a slide that leaves the board unchanged.
pub const ILLEGAL_MOVE: Reward = -1;

/// Highest rank a nibble can hold. Tiles of this rank never merge.
pub const MAX_RANK: Rank = 15;

/// A direction to slide/merge tiles.
///
/// Discriminants are the stable move ids used in feature keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    /// All directions in id order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    #[inline]
    pub fn id(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_id(id: usize) -> Option<Direction> {
        Self::ALL.get(id).copied()
    }

    /// Cells on the wall opposite the direction the tiles moved toward.
    ///
    /// After a left slide the rightmost column is returned, and so on.
    #[inline]
    pub fn far_wall(self) -> [usize; 4] {
        match self {
            Direction::Up => [12, 13, 14, 15],
            Direction::Right => [0, 4, 8, 12],
            Direction::Down => [0, 1, 2, 3],
            Direction::Left => [3, 7, 11, 15],
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        };
        f.write_str(s)
    }
}

/// A move by either side: the player slides, the environment places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Slide(Direction),
    Place { position: usize, rank: Rank },
}

/// Packed 4x4 board as 16 4-bit nibbles in a `u64`.
///
/// Cell 0 is the top-left corner and lives in the most significant nibble;
/// indices run row-major. Boards are `Copy`, so evaluating an after-state
/// never touches the caller's board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(pub(crate) BoardRaw);

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self {
        Board(raw)
    }

    /// Build a board from 16 row-major ranks. Ranks are truncated to a nibble.
    pub fn from_cells(cells: [Rank; 16]) -> Self {
        let raw = cells
            .iter()
            .enumerate()
            .fold(0u64, |acc, (idx, &rank)| acc | ((rank as u64 & 0xf) << (60 - 4 * idx)));
        Board(raw)
    }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> BoardRaw {
        self.0
    }

    /// Rank stored at `idx` (row-major, 0..16).
    #[inline]
    pub fn cell(&self, idx: usize) -> Rank {
        debug_assert!(idx < 16);
        ((self.0 >> (60 - 4 * idx)) & 0xf) as Rank
    }

    /// Overwrite the rank at `idx`.
    #[inline]
    pub fn set_cell(&mut self, idx: usize, rank: Rank) {
        debug_assert!(idx < 16);
        debug_assert!(rank <= MAX_RANK);
        let shift = 60 - 4 * idx;
        self.0 = (self.0 & !(0xf << shift)) | ((rank as u64 & 0xf) << shift);
    }

    /// All 16 ranks, row-major.
    pub fn cells(&self) -> [Rank; 16] {
        let mut out = [0; 16];
        for (idx, slot) in out.iter_mut().enumerate() {
            *slot = self.cell(idx);
        }
        out
    }

    /// Return the board and reward resulting from sliding in `dir`.
    ///
    /// The returned board equals `self` when the slide is illegal; the
    /// reward is then meaningless (use [`Board::slide`] for the sentinel).
    ///
    /// ```
    /// use ai_2048_td::engine::{self as GameEngine, Board, Direction};
    /// GameEngine::new();
    /// let (after, reward) = Board::from_cells([1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0])
    ///     .shift(Direction::Left);
    /// assert_eq!(after.cell(0), 2);
    /// assert_eq!(reward, 4);
    /// ```
    #[inline]
    pub fn shift(self, dir: Direction) -> (Board, Reward) {
        ops::shift(self, dir)
    }

    /// Slide in place and return the merge reward, or [`ILLEGAL_MOVE`] if
    /// nothing would change (the board is then left as is).
    #[inline]
    pub fn slide(&mut self, dir: Direction) -> Reward {
        let (next, reward) = ops::shift(*self, dir);
        if next == *self {
            return ILLEGAL_MOVE;
        }
        *self = next;
        reward
    }

    /// Apply either kind of action. Placing a tile yields no reward; placing
    /// onto an occupied or out-of-range cell is illegal.
    pub fn apply(&mut self, action: Action) -> Reward {
        match action {
            Action::Slide(dir) => self.slide(dir),
            Action::Place { position, rank } => {
                if position >= 16 || self.cell(position) != 0 || rank == 0 || rank > MAX_RANK {
                    return ILLEGAL_MOVE;
                }
                self.set_cell(position, rank);
                0
            }
        }
    }

    /// True if no slide in any direction changes the board.
    #[inline]
    pub fn is_game_over(self) -> bool {
        Direction::ALL.iter().all(|&dir| self.shift(dir).0 == self)
    }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(self) -> u32 {
        16 - ops::count_non_empty(self)
    }

    /// Highest rank on the board (0 for an empty board).
    #[inline]
    pub fn max_rank(self) -> Rank {
        (0..16).map(|idx| self.cell(idx)).max().unwrap_or(0)
    }

    /// Face value of the tile at `idx` (0 if empty).
    #[inline]
    pub fn tile_value(self, idx: usize) -> u32 {
        match self.cell(idx) {
            0 => 0,
            rank => 1u32 << rank,
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let board: Vec<String> = self.cells().iter().map(format_val).collect();
        for (row, cells) in board.chunks(4).enumerate() {
            if row > 0 {
                writeln!(f, "--------------------------------")?;
            }
            writeln!(f, "{}|{}|{}|{}", cells[0], cells[1], cells[2], cells[3])?;
        }
        Ok(())
    }
}

impl From<BoardRaw> for Board {
    fn from(v: BoardRaw) -> Self {
        Board::from_raw(v)
    }
}

fn format_val(rank: &Rank) -> String {
    match rank {
        0 => String::from("       "),
        &r => format!("{:^7}", 1u32 << r),
    }
}
