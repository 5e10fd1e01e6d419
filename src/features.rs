//! N-tuple feature indexing.
//!
//! Four canonical 6-cell shapes, each expanded over the 8 symmetries of the
//! 4x4 grid. A feature key combines the slide chosen on the previous turn,
//! the revealed hint tile and the six cell ranks of one placement:
//!
//! ```text
//! key = ((move_id * hint_radix + hint) * cell_radix + c0) * cell_radix + c1 ... + c5
//! ```
//!
//! All 8 placements of a shape share one weight table, so rotating or
//! reflecting a board and querying the matching placement lands on the same
//! weight.

use std::fmt;
use std::str::FromStr;

use crate::engine::{Board, Direction, Rank};

pub const TUPLE_LEN: usize = 6;
pub const GROUPS: usize = 4;
pub const SYMMETRIES: usize = 8;
/// Weights read (and written) per board: groups x symmetric placements.
pub const CONTRIBUTIONS: usize = GROUPS * SYMMETRIES;
pub const MOVE_CARDINALITY: usize = 4;

/// Cell indices for every (group, symmetry) placement.
///
/// Row `[g][s]` is `Symmetry::ALL[s]` applied to the canonical shape
/// `TUPLES[g][0]`.
pub const TUPLES: [[[usize; TUPLE_LEN]; SYMMETRIES]; GROUPS] = [
    [
        [0, 1, 2, 3, 4, 5],
        [3, 7, 11, 15, 2, 6],
        [15, 14, 13, 12, 11, 10],
        [12, 8, 4, 0, 13, 9],
        [3, 2, 1, 0, 7, 6],
        [0, 4, 8, 12, 1, 5],
        [12, 13, 14, 15, 8, 9],
        [15, 11, 7, 3, 14, 10],
    ],
    [
        [4, 5, 6, 7, 8, 9],
        [2, 6, 10, 14, 1, 5],
        [11, 10, 9, 8, 7, 6],
        [13, 9, 5, 1, 14, 10],
        [7, 6, 5, 4, 11, 10],
        [1, 5, 9, 13, 2, 6],
        [8, 9, 10, 11, 4, 5],
        [14, 10, 6, 2, 13, 9],
    ],
    [
        [0, 1, 2, 4, 5, 6],
        [3, 7, 11, 2, 6, 10],
        [15, 14, 13, 11, 10, 9],
        [12, 8, 4, 13, 9, 5],
        [3, 2, 1, 7, 6, 5],
        [0, 4, 8, 1, 5, 9],
        [12, 13, 14, 8, 9, 10],
        [15, 11, 7, 14, 10, 6],
    ],
    [
        [4, 5, 6, 8, 9, 10],
        [2, 6, 10, 1, 5, 9],
        [11, 10, 9, 7, 6, 5],
        [13, 9, 5, 14, 10, 6],
        [7, 6, 5, 11, 10, 9],
        [1, 5, 9, 2, 6, 10],
        [8, 9, 10, 4, 5, 6],
        [14, 10, 6, 13, 9, 5],
    ],
];

/// The 8 symmetries of the square grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
    MirrorColumns,
    Transpose,
    FlipRows,
    AntiTranspose,
}

impl Symmetry {
    pub const ALL: [Symmetry; SYMMETRIES] = [
        Symmetry::Identity,
        Symmetry::Rotate90,
        Symmetry::Rotate180,
        Symmetry::Rotate270,
        Symmetry::MirrorColumns,
        Symmetry::Transpose,
        Symmetry::FlipRows,
        Symmetry::AntiTranspose,
    ];

    /// Where cell `idx` lands under this symmetry (rotations are clockwise).
    pub fn map(self, idx: usize) -> usize {
        let (r, c) = (idx / 4, idx % 4);
        let (nr, nc) = match self {
            Symmetry::Identity => (r, c),
            Symmetry::Rotate90 => (c, 3 - r),
            Symmetry::Rotate180 => (3 - r, 3 - c),
            Symmetry::Rotate270 => (3 - c, r),
            Symmetry::MirrorColumns => (r, 3 - c),
            Symmetry::Transpose => (c, r),
            Symmetry::FlipRows => (3 - r, c),
            Symmetry::AntiTranspose => (3 - c, 3 - r),
        };
        nr * 4 + nc
    }
}

impl Board {
    /// Move every cell through `sym`, so `result.cell(sym.map(i)) == self.cell(i)`.
    pub fn transform(self, sym: Symmetry) -> Board {
        let mut out = Board::EMPTY;
        for idx in 0..16 {
            out.set_cell(sym.map(idx), self.cell(idx));
        }
        out
    }
}

/// Radices of the feature key, which fix every table's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub cell_radix: usize,
    pub hint_radix: usize,
}

impl Default for Topology {
    fn default() -> Self {
        Self { cell_radix: 15, hint_radix: 12 }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("expected <cell_radix>x<hint_radix> or 'default', got '{0}'")]
    Malformed(String),
    #[error("cell radix must be in 2..=16, got {0}")]
    CellRadix(usize),
    #[error("hint radix must be in 1..=16, got {0}")]
    HintRadix(usize),
}

impl Topology {
    pub fn new(cell_radix: usize, hint_radix: usize) -> Result<Self, TopologyError> {
        if !(2..=16).contains(&cell_radix) {
            return Err(TopologyError::CellRadix(cell_radix));
        }
        if !(1..=16).contains(&hint_radix) {
            return Err(TopologyError::HintRadix(hint_radix));
        }
        Ok(Self { cell_radix, hint_radix })
    }

    /// Entries per weight table: moves x hints x cell_radix^6.
    pub fn table_len(&self) -> usize {
        MOVE_CARDINALITY * self.hint_radix * self.cell_radix.pow(TUPLE_LEN as u32)
    }

    /// Key for one placement. Ranks and hints beyond the radices saturate.
    #[inline]
    pub fn key(&self, board: &Board, cells: &[usize; TUPLE_LEN], mv: Direction, hint: Rank) -> usize {
        let hint = (hint as usize).min(self.hint_radix - 1);
        let mut key = mv.id() * self.hint_radix + hint;
        for &cell in cells {
            let rank = (board.cell(cell) as usize).min(self.cell_radix - 1);
            key = key * self.cell_radix + rank;
        }
        debug_assert!(key < self.table_len());
        key
    }

    /// Keys of all 32 placements, indexed `[group][symmetry]`.
    #[inline]
    pub fn keys(&self, board: &Board, mv: Direction, hint: Rank) -> [[usize; SYMMETRIES]; GROUPS] {
        let mut out = [[0; SYMMETRIES]; GROUPS];
        for (group, placements) in TUPLES.iter().enumerate() {
            for (sym, cells) in placements.iter().enumerate() {
                out[group][sym] = self.key(board, cells, mv, hint);
            }
        }
        out
    }
}

impl FromStr for Topology {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("default") {
            return Ok(Topology::default());
        }
        let (cells, hints) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| TopologyError::Malformed(s.to_string()))?;
        let cell_radix = cells.parse().map_err(|_| TopologyError::Malformed(s.to_string()))?;
        let hint_radix = hints.parse().map_err(|_| TopologyError::Malformed(s.to_string()))?;
        Topology::new(cell_radix, hint_radix)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cell_radix, self.hint_radix)
    }
}
