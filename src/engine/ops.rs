use super::state::{Board, BoardRaw, Direction, Line, Rank, Reward, MAX_RANK};
use super::tables::{get_entry, stores};

/// Slide/merge tiles in the given direction. No randomness.
#[inline]
pub fn shift(board: Board, direction: Direction) -> (Board, Reward) {
    match direction {
        Direction::Left | Direction::Right => shift_rows(board, direction),
        Direction::Up | Direction::Down => shift_cols(board, direction),
    }
}

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

#[inline]
pub(crate) fn extract_line(board: BoardRaw, line_idx: u64) -> Line {
    (board >> ((3 - line_idx) * 16)) & 0xffff
}

pub(crate) fn line_to_tiles(line: Line) -> [Rank; 4] {
    let mut tiles = [0; 4];
    for (idx, tile) in tiles.iter_mut().enumerate() {
        *tile = ((line >> ((3 - idx) * 4)) & 0xf) as Rank;
    }
    tiles
}

// https://stackoverflow.com/questions/38225571/count-number-of-zero-nibbles-in-an-unsigned-64-bit-integer
pub(crate) fn count_non_empty(board: Board) -> u32 {
    let mut board_copy = board.0;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111111111111111;
    board_copy.count_ones()
}

fn shift_rows(board: Board, dir: Direction) -> (Board, Reward) {
    let s = stores();
    let (table, rewards): (&[u64], &[Reward]) = match dir {
        Direction::Left => (&s.shift_left, &s.reward_left),
        Direction::Right => (&s.shift_right, &s.reward_right),
        _ => unreachable!("shift_rows only handles left/right"),
    };
    let (res, reward) = (0..4).fold((0u64, 0), |(new_board, reward), row_idx| {
        let row_val = extract_line(board.0, row_idx) as u16;
        let new_row = get_entry(table, row_val);
        (new_board | (new_row << (48 - 16 * row_idx)), reward + get_entry(rewards, row_val))
    });
    (Board(res), reward)
}

fn shift_cols(board: Board, dir: Direction) -> (Board, Reward) {
    let transposed = transpose(board.0);
    let s = stores();
    let (table, rewards): (&[u64], &[Reward]) = match dir {
        Direction::Up => (&s.shift_up, &s.reward_left),
        Direction::Down => (&s.shift_down, &s.reward_right),
        _ => unreachable!("shift_cols only handles up/down"),
    };
    let (res, reward) = (0..4).fold((0u64, 0), |(new_board, reward), col_idx| {
        let col_val = extract_line(transposed, col_idx) as u16;
        let new_col = get_entry(table, col_val);
        (new_board | (new_col << (12 - 4 * col_idx)), reward + get_entry(rewards, col_val))
    });
    (Board(res), reward)
}

/// Slide one packed line and return the replacement in the layout the
/// direction's table expects, together with the merge reward.
pub(crate) fn shift_line(line: Line, direction: Direction) -> (Line, Reward) {
    let tiles = line_to_tiles(line);
    let (shifted, reward) = match direction {
        Direction::Left | Direction::Up => merge_left(tiles),
        Direction::Right | Direction::Down => merge_right(tiles),
    };
    let packed = match direction {
        Direction::Left | Direction::Right => tiles_to_row(shifted),
        Direction::Up | Direction::Down => tiles_to_col(shifted),
    };
    (packed, reward)
}

fn tiles_to_row(tiles: [Rank; 4]) -> Line {
    (tiles[0] as u64) << 12 | (tiles[1] as u64) << 8 | (tiles[2] as u64) << 4 | tiles[3] as u64
}

fn tiles_to_col(tiles: [Rank; 4]) -> Line {
    (tiles[0] as u64) << 48 | (tiles[1] as u64) << 32 | (tiles[2] as u64) << 16 | tiles[3] as u64
}

fn merge_right(tiles: [Rank; 4]) -> ([Rank; 4], Reward) {
    let mut rev = tiles;
    rev.reverse();
    let (mut out, reward) = merge_left(rev);
    out.reverse();
    (out, reward)
}

/// Compact toward index 0, merging equal neighbours once per slide.
pub(crate) fn merge_left(tiles: [Rank; 4]) -> ([Rank; 4], Reward) {
    let mut out = [0; 4];
    let mut len = 0;
    let mut reward = 0;
    // the last written cell came from a merge and may not merge again
    let mut locked = false;
    for &tile in tiles.iter().filter(|&&t| t != 0) {
        if len > 0 && !locked && out[len - 1] == tile && tile < MAX_RANK {
            out[len - 1] = tile + 1;
            reward += 1 << (tile + 1);
            locked = true;
        } else {
            out[len] = tile;
            len += 1;
            locked = false;
        }
    }
    (out, reward)
}
