#![cfg_attr(not(test), no_std)]

//! Run-length primitives for grid-based line games.
//!
//! The board is passed as a flat row-major slice of `size * size` cells.
//! Nothing here allocates, so the same code serves the engine's hot path
//! and any embedded or `no_std` consumer.

/// The four line directions as `(row_step, col_step)`.
///
/// Only one half of each axis is listed; callers walk both ways.
pub const DIRECTIONS: [(isize, isize); 4] = [
    (0, 1),  // Row
    (1, 0),  // Column
    (1, 1),  // Main diagonal
    (1, -1), // Anti-diagonal
];

/// Steps from `(row, col)` by `(dr, dc)` and returns the neighbour if it is on the board.
#[inline]
fn step(size: usize, row: usize, col: usize, dr: isize, dc: isize) -> Option<(usize, usize)> {
    let r = row.checked_add_signed(dr)?;
    let c = col.checked_add_signed(dc)?;
    if r < size && c < size {
        Some((r, c))
    } else {
        None
    }
}

/// Counts cells equal to the one at `(row, col)` walking away from it in one direction.
///
/// The start cell itself is not counted. The walk stops after `limit` matches,
/// which keeps the cost bounded by the win length rather than the board size.
pub fn count_direction<T: PartialEq>(
    cells: &[T],
    size: usize,
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
    limit: usize,
) -> usize {
    if row >= size || col >= size {
        return 0;
    }
    let Some(target) = cells.get(row * size + col) else {
        return 0;
    };

    let mut count = 0;
    let (mut r, mut c) = (row, col);
    while count < limit {
        match step(size, r, c, dr, dc) {
            Some((nr, nc)) if cells.get(nr * size + nc) == Some(target) => {
                count += 1;
                r = nr;
                c = nc;
            }
            _ => break,
        }
    }
    count
}

/// Length of the run through `(row, col)` along one axis, capped at `line_size`.
///
/// The centre cell is counted exactly once.
pub fn run_length_through<T: PartialEq>(
    cells: &[T],
    size: usize,
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
    line_size: usize,
) -> usize {
    if row >= size || col >= size {
        return 0;
    }
    let limit = line_size.saturating_sub(1);
    let forward = count_direction(cells, size, row, col, dr, dc, limit);
    let backward = count_direction(cells, size, row, col, -dr, -dc, limit);
    1 + forward + backward
}

/// Returns true if a run of at least `line_size` equal cells passes through `(row, col)`
/// along any of the four directions.
///
/// The caller decides whether the cell at `(row, col)` is a real mark; an empty
/// cell would otherwise match its empty neighbours.
pub fn has_run_through<T: PartialEq>(
    cells: &[T],
    size: usize,
    row: usize,
    col: usize,
    line_size: usize,
) -> bool {
    winning_direction(cells, size, row, col, line_size).is_some()
}

/// Like [`has_run_through`] but reports which direction completed the run.
pub fn winning_direction<T: PartialEq>(
    cells: &[T],
    size: usize,
    row: usize,
    col: usize,
    line_size: usize,
) -> Option<(isize, isize)> {
    DIRECTIONS
        .iter()
        .copied()
        .find(|&(dr, dc)| run_length_through(cells, size, row, col, dr, dc, line_size) >= line_size)
}
