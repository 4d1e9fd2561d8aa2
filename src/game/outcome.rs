//! Win and draw detection.
//!
//! The outcome is always derived from a board on demand; nothing caches it.

use super::board::{Board, COLS, ROWS};
use super::Player;

/// Discs in a row needed to win.
pub const CONNECT: usize = 4;

/// Every four-cell window that can hold a win, as (row, col, row step,
/// column step), in the order they are checked:
///
/// 1. rows, top to bottom, each left to right;
/// 2. columns, left to right, each top to bottom;
/// 3. per start cell of the top-left 3x4 block (row-major), the down-right
///    window from (row, col) and then the up-right window from (row + 3, col).
fn windows() -> impl Iterator<Item = (usize, usize, isize, isize)> {
    let span_rows = ROWS - CONNECT + 1;
    let span_cols = COLS - CONNECT + 1;

    let horizontal = (0..ROWS)
        .flat_map(move |row| (0..span_cols).map(move |col| (row, col, 0isize, 1isize)));
    let vertical = (0..COLS)
        .flat_map(move |col| (0..span_rows).map(move |row| (row, col, 1isize, 0isize)));
    let diagonal = (0..span_rows).flat_map(move |row| {
        (0..span_cols).flat_map(move |col| {
            [(row, col, 1isize, 1isize), (row + CONNECT - 1, col, -1isize, 1isize)]
        })
    });

    horizontal.chain(vertical).chain(diagonal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    InProgress,
    Winner(Player),
    Draw,
}

impl GameOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameOutcome::InProgress)
    }
}

impl Board {
    /// Evaluate the board: a four-in-a-row wins, a full board without one is
    /// a draw, anything else is still in progress.
    pub fn evaluate_outcome(&self) -> GameOutcome {
        if let Some(player) = self.winner() {
            GameOutcome::Winner(player)
        } else if self.legal_moves().is_empty() {
            GameOutcome::Draw
        } else {
            GameOutcome::InProgress
        }
    }

    /// First player found owning four in a row.
    ///
    /// If both players own one (unreachable with alternating play) the
    /// earlier window in scan order decides: rows top to bottom, then columns
    /// left to right, then diagonals with each start cell's down-right window
    /// checked before its up-right one.
    pub fn winner(&self) -> Option<Player> {
        windows().find_map(|(row, col, dr, dc)| self.line_owner(row, col, dr, dc))
    }

    /// Owner of the `CONNECT`-long line starting at (row, col), if one player
    /// holds every cell of it.
    fn line_owner(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<Player> {
        let owner = self.get(row, col).player()?;
        let cell = owner.to_cell();

        for step in 1..CONNECT as isize {
            let r = row as isize + dr * step;
            let c = col as isize + dc * step;
            if r < 0 || r >= ROWS as isize || c < 0 || c >= COLS as isize {
                return None;
            }
            if self.get(r as usize, c as usize) != cell {
                return None;
            }
        }

        Some(owner)
    }
}
