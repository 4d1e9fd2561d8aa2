use std::fmt;

use super::Player;
use crate::error::BoardError;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Red,
    Yellow,
}

impl Cell {
    /// The player occupying this cell, if any.
    pub fn player(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Red => Some(Player::Red),
            Cell::Yellow => Some(Player::Yellow),
        }
    }

    pub fn to_wire(self) -> i8 {
        match self.player() {
            Some(player) => player.to_wire(),
            None => 0,
        }
    }

    pub fn from_wire(value: i8) -> Option<Cell> {
        match value {
            0 => Some(Cell::Empty),
            other => Player::from_wire(other).map(Player::to_cell),
        }
    }
}

/// A 6x7 Connect Four grid. Boards are plain values: every move produces a
/// new board and leaves the old one untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "Vec<Vec<i8>>", try_from = "Vec<Vec<i8>>")]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("column is full")]
    ColumnFull,
    #[error("column is outside the board")]
    InvalidColumn,
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Empty; COLS]; ROWS],
        }
    }

    /// Get the cell at a specific position
    /// Row 0 is the top, row 5 is the bottom
    ///
    /// # Panics
    ///
    /// Panics if `row >= ROWS` or `col >= COLS`.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    /// Check if a column is full
    pub fn is_column_full(&self, col: usize) -> bool {
        if col >= COLS {
            return true;
        }
        self.cells[0][col] != Cell::Empty
    }

    /// Columns that can still take a disc, in ascending order.
    pub fn legal_moves(&self) -> Vec<usize> {
        (0..COLS).filter(|&col| !self.is_column_full(col)).collect()
    }

    /// Drop a disc for `player` into `column` and return the resulting board.
    ///
    /// The receiver is never modified; a rejected move leaves no trace.
    pub fn apply_move(&self, column: usize, player: Player) -> Result<Board, MoveError> {
        if column >= COLS {
            return Err(MoveError::InvalidColumn);
        }

        let row = self.landing_row(column).ok_or(MoveError::ColumnFull)?;
        let mut next = *self;
        next.cells[row][column] = player.to_cell();
        Ok(next)
    }

    /// Row a disc dropped into `column` would land on.
    pub fn landing_row(&self, column: usize) -> Option<usize> {
        if column >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][column] == Cell::Empty)
    }

    /// Check if the board is completely full
    pub fn is_full(&self) -> bool {
        (0..COLS).all(|col| self.is_column_full(col))
    }

    /// Number of discs on the board.
    pub fn disc_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell != Cell::Empty)
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            write!(f, "|")?;
            for (col, cell) in row.iter().enumerate() {
                let glyph = match cell {
                    Cell::Empty => '.',
                    Cell::Red => 'X',
                    Cell::Yellow => 'O',
                };
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{glyph}")?;
            }
            writeln!(f, "|")?;
        }
        write!(f, " ")?;
        for col in 0..COLS {
            if col > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", col + 1)?;
        }
        Ok(())
    }
}

impl From<Board> for Vec<Vec<i8>> {
    fn from(board: Board) -> Self {
        board
            .cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_wire()).collect())
            .collect()
    }
}

impl TryFrom<Vec<Vec<i8>>> for Board {
    type Error = BoardError;

    fn try_from(rows: Vec<Vec<i8>>) -> Result<Self, Self::Error> {
        if rows.len() != ROWS {
            return Err(BoardError::Shape {
                rows: rows.len(),
                cols: rows.first().map_or(0, Vec::len),
            });
        }

        let mut board = Board::new();
        for (row, values) in rows.iter().enumerate() {
            if values.len() != COLS {
                return Err(BoardError::Shape {
                    rows: rows.len(),
                    cols: values.len(),
                });
            }
            for (col, &value) in values.iter().enumerate() {
                board.cells[row][col] =
                    Cell::from_wire(value).ok_or(BoardError::CellValue { row, col, value })?;
            }
        }

        // Gravity: once a column has a disc, everything below it is filled.
        for col in 0..COLS {
            let mut occupied_above = false;
            for row in 0..ROWS {
                let empty = board.cells[row][col] == Cell::Empty;
                if occupied_above && empty {
                    return Err(BoardError::FloatingDisc { row: row - 1, col });
                }
                occupied_above |= !empty;
            }
        }

        Ok(board)
    }
}
