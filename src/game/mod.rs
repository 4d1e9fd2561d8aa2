//! Core Connect Four game logic: board representation, player types, and
//! outcome evaluation over immutable board values.

mod board;
mod outcome;
mod player;

pub use board::{Board, Cell, MoveError, COLS, ROWS};
pub use outcome::{GameOutcome, CONNECT};
pub use player::Player;
