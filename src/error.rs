//! # Error Types
//!
//! Every failure the engine can report. Setup problems surface as
//! [`ConfigError`] before a session exists, bad placements as
//! [`PlaceError`]/[`MoveRejection`] without touching the board, and a
//! computer move that misses its deadline as [`SearchError`].

use std::time::Duration;

/// Invalid game setup. No session is created when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The board must be at least 3x3.
    #[error("board size must be at least 3 (got {0})")]
    BoardTooSmall(usize),

    /// Runs shorter than 3 are not a game.
    #[error("win condition must be at least 3 (got {0})")]
    WinConditionTooSmall(usize),

    /// A run longer than the board side can never be completed.
    #[error("win condition {win_condition} does not fit on a {board_size}x{board_size} board")]
    WinConditionTooLarge {
        board_size: usize,
        win_condition: usize,
    },

    /// A setup value was not a non-negative integer.
    #[error("{field} must be a whole number (got {input:?})")]
    InvalidNumber { field: &'static str, input: String },

    /// The search needs at least one ply to pick a move.
    #[error("search depth must be at least 1")]
    ZeroDepth,

    /// A textual board layout could not be read.
    #[error("invalid board layout: {0}")]
    InvalidLayout(String),
}

/// Why the board refused a placement. The grid is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("({row},{col}) is outside the {size}x{size} board")]
    OutOfBounds { row: usize, col: usize, size: usize },

    #[error("({row},{col}) is already taken")]
    Occupied { row: usize, col: usize },

    #[error("cannot place an empty mark")]
    EmptyMark,
}

/// Why a session refused a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error(transparent)]
    Place(#[from] PlaceError),

    /// A human tried to move while the computer is to play.
    #[error("it is not your turn")]
    NotYourTurn,

    /// The computer was asked to move on a human's turn or in a two-human game.
    #[error("the computer does not move now")]
    NotComputerTurn,

    /// A computer search is still outstanding.
    #[error("the computer is still thinking")]
    SearchPending,
}

/// The computer could not produce a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The search did not finish within its budget and was cancelled.
    /// The board is unchanged and it is still the computer's turn.
    #[error("computer search did not finish within {timeout:?}")]
    TimedOut { timeout: Duration },

    /// The background worker thread is gone.
    #[error("computer opponent is unavailable")]
    WorkerUnavailable,
}
