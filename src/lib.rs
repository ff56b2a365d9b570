//! # Generalized Tic-Tac-Toe Engine
//!
//! An N×N board where K marks in a row (horizontally, vertically or on either
//! diagonal) win, with a bounded-depth minimax computer opponent.
//!
//! ## Layout
//! - [`games::tictactoe`]: the board, its marks and the win detector
//! - [`search`]: the minimax engine, generic over [`GameState`]
//! - [`app`]: the background worker that runs searches under a deadline
//! - [`game_controller`]: the authoritative game session a shell talks to
//! - [`config`]: validated setup
//! - [`error`]: every error the library reports
//!
//! ## Quick Start
//! ```
//! use tictactoe::{new_game, GameStatus, MoveOutcome};
//! use std::time::Duration;
//!
//! let mut session = new_game(3, 3, true).unwrap();
//! let turn = session.human_move(1, 1);
//! assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
//!
//! let turn = session.request_computer_move(Duration::from_secs(15)).unwrap();
//! assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
//! assert_eq!(turn.status, GameStatus::InProgress);
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod game_controller;
pub mod games;
pub mod search;

pub use crate::config::{GameConfig, TimeoutPolicy};
pub use crate::error::{ConfigError, MoveRejection, PlaceError, SearchError};
pub use crate::game_controller::{new_game, GameStatus, MoveOutcome, Session, Turn};
pub use crate::games::tictactoe::{Board, Mark, Pos};
pub use crate::search::{Minimax, SearchResult, SearchStatistics};

use std::time::Duration;

/// Score of a won position from the winner's side. Larger than any depth adjustment.
pub const WIN_SCORE: i32 = 10;

/// Search horizon used unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: u32 = 4;

/// Budget for one computer move unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// The side to move at one level of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Maximizing,
    Minimizing,
}

impl Side {
    pub fn from_maximizing(maximizing: bool) -> Self {
        if maximizing {
            Side::Maximizing
        } else {
            Side::Minimizing
        }
    }

    pub fn is_maximizing(self) -> bool {
        self == Side::Maximizing
    }

    pub fn opponent(self) -> Self {
        match self {
            Side::Maximizing => Side::Minimizing,
            Side::Minimizing => Side::Maximizing,
        }
    }
}

/// A position the minimax engine can search. Must be cloneable because the
/// engine branches by copying, and `Send + Sync` for the parallel root split.
pub trait GameState: Clone + Send + Sync {
    /// The type of a move in the game.
    type Move: Copy + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync;

    /// Returns every legal move, in the fixed order the engine scans them.
    fn get_possible_moves(&self) -> Vec<Self::Move>;
    /// Applies a move for `side`, modifying the state.
    fn make_move(&mut self, mv: &Self::Move, side: Side);
    /// `WIN_SCORE` if the maximizing side has won, `-WIN_SCORE` if the
    /// minimizing side has, `0` otherwise.
    fn evaluate(&self) -> i32;
    /// Returns true if no move is left.
    fn is_full(&self) -> bool;
}
