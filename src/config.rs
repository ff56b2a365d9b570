//! # Game Configuration
//!
//! Validated setup for a session. Everything the shell asks the user for
//! (board size, win condition, mode) plus the knobs of the computer
//! opponent lives here, and [`GameConfig::new`] is the only way in, so an
//! invalid size or win condition never reaches the board.

use crate::error::ConfigError;
use crate::{DEFAULT_MAX_DEPTH, DEFAULT_TIMEOUT};
use std::time::Duration;

/// What the shell does when a computer search misses its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Play a random legal cell for the computer and keep going.
    #[default]
    Random,
    /// Log the failure and exit the process with status 1.
    Abort,
}

/// Validated configuration of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Side length N of the square board.
    pub board_size: usize,
    /// Run length K needed to win.
    pub win_condition: usize,
    /// Whether the second player (`O`) is the computer.
    pub vs_computer: bool,
    /// Whether the computer opens the game instead of `X`.
    pub computer_first: bool,
    /// Search horizon in plies.
    pub max_depth: u32,
    /// Threads used to split the root of the search. 0 = rayon default.
    pub threads: usize,
    /// Budget for one computer move.
    pub timeout: Duration,
    /// Seed for the fallback random mover.
    pub seed: u64,
    /// Shell policy when `timeout` expires.
    pub on_timeout: TimeoutPolicy,
}

impl GameConfig {
    /// Validates the setup values and fills in defaults for everything else.
    pub fn new(
        board_size: usize,
        win_condition: usize,
        vs_computer: bool,
    ) -> Result<Self, ConfigError> {
        if board_size < 3 {
            return Err(ConfigError::BoardTooSmall(board_size));
        }
        if win_condition < 3 {
            return Err(ConfigError::WinConditionTooSmall(win_condition));
        }
        if win_condition > board_size {
            return Err(ConfigError::WinConditionTooLarge {
                board_size,
                win_condition,
            });
        }

        Ok(Self {
            board_size,
            win_condition,
            vs_computer,
            computer_first: false,
            max_depth: DEFAULT_MAX_DEPTH,
            threads: 1,
            timeout: DEFAULT_TIMEOUT,
            seed: 0,
            on_timeout: TimeoutPolicy::default(),
        })
    }

    /// Builds a config from raw user input, as typed into a prompt.
    pub fn parse(
        board_size: &str,
        win_condition: &str,
        vs_computer: bool,
    ) -> Result<Self, ConfigError> {
        let board_size = parse_number("board size", board_size)?;
        let win_condition = parse_number("win condition", win_condition)?;
        Self::new(board_size, win_condition, vs_computer)
    }

    pub fn with_computer_first(mut self, computer_first: bool) -> Self {
        self.computer_first = computer_first;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Result<Self, ConfigError> {
        if max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        self.max_depth = max_depth;
        Ok(self)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_on_timeout(mut self, on_timeout: TimeoutPolicy) -> Self {
        self.on_timeout = on_timeout;
        self
    }
}

/// Parses a non-negative integer, reporting which field was wrong.
pub fn parse_number(field: &'static str, input: &str) -> Result<usize, ConfigError> {
    input
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidNumber {
            field,
            input: input.to_string(),
        })
}
