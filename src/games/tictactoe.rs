//! # Tic-Tac-Toe Game Implementation
//!
//! Generalized tic-tac-toe on an N×N board where K marks in a row win.
//!
//! ## Rules
//! - Players alternate placing their mark on an empty cell
//! - A run of at least K identical marks along a row, a column or either
//!   diagonal wins
//! - The game is a draw if the board fills up with no winner
//!
//! The board knows nothing about turns; the session decides who places
//! what. Win detection only ever looks at runs through a single cell, so a
//! check costs O(K) per direction no matter how large the board is.

use crate::config::GameConfig;
use crate::error::{ConfigError, PlaceError};
use crate::{GameState, Side, WIN_SCORE};
use std::fmt;
use std::str::FromStr;
use tictactoe_shared::{count_direction, has_run_through, winning_direction};

/// The content of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mark {
    #[default]
    Empty,
    /// `X`, the human in a game against the computer.
    First,
    /// `O`, the computer in a game against the computer.
    Second,
}

impl Mark {
    pub fn symbol(self) -> char {
        match self {
            Mark::Empty => '.',
            Mark::First => 'X',
            Mark::Second => 'O',
        }
    }

    /// The other player's mark. `Empty` has no opponent.
    pub fn opponent(self) -> Mark {
        match self {
            Mark::First => Mark::Second,
            Mark::Second => Mark::First,
            Mark::Empty => Mark::Empty,
        }
    }

    /// The mark the engine places for `side`: the computer maximizes.
    pub fn for_side(side: Side) -> Mark {
        match side {
            Side::Maximizing => Mark::Second,
            Side::Minimizing => Mark::First,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Mark::Empty
    }

    fn from_symbol(symbol: char) -> Option<Mark> {
        match symbol {
            'X' | 'x' => Some(Mark::First),
            'O' | 'o' => Some(Mark::Second),
            '.' | '_' | '-' => Some(Mark::Empty),
            _ => None,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A cell coordinate. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Self {
        Pos { row, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

impl FromStr for Pos {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err("Expected format: r,c".to_string());
        }
        let row = parts[0].parse::<usize>().map_err(|e| e.to_string())?;
        let col = parts[1].parse::<usize>().map_err(|e| e.to_string())?;
        Ok(Pos::new(row, col))
    }
}

/// The N×N grid of marks.
///
/// Cells are stored row-major. The only mutation is [`Board::place`], which
/// never overwrites a mark, so the number of occupied cells only grows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    cells: Vec<Mark>,
    size: usize,
    win_condition: usize,
    occupied: usize,
}

impl Board {
    /// Creates an empty board, validating size and win condition.
    pub fn new(size: usize, win_condition: usize) -> Result<Self, ConfigError> {
        GameConfig::new(size, win_condition, false).map(|config| Self::from_config(&config))
    }

    /// Creates an empty board for an already validated config.
    pub fn from_config(config: &GameConfig) -> Self {
        Board {
            cells: vec![Mark::Empty; config.board_size * config.board_size],
            size: config.board_size,
            win_condition: config.win_condition,
            occupied: 0,
        }
    }

    /// Reads a board from one string per row, e.g. `["X..", ".X.", "OO."]`.
    ///
    /// `X`/`O` are marks, `.`, `_` and `-` are empty; spaces are ignored.
    pub fn from_rows(rows: &[&str], win_condition: usize) -> Result<Self, ConfigError> {
        let mut board = Board::new(rows.len(), win_condition)?;
        for (row, line) in rows.iter().enumerate() {
            let symbols: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if symbols.len() != board.size {
                return Err(ConfigError::InvalidLayout(format!(
                    "row {} has {} cells, expected {}",
                    row,
                    symbols.len(),
                    board.size
                )));
            }
            for (col, symbol) in symbols.into_iter().enumerate() {
                let mark = Mark::from_symbol(symbol).ok_or_else(|| {
                    ConfigError::InvalidLayout(format!("unknown symbol {symbol:?} at ({row},{col})"))
                })?;
                if !mark.is_empty() {
                    board
                        .place(row, col, mark)
                        .map_err(|e| ConfigError::InvalidLayout(e.to_string()))?;
                }
            }
        }
        Ok(board)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn win_condition(&self) -> usize {
        self.win_condition
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    /// The mark at `(row, col)`, or `None` off the board.
    pub fn get(&self, row: usize, col: usize) -> Option<Mark> {
        if self.in_bounds(row, col) {
            Some(self.cells[row * self.size + col])
        } else {
            None
        }
    }

    /// Puts `mark` on an empty cell. Out-of-range or occupied cells are refused
    /// and the grid is left as it was.
    pub fn place(&mut self, row: usize, col: usize, mark: Mark) -> Result<(), PlaceError> {
        if mark.is_empty() {
            return Err(PlaceError::EmptyMark);
        }
        if !self.in_bounds(row, col) {
            return Err(PlaceError::OutOfBounds {
                row,
                col,
                size: self.size,
            });
        }
        let cell = &mut self.cells[row * self.size + col];
        if !cell.is_empty() {
            return Err(PlaceError::Occupied { row, col });
        }
        *cell = mark;
        self.occupied += 1;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.cells.len()
    }

    /// Empty cells in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, mark)| mark.is_empty())
            .map(move |(i, _)| Pos::new(i / self.size, i % self.size))
    }

    /// True if a run of at least K identical marks passes through `(row, col)`.
    ///
    /// An empty or off-board cell never wins.
    pub fn check_win_through(&self, row: usize, col: usize) -> bool {
        match self.get(row, col) {
            Some(mark) if !mark.is_empty() => {
                has_run_through(&self.cells, self.size, row, col, self.win_condition)
            }
            _ => false,
        }
    }

    /// The full run through `(row, col)` if it is a winning one, ordered from
    /// one end of the line to the other.
    pub fn winning_line_through(&self, row: usize, col: usize) -> Option<Vec<Pos>> {
        if !self.check_win_through(row, col) {
            return None;
        }
        let (dr, dc) = winning_direction(&self.cells, self.size, row, col, self.win_condition)?;
        let back = count_direction(&self.cells, self.size, row, col, -dr, -dc, self.size);
        let forward = count_direction(&self.cells, self.size, row, col, dr, dc, self.size);

        // `back` steps along (-dr, -dc) stay on the board, so these never underflow.
        let start_row = row.checked_add_signed(-dr * back as isize)?;
        let start_col = col.checked_add_signed(-dc * back as isize)?;
        let line = (0..=(back + forward))
            .map(|i| {
                Pos::new(
                    start_row.wrapping_add_signed(dr * i as isize),
                    start_col.wrapping_add_signed(dc * i as isize),
                )
            })
            .collect();
        Some(line)
    }

    /// The first winning cell in row-major order, if any.
    pub fn winning_cell(&self) -> Option<Pos> {
        (0..self.cells.len())
            .filter(|&i| !self.cells[i].is_empty())
            .map(|i| Pos::new(i / self.size, i % self.size))
            .find(|pos| self.check_win_through(pos.row, pos.col))
    }

    /// The mark of the first winning cell in row-major order, if any.
    pub fn winner(&self) -> Option<Mark> {
        self.winning_cell()
            .and_then(|pos| self.get(pos.row, pos.col))
    }

    /// `WIN_SCORE` if `maximizer` has a winning run, `-WIN_SCORE` if the other
    /// player has, `0` otherwise.
    pub fn evaluate_for(&self, maximizer: Mark) -> i32 {
        match self.winner() {
            Some(mark) if mark == maximizer => WIN_SCORE,
            Some(_) => -WIN_SCORE,
            None => 0,
        }
    }

    /// [`Board::evaluate_for`] from the computer's (`O`) point of view.
    pub fn evaluate(&self) -> i32 {
        self.evaluate_for(Mark::Second)
    }

    /// Rows of marks, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Mark]> {
        self.cells.chunks(self.size)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: Vec<String> = row.iter().map(|mark| mark.symbol().to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

impl GameState for Board {
    type Move = Pos;

    fn get_possible_moves(&self) -> Vec<Self::Move> {
        self.empty_cells().collect()
    }

    fn make_move(&mut self, mv: &Self::Move, side: Side) {
        let placed = self.place(mv.row, mv.col, Mark::for_side(side));
        debug_assert!(placed.is_ok(), "engine played an illegal move {mv}");
    }

    fn evaluate(&self) -> i32 {
        Board::evaluate(self)
    }

    fn is_full(&self) -> bool {
        Board::is_full(self)
    }
}
