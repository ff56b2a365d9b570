//! # Game Controller Module - The Game Session
//!
//! [`Session`] is the single source of truth for one game. A shell (GUI, CLI
//! or test harness) hands it human moves and asks it for computer moves; the
//! session validates every move, keeps the status and the move history, and
//! is the only thing that ever writes to the real board.
//!
//! ## Architecture Overview
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                     Session                      │
//! │  • authoritative Board + GameStatus              │
//! │  • turn order, move history                      │
//! └──────────────────────────────────────────────────┘
//!        │ human_move            │ board copy     ▲ chosen cell
//!        ▼                       ▼                │
//!  ┌────────────┐        ┌───────────────────────────┐
//!  │   Shell    │        │ AIWorker (minimax thread) │
//!  └────────────┘        └───────────────────────────┘
//! ```
//!
//! ## Turn gating
//! - Once the status is terminal, every move reports [`MoveOutcome::GameOver`]
//! - While a computer search is outstanding, human moves are rejected
//! - A computer move is applied only after its search completed within the
//!   deadline; a timed-out search leaves the board and the turn unchanged

use crate::app::{AIResponse, AIWorker};
use crate::config::GameConfig;
use crate::error::{ConfigError, MoveRejection, SearchError};
use crate::games::tictactoe::{Board, Mark, Pos};
use crate::search::{Minimax, SearchResult, SearchStatistics};
use rand_xoshiro::rand_core::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

/// The mark the computer plays.
pub const COMPUTER_MARK: Mark = Mark::Second;

/// Current game status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Game is still in progress
    InProgress,
    /// Game ended with a winner
    Won(Mark),
    /// Game ended in a draw
    Draw,
}

impl GameStatus {
    /// Check if the game is over
    pub fn is_game_over(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// What happened to a requested move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move was placed at this cell.
    Accepted(Pos),
    /// The move was refused and nothing changed.
    Rejected(MoveRejection),
    /// The game is already over.
    GameOver,
}

/// The outcome of a move together with the status after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub outcome: MoveOutcome,
    pub status: GameStatus,
}

/// A single entry in the move history
#[derive(Debug, Clone)]
pub struct MoveHistoryEntry {
    /// When the move was made
    pub timestamp: SystemTime,
    /// Move number (1-indexed)
    pub move_number: usize,
    /// Mark that was placed
    pub mark: Mark,
    /// Where it was placed
    pub pos: Pos,
    /// Whether the computer chose the move
    pub by_computer: bool,
}

/// A computer search that has been handed to the worker.
#[derive(Debug, Clone, Copy)]
struct PendingSearch {
    request_id: u64,
    timeout: Duration,
    deadline: Option<Instant>,
}

/// Creates a session, or reports why the setup is invalid.
pub fn new_game(
    board_size: usize,
    win_condition: usize,
    vs_computer: bool,
) -> Result<Session, ConfigError> {
    GameConfig::new(board_size, win_condition, vs_computer).map(Session::new)
}

/// One game, from the first move to a win or a draw.
pub struct Session {
    config: GameConfig,
    board: Board,
    status: GameStatus,
    to_move: Mark,
    move_history: Vec<MoveHistoryEntry>,
    winning_line: Option<Vec<Pos>>,
    /// Present only in games against the computer.
    worker: Option<AIWorker>,
    pending: Option<PendingSearch>,
    rng: Xoshiro256PlusPlus,
}

impl Session {
    pub fn new(config: GameConfig) -> Self {
        let worker = config
            .vs_computer
            .then(|| AIWorker::new(Minimax::new(config.max_depth, config.threads)));
        let to_move = if config.vs_computer && config.computer_first {
            COMPUTER_MARK
        } else {
            Mark::First
        };

        info!(
            board_size = config.board_size,
            win_condition = config.win_condition,
            vs_computer = config.vs_computer,
            max_depth = config.max_depth,
            "new game"
        );

        Self {
            board: Board::from_config(&config),
            status: GameStatus::InProgress,
            to_move,
            move_history: Vec::new(),
            winning_line: None,
            worker,
            pending: None,
            rng: Xoshiro256PlusPlus::seed_from_u64(config.seed),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Read-only view of the board for rendering.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// The mark that moves next.
    pub fn to_move(&self) -> Mark {
        self.to_move
    }

    /// The cells of the winning run once the game is won.
    pub fn winning_line(&self) -> Option<&[Pos]> {
        self.winning_line.as_deref()
    }

    /// Get the complete move history
    pub fn move_history(&self) -> &[MoveHistoryEntry] {
        &self.move_history
    }

    /// True if the game is running and the computer is to move.
    pub fn is_computer_turn(&self) -> bool {
        self.config.vs_computer && !self.status.is_game_over() && self.to_move == COMPUTER_MARK
    }

    pub fn is_search_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Places the mark of the player to move at `(row, col)`.
    pub fn human_move(&mut self, row: usize, col: usize) -> Turn {
        if self.status.is_game_over() {
            return self.turn(MoveOutcome::GameOver);
        }
        if self.pending.is_some() {
            return self.reject(MoveRejection::SearchPending);
        }
        if self.is_computer_turn() {
            return self.reject(MoveRejection::NotYourTurn);
        }
        self.apply(Pos::new(row, col), false)
    }

    /// Runs a computer search and applies its move, waiting at most `timeout`.
    ///
    /// On [`SearchError::TimedOut`] nothing changes: it is still the computer's
    /// turn, and the shell decides whether to retry, fall back to
    /// [`Session::play_random_move`], or give up.
    pub fn request_computer_move(&mut self, timeout: Duration) -> Result<Turn, SearchError> {
        if let Some(refused) = self.begin_computer_move(timeout)? {
            return Ok(refused);
        }
        let Some(pending) = self.pending else {
            return Err(SearchError::WorkerUnavailable);
        };
        let Some(worker) = self.worker.as_mut() else {
            self.pending = None;
            return Err(SearchError::WorkerUnavailable);
        };

        let waited = worker.wait_for(pending.request_id, timeout);
        self.pending = None;
        let (result, stats) = waited?;
        Ok(self.finish_computer_move(result, stats))
    }

    /// Starts a computer search in the background and returns immediately.
    ///
    /// Returns `Ok(None)` once the search is running; poll it with
    /// [`Session::poll_computer_move`]. Returns `Ok(Some(turn))` without
    /// starting anything if the computer cannot move now.
    pub fn begin_computer_move(&mut self, timeout: Duration) -> Result<Option<Turn>, SearchError> {
        if self.status.is_game_over() {
            return Ok(Some(self.turn(MoveOutcome::GameOver)));
        }
        if self.pending.is_some() {
            return Ok(Some(self.reject(MoveRejection::SearchPending)));
        }
        if !self.is_computer_turn() {
            return Ok(Some(self.reject(MoveRejection::NotComputerTurn)));
        }
        let worker = self.worker.as_mut().ok_or(SearchError::WorkerUnavailable)?;

        let request_id = worker.start_search(self.board.clone())?;
        self.pending = Some(PendingSearch {
            request_id,
            timeout,
            deadline: Instant::now().checked_add(timeout),
        });
        Ok(None)
    }

    /// Checks on a search started with [`Session::begin_computer_move`].
    ///
    /// Returns `None` while it is still running and inside its deadline. A
    /// result is applied only if the search finished before the deadline, no
    /// matter how late it is polled.
    pub fn poll_computer_move(&mut self) -> Option<Result<Turn, SearchError>> {
        let pending = self.pending?;
        let Some(worker) = self.worker.as_mut() else {
            self.pending = None;
            return Some(Err(SearchError::WorkerUnavailable));
        };

        match worker.try_recv() {
            Ok(Some(AIResponse::Move {
                result,
                stats,
                finished_at,
                ..
            })) => {
                self.pending = None;
                // A result that arrives late is only usable if the search beat its deadline.
                if pending.deadline.is_some_and(|deadline| finished_at >= deadline) {
                    warn!(request_id = pending.request_id, timeout = ?pending.timeout, "search finished after its deadline");
                    return Some(Err(SearchError::TimedOut {
                        timeout: pending.timeout,
                    }));
                }
                Some(Ok(self.finish_computer_move(result, stats)))
            }
            Ok(Some(AIResponse::Cancelled { .. })) => {
                self.pending = None;
                Some(Err(SearchError::TimedOut {
                    timeout: pending.timeout,
                }))
            }
            Ok(None) => {
                let expired = pending
                    .deadline
                    .is_some_and(|deadline| Instant::now() >= deadline);
                if !expired {
                    return None;
                }
                warn!(request_id = pending.request_id, timeout = ?pending.timeout, "search timed out");
                worker.cancel();
                self.pending = None;
                Some(Err(SearchError::TimedOut {
                    timeout: pending.timeout,
                }))
            }
            Err(err) => {
                self.pending = None;
                Some(Err(err))
            }
        }
    }

    /// Plays a uniformly random empty cell for the computer.
    pub fn play_random_move(&mut self) -> Turn {
        if self.status.is_game_over() {
            return self.turn(MoveOutcome::GameOver);
        }
        if self.pending.is_some() {
            return self.reject(MoveRejection::SearchPending);
        }
        if !self.is_computer_turn() {
            return self.reject(MoveRejection::NotComputerTurn);
        }
        self.random_move()
    }

    fn random_move(&mut self) -> Turn {
        let empties: Vec<Pos> = self.board.empty_cells().collect();
        if empties.is_empty() {
            return self.turn(MoveOutcome::GameOver);
        }
        let index = (self.rng.next_u64() % empties.len() as u64) as usize;
        debug!(pos = %empties[index], "random computer move");
        self.apply(empties[index], true)
    }

    fn finish_computer_move(
        &mut self,
        result: SearchResult<Pos>,
        stats: SearchStatistics,
    ) -> Turn {
        debug!(
            score = result.score,
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "computer search complete"
        );
        match result.best_move {
            Some(pos) => self.apply(pos, true),
            None => {
                warn!("search returned no move, playing a random cell");
                self.random_move()
            }
        }
    }

    /// Places the mark of the player to move and advances the game.
    fn apply(&mut self, pos: Pos, by_computer: bool) -> Turn {
        let mark = self.to_move;
        if let Err(err) = self.board.place(pos.row, pos.col, mark) {
            return self.reject(err.into());
        }

        self.move_history.push(MoveHistoryEntry {
            timestamp: SystemTime::now(),
            move_number: self.move_history.len() + 1,
            mark,
            pos,
            by_computer,
        });
        debug!(%mark, %pos, by_computer, "move applied");

        if self.board.check_win_through(pos.row, pos.col) {
            self.status = GameStatus::Won(mark);
            self.winning_line = self.board.winning_line_through(pos.row, pos.col);
            info!(winner = %mark, moves = self.move_history.len(), "game won");
        } else if self.board.is_full() {
            self.status = GameStatus::Draw;
            info!(moves = self.move_history.len(), "game drawn");
        } else {
            self.to_move = mark.opponent();
        }

        self.turn(MoveOutcome::Accepted(pos))
    }

    fn reject(&self, reason: MoveRejection) -> Turn {
        warn!(%reason, "move rejected");
        self.turn(MoveOutcome::Rejected(reason))
    }

    fn turn(&self, outcome: MoveOutcome) -> Turn {
        Turn {
            outcome,
            status: self.status,
        }
    }

    /// Human-readable name of the player using `mark`.
    pub fn player_name(&self, mark: Mark) -> String {
        if self.config.vs_computer && mark == COMPUTER_MARK {
            format!("{mark} (computer)")
        } else {
            mark.to_string()
        }
    }

    /// Move history as plain text, with the result once the game is over.
    pub fn format_history(&self) -> String {
        let mut output = format!(
            "=== Tic-Tac-Toe {n}x{n}, {k} in a row ===\n\n",
            n = self.board.size(),
            k = self.board.win_condition()
        );

        if self.move_history.is_empty() {
            output.push_str("No moves made yet.\n");
        }
        for entry in &self.move_history {
            output.push_str(&format!(
                "{}. {} - {}\n",
                entry.move_number,
                self.player_name(entry.mark),
                entry.pos
            ));
        }

        match self.status {
            GameStatus::Won(winner) => {
                output.push_str(&format!("\nResult: {} wins!\n", self.player_name(winner)));
            }
            GameStatus::Draw => {
                output.push_str("\nResult: Draw\n");
            }
            GameStatus::InProgress => {
                output.push_str(&format!(
                    "\n(Game in progress - {} to move)\n",
                    self.player_name(self.to_move)
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaceError;

    const LONG: Duration = Duration::from_secs(60);

    fn two_humans(n: usize, k: usize) -> Session {
        new_game(n, k, false).unwrap()
    }

    fn play(session: &mut Session, moves: &[(usize, usize)]) -> Turn {
        let mut last = None;
        for &(row, col) in moves {
            let turn = session.human_move(row, col);
            assert_eq!(turn.outcome, MoveOutcome::Accepted(Pos::new(row, col)));
            last = Some(turn);
        }
        last.unwrap()
    }

    #[test]
    fn test_new_game_rejects_bad_config() {
        assert!(matches!(new_game(2, 3, true), Err(ConfigError::BoardTooSmall(2))));
        assert!(matches!(
            new_game(5, 6, true),
            Err(ConfigError::WinConditionTooLarge { .. })
        ));
    }

    #[test]
    fn test_players_alternate() {
        let mut session = two_humans(3, 3);
        assert_eq!(session.to_move(), Mark::First);
        play(&mut session, &[(0, 0), (1, 1)]);
        assert_eq!(session.board().get(0, 0), Some(Mark::First));
        assert_eq!(session.board().get(1, 1), Some(Mark::Second));
        assert_eq!(session.to_move(), Mark::First);
        assert_eq!(session.move_history().len(), 2);
        assert_eq!(session.move_history()[1].move_number, 2);
    }

    #[test]
    fn test_rejected_move_changes_nothing() {
        let mut session = two_humans(3, 3);
        play(&mut session, &[(0, 0)]);
        let before = session.board().clone();

        let turn = session.human_move(0, 0);
        assert_eq!(
            turn.outcome,
            MoveOutcome::Rejected(MoveRejection::Place(PlaceError::Occupied { row: 0, col: 0 }))
        );
        let turn = session.human_move(0, 3);
        assert!(matches!(
            turn.outcome,
            MoveOutcome::Rejected(MoveRejection::Place(PlaceError::OutOfBounds { .. }))
        ));

        assert_eq!(session.board(), &before);
        assert_eq!(session.to_move(), Mark::Second);
        assert_eq!(session.move_history().len(), 1);
    }

    #[test]
    fn test_win_is_terminal() {
        let mut session = two_humans(3, 3);
        let turn = play(&mut session, &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)]);
        assert_eq!(turn.status, GameStatus::Won(Mark::First));
        assert_eq!(
            session.winning_line(),
            Some(&[Pos::new(0, 0), Pos::new(0, 1), Pos::new(0, 2)][..])
        );

        let before = session.board().clone();
        let turn = session.human_move(2, 2);
        assert_eq!(turn.outcome, MoveOutcome::GameOver);
        assert_eq!(turn.status, GameStatus::Won(Mark::First));
        assert_eq!(session.board(), &before);
    }

    #[test]
    fn test_draw() {
        let mut session = two_humans(3, 3);
        // X O X / X O O / O X X
        let turn = play(
            &mut session,
            &[(0, 0), (0, 1), (0, 2), (1, 1), (1, 0), (1, 2), (2, 1), (2, 0), (2, 2)],
        );
        assert_eq!(turn.status, GameStatus::Draw);
        assert_eq!(session.human_move(0, 0).outcome, MoveOutcome::GameOver);
    }

    #[test]
    fn test_two_humans_have_no_computer() {
        let mut session = two_humans(3, 3);
        let turn = session.request_computer_move(LONG).unwrap();
        assert_eq!(turn.outcome, MoveOutcome::Rejected(MoveRejection::NotComputerTurn));
        assert_eq!(
            session.play_random_move().outcome,
            MoveOutcome::Rejected(MoveRejection::NotComputerTurn)
        );
    }

    #[test]
    fn test_vs_computer_turns() {
        let mut session = new_game(3, 3, true).unwrap();

        let turn = session.request_computer_move(LONG).unwrap();
        assert_eq!(turn.outcome, MoveOutcome::Rejected(MoveRejection::NotComputerTurn));

        play(&mut session, &[(1, 1)]);
        assert!(session.is_computer_turn());
        let turn = session.human_move(0, 0);
        assert_eq!(turn.outcome, MoveOutcome::Rejected(MoveRejection::NotYourTurn));

        let turn = session.request_computer_move(LONG).unwrap();
        let MoveOutcome::Accepted(pos) = turn.outcome else {
            panic!("computer move was not applied: {turn:?}");
        };
        assert_eq!(session.board().get(pos.row, pos.col), Some(Mark::Second));
        assert!(!session.is_computer_turn());
        assert!(session.move_history()[1].by_computer);
    }

    #[test]
    fn test_computer_blocks_threat() {
        // X threatens a line O has not touched yet; O has to block it.
        let mut session = new_game(3, 3, true).unwrap();
        play(&mut session, &[(0, 0)]);
        session.play_random_move();
        let taken = session.move_history()[1].pos;
        let (a, b) = if taken.row == 0 { ((1, 0), (2, 0)) } else { ((0, 1), (0, 2)) };
        play(&mut session, &[a]);
        assert!(session.is_computer_turn());

        let turn = session.request_computer_move(LONG).unwrap();
        assert_eq!(turn.outcome, MoveOutcome::Accepted(Pos::new(b.0, b.1)));
        assert_eq!(turn.status, GameStatus::InProgress);
    }

    #[test]
    fn test_computer_first() {
        let config = GameConfig::new(3, 3, true).unwrap().with_computer_first(true);
        let mut session = Session::new(config);
        assert!(session.is_computer_turn());
        let turn = session.request_computer_move(LONG).unwrap();
        assert_eq!(turn.outcome, MoveOutcome::Accepted(Pos::new(0, 0)));
        assert_eq!(session.to_move(), Mark::First);
    }

    #[test]
    fn test_pending_search_blocks_human() {
        let mut session = new_game(3, 3, true).unwrap();
        play(&mut session, &[(1, 1)]);

        assert_eq!(session.begin_computer_move(LONG).unwrap(), None);
        assert!(session.is_search_pending());
        let turn = session.human_move(0, 0);
        assert_eq!(turn.outcome, MoveOutcome::Rejected(MoveRejection::SearchPending));
        assert_eq!(
            session.begin_computer_move(LONG).unwrap().map(|t| t.outcome),
            Some(MoveOutcome::Rejected(MoveRejection::SearchPending))
        );

        let start = Instant::now();
        let turn = loop {
            if let Some(result) = session.poll_computer_move() {
                break result.unwrap();
            }
            assert!(start.elapsed() < LONG, "search never finished");
            std::thread::sleep(Duration::from_millis(1));
        };
        assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
        assert!(!session.is_search_pending());
        assert_eq!(session.poll_computer_move(), None);
    }

    #[test]
    fn test_random_move_is_seeded() {
        let config = GameConfig::new(5, 4, true).unwrap().with_seed(7);
        let mut a = Session::new(config.clone());
        let mut b = Session::new(config);
        for session in [&mut a, &mut b] {
            play(session, &[(2, 2)]);
            let turn = session.play_random_move();
            assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
        }
        assert_eq!(a.board(), b.board());
        assert_eq!(a.board().occupied_count(), 2);
        assert_eq!(a.to_move(), Mark::First);
    }

    #[test]
    fn test_format_history() {
        let mut session = new_game(3, 3, true).unwrap();
        assert!(session.format_history().contains("No moves made yet."));
        play(&mut session, &[(1, 1)]);

        let history = session.format_history();
        assert!(history.contains("Tic-Tac-Toe 3x3, 3 in a row"));
        assert!(history.contains("1. X - (1,1)"));
        assert!(history.contains("O (computer) to move"));
    }
}
