//! A computer move that misses its deadline is reported to the caller and
//! leaves the session playable.

use std::thread;
use std::time::{Duration, Instant};
use tictactoe::{GameConfig, GameStatus, Mark, MoveOutcome, SearchError, Session};

const TIGHT: Duration = Duration::from_millis(50);

/// A board far too large to search to depth 6 within `TIGHT`.
fn slow_session() -> Session {
    let config = GameConfig::new(7, 4, true)
        .unwrap()
        .with_max_depth(6)
        .unwrap()
        .with_seed(42);
    let mut session = Session::new(config);
    let turn = session.human_move(3, 3);
    assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
    session
}

#[test]
fn blocking_request_times_out_and_recovers() {
    let mut session = slow_session();
    let before = session.board().clone();

    let err = session.request_computer_move(TIGHT).unwrap_err();
    assert_eq!(err, SearchError::TimedOut { timeout: TIGHT });
    assert_eq!(session.board(), &before);
    assert!(session.is_computer_turn());
    assert!(!session.is_search_pending());
    assert_eq!(session.status(), GameStatus::InProgress);

    let turn = session.play_random_move();
    assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
    assert_eq!(session.board().occupied_count(), 2);
    assert_eq!(session.to_move(), Mark::First);
}

#[test]
fn polled_request_times_out() {
    let mut session = slow_session();
    assert_eq!(session.begin_computer_move(TIGHT).unwrap(), None);

    let start = Instant::now();
    let result = loop {
        if let Some(result) = session.poll_computer_move() {
            break result;
        }
        assert!(start.elapsed() < Duration::from_secs(30), "deadline never fired");
        thread::sleep(Duration::from_millis(5));
    };

    assert_eq!(result, Err(SearchError::TimedOut { timeout: TIGHT }));
    assert!(start.elapsed() >= TIGHT);
    assert!(!session.is_search_pending());
    assert!(session.is_computer_turn());
    assert_eq!(session.board().occupied_count(), 1);
}

#[test]
fn same_session_answers_after_timeout() {
    let mut session = Session::new(GameConfig::new(5, 4, true).unwrap());
    session.human_move(2, 2);

    let err = session.request_computer_move(Duration::ZERO).unwrap_err();
    assert_eq!(err, SearchError::TimedOut { timeout: Duration::ZERO });
    assert_eq!(session.board().occupied_count(), 1);

    let turn = session.request_computer_move(Duration::from_secs(60)).unwrap();
    assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
    assert_eq!(session.board().occupied_count(), 2);
    assert_eq!(session.move_history().len(), 2);
    assert!(session.move_history()[1].by_computer);
}

#[test]
fn late_poll_discards_result_finished_after_deadline() {
    let mut session = Session::new(GameConfig::new(3, 3, true).unwrap());
    session.human_move(1, 1);
    let before = session.board().clone();

    assert_eq!(session.begin_computer_move(Duration::ZERO).unwrap(), None);
    // Long enough for the 3x3 search to have finished and been delivered.
    thread::sleep(Duration::from_secs(2));

    let result = session.poll_computer_move();
    assert_eq!(result, Some(Err(SearchError::TimedOut { timeout: Duration::ZERO })));
    assert_eq!(session.board(), &before);
    assert!(session.is_computer_turn());
    assert!(!session.is_search_pending());
    assert_eq!(session.move_history().len(), 1);
}

#[test]
fn late_poll_applies_result_finished_in_time() {
    let mut session = Session::new(GameConfig::new(3, 3, true).unwrap());
    session.human_move(1, 1);

    assert_eq!(session.begin_computer_move(Duration::from_secs(60)).unwrap(), None);
    thread::sleep(Duration::from_millis(500));

    let start = Instant::now();
    let turn = loop {
        if let Some(result) = session.poll_computer_move() {
            break result.unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(30), "search never finished");
        thread::sleep(Duration::from_millis(5));
    };
    assert!(matches!(turn.outcome, MoveOutcome::Accepted(_)));
    assert_eq!(session.board().occupied_count(), 2);
    assert_eq!(session.to_move(), Mark::First);
}
