//! # Background AI Worker
//!
//! Runs computer searches off the caller's thread so a shell can stay
//! responsive, and enforces the per-move deadline.
//!
//! ## Ownership
//! Each request carries its own copy of the board. The worker never sees the
//! session's board and the session never sees the worker's, so neither side
//! can observe the other mid-move.
//!
//! ## Cancellation
//! Every request gets a fresh stop flag. When a deadline passes, or a newer
//! request replaces an older one, the flag is raised and the search unwinds
//! at its next node. Responses carry their request id, and anything that is
//! not the current request is dropped on arrival.

use crate::error::SearchError;
use crate::games::tictactoe::{Board, Pos};
use crate::search::{Minimax, SearchResult, SearchStatistics};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Messages sent to the AI worker thread
#[derive(Debug)]
pub enum AIRequest {
    /// Search `board` for the computer's move.
    Search {
        request_id: u64,
        board: Board,
        stop: Arc<AtomicBool>,
    },
    /// Stop the worker thread
    Stop,
}

/// Messages received from the AI worker thread
#[derive(Debug)]
pub enum AIResponse {
    /// The search finished at `finished_at`.
    Move {
        request_id: u64,
        result: SearchResult<Pos>,
        stats: SearchStatistics,
        finished_at: Instant,
    },
    /// The search was stopped before it finished.
    Cancelled { request_id: u64 },
}

impl AIResponse {
    pub fn request_id(&self) -> u64 {
        match self {
            AIResponse::Move { request_id, .. } | AIResponse::Cancelled { request_id } => {
                *request_id
            }
        }
    }
}

/// The AI worker that runs in a separate thread
///
/// One search runs at a time; a new request cancels the one before it.
pub struct AIWorker {
    handle: Option<JoinHandle<()>>,
    tx_req: Sender<AIRequest>,
    rx_resp: Receiver<AIResponse>,
    next_request_id: u64,
    /// Id and stop flag of the outstanding request, if any.
    current: Option<(u64, Arc<AtomicBool>)>,
}

impl AIWorker {
    pub fn new(engine: Minimax) -> Self {
        let (tx_req, rx_req) = mpsc::channel::<AIRequest>();
        let (tx_resp, rx_resp) = mpsc::channel();

        let handle = thread::spawn(move || {
            for request in rx_req {
                match request {
                    AIRequest::Search {
                        request_id,
                        board,
                        stop,
                    } => {
                        let response = match engine.search_with_stop(&board, Some(&stop)) {
                            Some((result, stats)) => AIResponse::Move {
                                request_id,
                                result,
                                stats,
                                finished_at: Instant::now(),
                            },
                            None => AIResponse::Cancelled { request_id },
                        };
                        if tx_resp.send(response).is_err() {
                            break;
                        }
                    }
                    AIRequest::Stop => break,
                }
            }
        });

        Self {
            handle: Some(handle),
            tx_req,
            rx_resp,
            next_request_id: 0,
            current: None,
        }
    }

    /// Queues a search of `board` and returns its request id.
    ///
    /// Any outstanding search is cancelled first.
    pub fn start_search(&mut self, board: Board) -> Result<u64, SearchError> {
        self.cancel();

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let stop = Arc::new(AtomicBool::new(false));

        self.tx_req
            .send(AIRequest::Search {
                request_id,
                board,
                stop: stop.clone(),
            })
            .map_err(|_| SearchError::WorkerUnavailable)?;

        debug!(request_id, "search queued");
        self.current = Some((request_id, stop));
        Ok(request_id)
    }

    /// True while a request is outstanding.
    pub fn is_searching(&self) -> bool {
        self.current.is_some()
    }

    /// Raises the stop flag of the outstanding request, if any.
    pub fn cancel(&mut self) {
        if let Some((request_id, stop)) = self.current.take() {
            stop.store(true, Ordering::Relaxed);
            debug!(request_id, "search cancelled");
        }
    }

    /// Takes the response to the outstanding request without blocking.
    ///
    /// Responses to older requests are discarded.
    pub fn try_recv(&mut self) -> Result<Option<AIResponse>, SearchError> {
        loop {
            match self.rx_resp.try_recv() {
                Ok(response) => {
                    if self.is_current(&response) {
                        self.current = None;
                        return Ok(Some(response));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(SearchError::WorkerUnavailable),
            }
        }
    }

    /// Blocks until request `request_id` finishes or `timeout` passes.
    ///
    /// On timeout the search is cancelled and the worker stays usable.
    pub fn wait_for(
        &mut self,
        request_id: u64,
        timeout: Duration,
    ) -> Result<(SearchResult<Pos>, SearchStatistics), SearchError> {
        let deadline = Instant::now().checked_add(timeout);

        loop {
            let received = match deadline {
                Some(deadline) => self
                    .rx_resp
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => self
                    .rx_resp
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(response) if response.request_id() == request_id => {
                    self.current = None;
                    return match response {
                        AIResponse::Move { result, stats, .. } => Ok((result, stats)),
                        AIResponse::Cancelled { .. } => Err(SearchError::TimedOut { timeout }),
                    };
                }
                Ok(stale) => {
                    debug!(request_id = stale.request_id(), "dropping stale response");
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(request_id, ?timeout, "search timed out");
                    self.cancel();
                    return Err(SearchError::TimedOut { timeout });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(SearchError::WorkerUnavailable),
            }
        }
    }

    fn is_current(&self, response: &AIResponse) -> bool {
        self.current
            .as_ref()
            .is_some_and(|(id, _)| *id == response.request_id())
    }
}

impl Drop for AIWorker {
    fn drop(&mut self) {
        // Interrupt any running search, then break the worker loop
        self.cancel();
        self.tx_req.send(AIRequest::Stop).ok();

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_board() -> Board {
        let mut board = Board::new(7, 4).unwrap();
        board.place(3, 3, crate::Mark::First).unwrap();
        board
    }

    #[test]
    fn test_search_matches_engine() {
        let board = Board::from_rows(&["X..", ".X.", "OO."], 3).unwrap();
        let expected = Minimax::default().search(&board);

        let mut worker = AIWorker::new(Minimax::default());
        let id = worker.start_search(board).unwrap();
        let (result, stats) = worker.wait_for(id, Duration::from_secs(30)).unwrap();
        assert_eq!(result, expected);
        assert!(stats.nodes > 0);
        assert!(!worker.is_searching());
    }

    #[test]
    fn test_timeout_then_reuse() {
        let mut worker = AIWorker::new(Minimax::new(6, 1));

        let id = worker.start_search(big_board()).unwrap();
        let err = worker.wait_for(id, Duration::from_millis(20)).unwrap_err();
        assert_eq!(err, SearchError::TimedOut { timeout: Duration::from_millis(20) });
        assert!(!worker.is_searching());

        let small = Board::from_rows(&["X..", ".X.", "OO."], 3).unwrap();
        let id = worker.start_search(small).unwrap();
        let (result, _) = worker.wait_for(id, Duration::from_secs(30)).unwrap();
        assert_eq!(result.best_move, Some(Pos::new(2, 2)));
    }

    #[test]
    fn test_new_request_replaces_old() {
        let mut worker = AIWorker::new(Minimax::new(6, 1));
        let old = worker.start_search(big_board()).unwrap();

        let small = Board::from_rows(&["X..", ".X.", "O.."], 3).unwrap();
        let new = worker.start_search(small).unwrap();
        assert!(new > old);

        let (result, _) = worker.wait_for(new, Duration::from_secs(30)).unwrap();
        assert_eq!(result.best_move, Some(Pos::new(2, 2)));
    }

    #[test]
    fn test_try_recv_polling() {
        let mut worker = AIWorker::new(Minimax::default());
        let board = Board::from_rows(&["XOX", "XOO", "OX."], 3).unwrap();
        let queued = Instant::now();
        let id = worker.start_search(board).unwrap();

        let start = Instant::now();
        let response = loop {
            if let Some(response) = worker.try_recv().unwrap() {
                break response;
            }
            assert!(start.elapsed() < Duration::from_secs(30), "worker never answered");
            thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(response.request_id(), id);
        let AIResponse::Move { result, finished_at, .. } = response else {
            panic!("search was not completed");
        };
        assert_eq!(result.best_move, Some(Pos::new(2, 2)));
        assert!(finished_at >= queued);
        assert!(finished_at <= Instant::now());
    }
}
