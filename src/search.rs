//! # Bounded-Depth Minimax
//!
//! Plain minimax over any [`GameState`], cut off at a fixed horizon.
//!
//! ## Scoring
//! - A won position scores `WIN_SCORE - depth` for the maximizer and
//!   `-WIN_SCORE + depth` for the minimizer, so faster wins and slower losses
//!   are preferred
//! - A full board, or any position at the horizon, scores `0`. Past the
//!   horizon nothing is seen, so `0` is a cutoff value rather than a proven draw
//!
//! ## Branching
//! Children are built by cloning the parent and applying one move. The caller's
//! state is only ever borrowed immutably, so a search cannot leave a
//! speculative mark behind on any exit path.
//!
//! ## Parallel root
//! With more than one thread, the children of the root are scored on a rayon
//! pool. Scores are collected in scan order and reduced with the same strict
//! comparisons as the sequential search, so the chosen move never depends on
//! the thread count or on scheduling.

use crate::{GameState, Side, WIN_SCORE};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Score and best move of one searched position.
///
/// `best_move` is `None` when the position was terminal, at the horizon, or
/// had no legal move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult<M> {
    pub score: i32,
    pub best_move: Option<M>,
}

impl<M> SearchResult<M> {
    fn leaf(score: i32) -> Self {
        SearchResult {
            score,
            best_move: None,
        }
    }
}

/// Statistics about one completed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStatistics {
    /// Positions visited, root included.
    pub nodes: u64,
    pub elapsed: Duration,
    pub max_depth: u32,
    pub threads: usize,
}

impl SearchStatistics {
    pub fn nodes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.nodes as f64 / secs
        } else {
            self.nodes as f64
        }
    }
}

/// Shared state of one search call.
struct SearchContext<'a> {
    stop: Option<&'a AtomicBool>,
    nodes: AtomicU64,
}

impl<'a> SearchContext<'a> {
    fn new(stop: Option<&'a AtomicBool>) -> Self {
        SearchContext {
            stop,
            nodes: AtomicU64::new(0),
        }
    }

    fn is_stopped(&self) -> bool {
        self.stop.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn count_node(&self) {
        self.nodes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Running best of a node's children. Ties keep the earliest-scanned move.
struct Best<M> {
    side: Side,
    score: i32,
    best_move: Option<M>,
}

impl<M> Best<M> {
    fn new(side: Side) -> Self {
        let score = if side.is_maximizing() { i32::MIN } else { i32::MAX };
        Best {
            side,
            score,
            best_move: None,
        }
    }

    fn offer(&mut self, score: i32, mv: M) {
        let better = match self.side {
            Side::Maximizing => score > self.score,
            Side::Minimizing => score < self.score,
        };
        if better {
            self.score = score;
            self.best_move = Some(mv);
        }
    }

    fn finish(self) -> SearchResult<M> {
        match self.best_move {
            Some(mv) => SearchResult {
                score: self.score,
                best_move: Some(mv),
            },
            None => SearchResult::leaf(0),
        }
    }
}

/// The minimax engine.
pub struct Minimax {
    /// Depth at which the search stops and scores `0`.
    max_depth: u32,
    /// Pool for the root split. `None` searches on the calling thread.
    pool: Option<ThreadPool>,
}

impl Minimax {
    /// Creates a new engine.
    ///
    /// # Arguments
    /// * `max_depth` - The search horizon in plies.
    /// * `num_threads` - Threads for the root split. 1 searches on the calling
    ///   thread; 0 lets rayon pick.
    pub fn new(max_depth: u32, num_threads: usize) -> Self {
        let pool = if num_threads == 1 {
            None
        } else {
            let pool_builder = ThreadPoolBuilder::new().thread_name(|i| format!("minimax-{i}"));
            let pool_builder = if num_threads > 0 {
                pool_builder.num_threads(num_threads)
            } else {
                pool_builder
            };
            match pool_builder.build() {
                Ok(pool) => Some(pool),
                Err(err) => {
                    warn!(%err, "could not build search thread pool, searching on one thread");
                    None
                }
            }
        };
        Minimax { max_depth, pool }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of threads a search runs on.
    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    /// Searches from the root: depth 0, the maximizing side to move.
    pub fn search<S: GameState>(&self, state: &S) -> SearchResult<S::Move> {
        self.search_at(state, 0, true)
    }

    /// Searches `state` as if `depth` plies had already been played, with
    /// `maximizing` telling which side is to move.
    pub fn search_at<S: GameState>(
        &self,
        state: &S,
        depth: u32,
        maximizing: bool,
    ) -> SearchResult<S::Move> {
        let ctx = SearchContext::new(None);
        // Without a stop flag the search always completes.
        self.root(state, depth, Side::from_maximizing(maximizing), &ctx)
            .unwrap_or(SearchResult::leaf(0))
    }

    /// Root search that gives up as soon as `stop` is raised.
    ///
    /// Returns `None` if the search was stopped before it finished.
    pub fn search_with_stop<S: GameState>(
        &self,
        state: &S,
        stop: Option<&AtomicBool>,
    ) -> Option<(SearchResult<S::Move>, SearchStatistics)> {
        let start = Instant::now();
        let ctx = SearchContext::new(stop);
        let result = self.root(state, 0, Side::Maximizing, &ctx);
        let stats = SearchStatistics {
            nodes: ctx.nodes.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
            max_depth: self.max_depth,
            threads: self.threads(),
        };

        match result {
            Some(result) => {
                debug!(
                    nodes = stats.nodes,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    score = result.score,
                    best_move = ?result.best_move,
                    "search finished"
                );
                Some((result, stats))
            }
            None => {
                debug!(nodes = stats.nodes, "search stopped");
                None
            }
        }
    }

    /// Counts the node and returns its score if the search ends here.
    fn leaf_score<S: GameState>(&self, state: &S, depth: u32, ctx: &SearchContext) -> Option<i32> {
        ctx.count_node();
        let depth_adjust = depth as i32;
        match state.evaluate() {
            WIN_SCORE => Some(WIN_SCORE - depth_adjust),
            score if score == -WIN_SCORE => Some(-WIN_SCORE + depth_adjust),
            _ if state.is_full() || depth >= self.max_depth => Some(0),
            _ => None,
        }
    }

    fn child<S: GameState>(state: &S, mv: &S::Move, side: Side) -> S {
        let mut child = state.clone();
        child.make_move(mv, side);
        child
    }

    /// Root node: like [`Minimax::node`] but scores the children on the pool.
    fn root<S: GameState>(
        &self,
        state: &S,
        depth: u32,
        side: Side,
        ctx: &SearchContext,
    ) -> Option<SearchResult<S::Move>> {
        let Some(pool) = &self.pool else {
            return self.node(state, depth, side, ctx);
        };

        if ctx.is_stopped() {
            return None;
        }
        if let Some(score) = self.leaf_score(state, depth, ctx) {
            return Some(SearchResult::leaf(score));
        }

        let moves = state.get_possible_moves();
        let scores: Vec<Option<i32>> = pool.install(|| {
            moves
                .par_iter()
                .map(|mv| {
                    let child = Self::child(state, mv, side);
                    self.node(&child, depth + 1, side.opponent(), ctx)
                        .map(|result| result.score)
                })
                .collect()
        });

        let mut best = Best::new(side);
        for (mv, score) in moves.into_iter().zip(scores) {
            best.offer(score?, mv);
        }
        Some(best.finish())
    }

    /// Sequential minimax below the root.
    fn node<S: GameState>(
        &self,
        state: &S,
        depth: u32,
        side: Side,
        ctx: &SearchContext,
    ) -> Option<SearchResult<S::Move>> {
        if ctx.is_stopped() {
            return None;
        }
        if let Some(score) = self.leaf_score(state, depth, ctx) {
            return Some(SearchResult::leaf(score));
        }

        let mut best = Best::new(side);
        for mv in state.get_possible_moves() {
            let child = Self::child(state, &mv, side);
            let result = self.node(&child, depth + 1, side.opponent(), ctx)?;
            best.offer(result.score, mv);
        }
        Some(best.finish())
    }
}

impl Default for Minimax {
    fn default() -> Self {
        Minimax::new(crate::DEFAULT_MAX_DEPTH, 1)
    }
}
