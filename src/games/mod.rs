//! # Game Implementations Module
//!
//! Games the minimax engine can play. Each one implements the
//! [`GameState`](crate::GameState) trait, which gives the engine:
//! - Move generation in a fixed scan order
//! - Applying a move for the maximizing or minimizing side
//! - Static evaluation of won positions
//! - Detection of a full board
//!
//! ## Supported Games
//! - **Tic-Tac-Toe**: N×N board, K marks in a row to win

pub mod tictactoe;
