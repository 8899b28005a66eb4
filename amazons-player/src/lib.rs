//! Match-playing layer for the Amazons engine
//!
//! This crate turns the search machinery of `amazons-search` into a
//! playable opponent:
//! - `Session`: one match worth of state (canonical board, shared tree,
//!   worker threads) with turn-taking entry points
//! - `MoveMessage`: the wire form of a chosen move
//! - `MoveSink`: the transmission seam the embedder implements
//!
//! The embedder drives the session from its server loop: call
//! [`Session::apply_opponent_move`] when the opponent's move arrives and
//! [`Session::take_turn`] when it is the engine's turn to play.

pub mod message;
pub mod session;

// Re-export main types for convenience
pub use message::{MoveMessage, MoveSink};
pub use session::{Session, SessionError};
