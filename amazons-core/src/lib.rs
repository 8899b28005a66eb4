//! Board model, rules, and heuristics for the Game of the Amazons
//!
//! This crate holds everything about the game itself and nothing about
//! searching it:
//! - `board`: the 11x11 indexed grid (rows and columns 1..=10 playable),
//!   tiles, sides, and positions
//! - `moves`: the queen-move-plus-arrow move type and legal move generation
//! - `state`: the position snapshot, move application, terminal detection,
//!   and the packed position fingerprint
//! - `eval`: first-degree, count, and territory heuristics and their
//!   weighted blend
//!
//! Everything is synchronous and cheap to clone; the concurrent search
//! crates drive these types from many threads by cloning states.

pub mod board;
pub mod eval;
pub mod moves;
pub mod state;

pub use board::{Position, Side, Tile, DIRECTIONS, GRID, TILE_COUNT};
pub use eval::EvalWeights;
pub use moves::{generate_moves, Move};
pub use state::{Fingerprint, GameState};
