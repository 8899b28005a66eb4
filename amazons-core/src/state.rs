//! Game state: the canonical position snapshot and its fingerprint.

use crate::board::{Position, Side, Tile, TILE_COUNT};
use crate::moves::{self, Move};

const QUEENS_PER_SIDE: usize = 4;

const WHITE_START: [Position; QUEENS_PER_SIDE] = [
    Position::new(1, 4),
    Position::new(1, 7),
    Position::new(4, 1),
    Position::new(4, 10),
];

const BLACK_START: [Position; QUEENS_PER_SIDE] = [
    Position::new(10, 4),
    Position::new(10, 7),
    Position::new(7, 1),
    Position::new(7, 10),
];

/// Canonical identity of a position, packed 2 bits per tile.
///
/// The tile configuration alone is canonical: every half-move adds exactly
/// one arrow, so equal tiles imply equal ply and therefore equal side to
/// move. 121 tiles at 2 bits fit in four words with no truncation and no
/// hash collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u64; 4]);

/// A full position snapshot: tiles, queen locations per side, and the ply
/// counter (half-moves played since the initial position).
///
/// Cloning yields a fully independent copy; search strategies clone before
/// every branch so concurrent explorers never share a mutable board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    tiles: [Tile; TILE_COUNT],
    white: [Position; QUEENS_PER_SIDE],
    black: [Position; QUEENS_PER_SIDE],
    ply: u32,
}

impl GameState {
    /// The standard initial position. White moves first.
    pub fn new_game() -> GameState {
        let mut tiles = [Tile::Empty; TILE_COUNT];
        for q in WHITE_START {
            tiles[q.index()] = Tile::White;
        }
        for q in BLACK_START {
            tiles[q.index()] = Tile::Black;
        }
        GameState {
            tiles,
            white: WHITE_START,
            black: BLACK_START,
            ply: 0,
        }
    }

    /// Build a state from a raw tile grid, e.g. an initial board received
    /// from a server. Returns `None` unless each side has exactly four
    /// queens on playable squares.
    pub fn from_tiles(tiles: [Tile; TILE_COUNT], ply: u32) -> Option<GameState> {
        let mut white = Vec::with_capacity(QUEENS_PER_SIDE);
        let mut black = Vec::with_capacity(QUEENS_PER_SIDE);
        for index in 0..TILE_COUNT {
            let pos = Position::from_index(index);
            match tiles[index] {
                Tile::White => white.push(pos),
                Tile::Black => black.push(pos),
                _ => {}
            }
            if !pos.on_board() && tiles[index] != Tile::Empty {
                return None;
            }
        }
        Some(GameState {
            tiles,
            white: white.try_into().ok()?,
            black: black.try_into().ok()?,
            ply,
        })
    }

    pub fn tile(&self, pos: Position) -> Tile {
        self.tiles[pos.index()]
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// White when the ply count is even.
    pub fn side_to_move(&self) -> Side {
        if self.ply % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    pub fn queens(&self, side: Side) -> &[Position; QUEENS_PER_SIDE] {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Queens of the side to move; the piece set handed to move generation.
    pub fn turn_pieces(&self) -> &[Position; QUEENS_PER_SIDE] {
        self.queens(self.side_to_move())
    }

    /// Validate and apply a move for the side to move, advancing the ply.
    ///
    /// Returns false and leaves the state untouched when the move is
    /// illegal: wrong or missing queen on the start square, a non-queen or
    /// blocked relocation line, or a blocked arrow line (the vacated start
    /// square counts as empty for the arrow).
    pub fn apply(&mut self, mv: Move) -> bool {
        if !mv.start.on_board() || !mv.target.on_board() || !mv.arrow.on_board() {
            return false;
        }
        let side = self.side_to_move();
        if self.tile(mv.start) != Tile::queen_of(side) {
            return false;
        }
        if !moves::is_queen_line_clear(self, mv.start, mv.target, None) {
            return false;
        }
        if !moves::is_queen_line_clear(self, mv.target, mv.arrow, Some(mv.start)) {
            return false;
        }

        self.tiles[mv.start.index()] = Tile::Empty;
        self.tiles[mv.target.index()] = Tile::queen_of(side);
        self.tiles[mv.arrow.index()] = Tile::Arrow;
        let queens = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        if let Some(q) = queens.iter_mut().find(|q| **q == mv.start) {
            *q = mv.target;
        }
        self.ply += 1;
        true
    }

    /// The side to move has no legal move.
    ///
    /// A queen with any adjacent empty square always has a full move (one
    /// step plus an arrow back onto the vacated square), so it suffices to
    /// check for a single empty neighbor.
    pub fn is_terminal(&self) -> bool {
        !moves::has_any_move(self, self.turn_pieces())
    }

    /// Canonical identity, stable across independent clones of equal
    /// positions.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut words = [0u64; 4];
        for (i, tile) in self.tiles.iter().enumerate() {
            words[i / 32] |= (*tile as u64) << ((i % 32) * 2);
        }
        Fingerprint(words)
    }
}
