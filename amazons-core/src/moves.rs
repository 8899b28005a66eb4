//! Move representation and legal move generation.

use std::fmt;

use crate::board::{Position, Tile, DIRECTIONS};
use crate::state::GameState;

/// A complete half-move: relocate a queen from `start` to `target`, then
/// shoot an arrow from `target` to `arrow`.
///
/// Both legs travel queen lines over empty squares; the arrow leg treats
/// the vacated `start` square as empty, so `arrow == start` is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub start: Position,
    pub target: Position,
    pub arrow: Position,
}

impl Move {
    pub const fn new(start: Position, target: Position, arrow: Position) -> Move {
        Move {
            start,
            target,
            arrow,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} / {}", self.start, self.target, self.arrow)
    }
}

/// Every legal move for the given pieces in this position.
///
/// Pieces are scanned in order and rays in `DIRECTIONS` order, so the
/// output order is deterministic for a given state.
pub fn generate_moves(state: &GameState, pieces: &[Position]) -> Vec<Move> {
    let mut out = Vec::new();
    for &start in pieces {
        for &(dr, dc) in &DIRECTIONS {
            let mut target = start;
            while let Some(next) = target.offset(dr, dc) {
                if state.tile(next) != Tile::Empty {
                    break;
                }
                target = next;
                collect_arrows(state, start, target, &mut out);
            }
        }
    }
    out
}

/// All arrow completions for a queen that has moved `start -> target`.
fn collect_arrows(state: &GameState, start: Position, target: Position, out: &mut Vec<Move>) {
    for &(dr, dc) in &DIRECTIONS {
        let mut arrow = target;
        while let Some(next) = arrow.offset(dr, dc) {
            if state.tile(next) != Tile::Empty && next != start {
                break;
            }
            arrow = next;
            out.push(Move::new(start, target, arrow));
        }
    }
}

/// True when `from -> to` is a straight or diagonal line whose intermediate
/// squares and destination are all empty. `vacated` names a square treated
/// as empty for this check, used for the arrow leg after the queen has
/// conceptually left its start square.
pub(crate) fn is_queen_line_clear(
    state: &GameState,
    from: Position,
    to: Position,
    vacated: Option<Position>,
) -> bool {
    if from == to {
        return false;
    }
    let row_span = to.row as i8 - from.row as i8;
    let col_span = to.col as i8 - from.col as i8;
    if row_span != 0 && col_span != 0 && row_span.abs() != col_span.abs() {
        return false;
    }
    let (dr, dc) = (row_span.signum(), col_span.signum());
    let mut cursor = from;
    loop {
        cursor = match cursor.offset(dr, dc) {
            Some(next) => next,
            None => return false,
        };
        if state.tile(cursor) != Tile::Empty && Some(cursor) != vacated {
            return false;
        }
        if cursor == to {
            return true;
        }
    }
}

/// Any piece with an adjacent empty square has at least one legal move: a
/// single step plus an arrow back onto the vacated square.
pub(crate) fn has_any_move(state: &GameState, pieces: &[Position]) -> bool {
    pieces.iter().any(|&piece| {
        DIRECTIONS.iter().any(|&(dr, dc)| {
            piece
                .offset(dr, dc)
                .map(|next| state.tile(next) == Tile::Empty)
                .unwrap_or(false)
        })
    })
}
