//! Position heuristics.
//!
//! Every score is from the perspective of the side that just moved (the
//! side not on turn), higher is better, roughly within [-1, 1]. Search
//! evaluates a node right after the move that created it, so the mover's
//! perspective is the one that ranks sibling nodes consistently.

use crate::board::{Position, Side, Tile, DIRECTIONS, TILE_COUNT};
use crate::state::GameState;

/// Blend weights for [`combined`].
#[derive(Debug, Clone, Copy)]
pub struct EvalWeights {
    pub first_degree: f64,
    pub count: f64,
    pub territory: f64,
}

impl Default for EvalWeights {
    fn default() -> EvalWeights {
        EvalWeights {
            first_degree: 0.3,
            count: 0.2,
            territory: 0.5,
        }
    }
}

fn mover(state: &GameState) -> Side {
    state.side_to_move().opponent()
}

fn normalize(a: u32, b: u32) -> f64 {
    if a + b == 0 {
        0.0
    } else {
        (a as f64 - b as f64) / (a + b) as f64
    }
}

/// Normalized difference in empty squares each side's queens can reach in
/// one move. Squares covered by two queens of the same side count twice.
pub fn first_degree(state: &GameState) -> f64 {
    let us = mover(state);
    normalize(reachable(state, us), reachable(state, us.opponent()))
}

fn reachable(state: &GameState, side: Side) -> u32 {
    let mut total = 0;
    for &queen in state.queens(side) {
        for &(dr, dc) in &DIRECTIONS {
            let mut cursor = queen;
            while let Some(step) = cursor.offset(dr, dc) {
                if state.tile(step) != Tile::Empty {
                    break;
                }
                cursor = step;
                total += 1;
            }
        }
    }
    total
}

/// Normalized difference in adjacent liberties (degree of each queen).
/// Cheaper than [`first_degree`] and sensitive to crowding.
pub fn count(state: &GameState) -> f64 {
    let us = mover(state);
    normalize(liberties(state, us), liberties(state, us.opponent()))
}

fn liberties(state: &GameState, side: Side) -> u32 {
    state
        .queens(side)
        .iter()
        .map(|&queen| {
            DIRECTIONS
                .iter()
                .filter(|&&(dr, dc)| {
                    queen
                        .offset(dr, dc)
                        .map(|next| state.tile(next) == Tile::Empty)
                        .unwrap_or(false)
                })
                .count() as u32
        })
        .sum()
}

/// Queen-distance territory race. Each empty square scores for the side
/// whose queens reach it in strictly fewer moves; ties score nothing. The
/// sum is normalized by the number of squares either side can reach.
pub fn territory(state: &GameState) -> f64 {
    let us = mover(state);
    let ours = queen_distances(state, us);
    let theirs = queen_distances(state, us.opponent());
    let mut score = 0i64;
    let mut contested = 0i64;
    for index in 0..TILE_COUNT {
        let pos = Position::from_index(index);
        if !pos.on_board() || state.tile(pos) != Tile::Empty {
            continue;
        }
        let (a, b) = (ours[index], theirs[index]);
        if a == u32::MAX && b == u32::MAX {
            continue;
        }
        contested += 1;
        if a < b {
            score += 1;
        } else if b < a {
            score -= 1;
        }
    }
    if contested == 0 {
        0.0
    } else {
        score as f64 / contested as f64
    }
}

/// Multi-source BFS over queen moves: minimum number of moves any queen of
/// `side` needs to reach each empty square. Unreachable squares stay at
/// `u32::MAX`.
fn queen_distances(state: &GameState, side: Side) -> [u32; TILE_COUNT] {
    let mut dist = [u32::MAX; TILE_COUNT];
    let mut frontier: Vec<Position> = state.queens(side).to_vec();
    for queen in &frontier {
        dist[queen.index()] = 0;
    }
    let mut depth = 0u32;
    while !frontier.is_empty() {
        depth += 1;
        let mut next = Vec::new();
        for &from in &frontier {
            for &(dr, dc) in &DIRECTIONS {
                let mut cursor = from;
                while let Some(step) = cursor.offset(dr, dc) {
                    if state.tile(step) != Tile::Empty {
                        break;
                    }
                    cursor = step;
                    if dist[cursor.index()] == u32::MAX {
                        dist[cursor.index()] = depth;
                        next.push(cursor);
                    }
                }
            }
        }
        frontier = next;
    }
    dist
}

/// Weighted blend of the three heuristics. A terminal position is a win
/// for the side that just moved and scores the maximum outright.
pub fn combined(state: &GameState, weights: &EvalWeights) -> f64 {
    if state.is_terminal() {
        return 1.0;
    }
    weights.first_degree * first_degree(state)
        + weights.count * count(state)
        + weights.territory * territory(state)
}
