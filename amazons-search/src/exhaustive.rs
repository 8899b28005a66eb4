//! Exhaustive breadth-first expansion.
//!
//! Walks the whole reachable position set from a snapshot, creating or
//! reusing nodes through the store and linking every child under its
//! parent. Newly created nodes go to the evaluator with front priority at
//! the first expansion level and back priority below it, so the moves the
//! decision engine will actually compare are scored first.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use amazons_core::{generate_moves, GameState};

use crate::cancel::CancelToken;
use crate::evaluator::{EvalItem, EvalQueue};
use crate::store::GameTree;

pub struct ExhaustiveSearch {
    tree: Arc<GameTree>,
    queue: EvalQueue,
    cancel: CancelToken,
}

impl ExhaustiveSearch {
    pub fn new(tree: Arc<GameTree>, queue: EvalQueue, cancel: CancelToken) -> ExhaustiveSearch {
        ExhaustiveSearch {
            tree,
            queue,
            cancel,
        }
    }

    /// Expand everything reachable from `board`. Returns true when the
    /// walk completed, false when it observed cancellation; a false
    /// result means the caller should restart from a fresh snapshot once
    /// the match state settles.
    ///
    /// Each run deduplicates by node handle, so a restart descends
    /// through children that already exist without re-queueing them for
    /// evaluation.
    pub fn run(&self, board: &GameState) -> bool {
        let (root, _) = self.tree.get_or_create(None, board);
        let mut visited = HashSet::from([root]);
        let mut worklist = VecDeque::from([(root, 0u32)]);

        while let Some((id, level)) = worklist.pop_front() {
            if self.cancel.is_cancelled() {
                debug!(expanded = visited.len(), "exhaustive walk cancelled");
                return false;
            }
            let node = match self.tree.node(id) {
                Some(node) => node,
                None => continue,
            };
            let state = node.state();
            if state.is_terminal() {
                continue;
            }
            for mv in generate_moves(state, state.turn_pieces()) {
                if self.cancel.is_cancelled() {
                    debug!(expanded = visited.len(), "exhaustive walk cancelled");
                    return false;
                }
                let mut next = state.clone();
                if !next.apply(mv) {
                    continue;
                }
                let (child, created) = self.tree.get_or_create(Some(mv), &next);
                self.tree.adopt(id, mv, child);
                if created {
                    let item = EvalItem::new(next, child);
                    if level == 0 {
                        self.queue.expedite(item);
                    } else {
                        self.queue.append(item);
                    }
                }
                if visited.insert(child) {
                    worklist.push_back((child, level + 1));
                }
            }
        }
        debug!(expanded = visited.len(), "exhaustive walk complete");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::eval_channel;
    use amazons_core::{Position, Tile, TILE_COUNT};

    // A board where each side has exactly one queen that can still move,
    // each into a single one-square pocket.
    fn two_move_endgame() -> GameState {
        let mut tiles = [Tile::Empty; TILE_COUNT];
        for row in 1..=10u8 {
            for col in 1..=10u8 {
                tiles[Position::new(row, col).index()] = Tile::Arrow;
            }
        }
        tiles[Position::new(1, 2).index()] = Tile::Empty;
        tiles[Position::new(5, 6).index()] = Tile::Empty;
        tiles[Position::new(1, 1).index()] = Tile::White;
        for (row, col) in [(10, 10), (10, 8), (8, 10)] {
            tiles[Position::new(row, col).index()] = Tile::White;
        }
        tiles[Position::new(5, 5).index()] = Tile::Black;
        for (row, col) in [(7, 7), (7, 9), (9, 7)] {
            tiles[Position::new(row, col).index()] = Tile::Black;
        }
        GameState::from_tiles(tiles, 0).unwrap()
    }

    #[test]
    fn test_exhausts_small_endgame() {
        let tree = Arc::new(GameTree::new());
        let (queue, receivers) = eval_channel();
        let search = ExhaustiveSearch::new(Arc::clone(&tree), queue, CancelToken::new());
        let board = two_move_endgame();

        assert!(search.run(&board));
        // Root, White's only reply, then Black's only reply.
        assert_eq!(tree.len(), 3);

        let mut expedited = 0;
        while receivers.expedite.try_recv().is_ok() {
            expedited += 1;
        }
        let mut appended = 0;
        while receivers.append.try_recv().is_ok() {
            appended += 1;
        }
        assert_eq!(expedited, 1);
        assert_eq!(appended, 1);
    }

    #[test]
    fn test_terminal_board_is_exhausted_immediately() {
        let tree = Arc::new(GameTree::new());
        let (queue, _receivers) = eval_channel();
        let search = ExhaustiveSearch::new(Arc::clone(&tree), queue, CancelToken::new());

        let mut board = two_move_endgame();
        // White plays its forced move and seals itself; Black then plays
        // and seals itself, leaving White stalled.
        let moves = generate_moves(&board, board.turn_pieces());
        assert_eq!(moves.len(), 1);
        assert!(board.apply(moves[0]));
        let replies = generate_moves(&board, board.turn_pieces());
        assert_eq!(replies.len(), 1);
        assert!(board.apply(replies[0]));
        assert!(board.is_terminal());

        assert!(search.run(&board));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_cancelled_run_reports_unfinished() {
        let tree = Arc::new(GameTree::new());
        let (queue, _receivers) = eval_channel();
        let cancel = CancelToken::new();
        cancel.cancel();
        let search = ExhaustiveSearch::new(Arc::clone(&tree), queue, cancel);

        assert!(!search.run(&GameState::new_game()));
    }

    #[test]
    fn test_rerun_descends_existing_children() {
        let tree = Arc::new(GameTree::new());
        let (queue, receivers) = eval_channel();
        let search = ExhaustiveSearch::new(Arc::clone(&tree), queue, CancelToken::new());
        let board = two_move_endgame();

        assert!(search.run(&board));
        let populated = tree.len();
        while receivers.expedite.try_recv().is_ok() {}
        while receivers.append.try_recv().is_ok() {}

        // A second pass walks the same set through the store without
        // creating or re-queueing anything.
        assert!(search.run(&board));
        assert_eq!(tree.len(), populated);
        assert!(receivers.expedite.try_recv().is_err());
        assert!(receivers.append.try_recv().is_err());
    }
}
