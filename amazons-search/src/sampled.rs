//! Sampled (Monte Carlo) expansion.
//!
//! Instead of walking every move, this strategy narrows each position's
//! move list with a randomly drawn tree policy, then recurses into a few
//! uniformly chosen branches down to a depth limit. Branch count and depth
//! are small at the start of a turn and grow between passes while time
//! remains, so the tree deepens where earlier passes already paid
//! attention.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use amazons_core::{generate_moves, EvalWeights, GameState};

use crate::cancel::CancelToken;
use crate::config::SearchConfig;
use crate::evaluator::{EvalItem, EvalQueue};
use crate::node::NodeId;
use crate::policy::{narrow, sample_distinct, PolicyDraw, PolicyError, TreePolicy};
use crate::store::GameTree;

pub struct SampledSearch {
    tree: Arc<GameTree>,
    queue: EvalQueue,
    weights: EvalWeights,
    draw: PolicyDraw,
    cancel: CancelToken,
    rng: ChaCha20Rng,
}

impl SampledSearch {
    pub fn new(
        tree: Arc<GameTree>,
        queue: EvalQueue,
        config: &SearchConfig,
        cancel: CancelToken,
        seed: u64,
    ) -> Result<SampledSearch, PolicyError> {
        Ok(SampledSearch {
            tree,
            queue,
            weights: config.eval_weights,
            draw: PolicyDraw::new(&config.policy_weights)?,
            cancel,
            rng: ChaCha20Rng::seed_from_u64(seed),
        })
    }

    /// One sampled pass from `board` with the given branch count and
    /// depth. Returns true when the pass ran to completion, false when it
    /// observed cancellation partway.
    pub fn run(&mut self, board: &GameState, branches: u32, depth: u32) -> bool {
        let (root, _) = self.tree.get_or_create(None, board);
        self.expand(board, root, branches, depth);
        !self.cancel.is_cancelled()
    }

    fn expand(&mut self, state: &GameState, node: NodeId, branches: u32, depth: u32) {
        if depth == 0 || self.cancel.is_cancelled() || state.is_terminal() {
            return;
        }
        let moves = generate_moves(state, state.turn_pieces());
        if moves.is_empty() {
            return;
        }

        // Narrow when the position is wide: score around half the list
        // (at least twice the branch count) and keep the best `branches`.
        let sample_size = moves.len() >> 1;
        let doubled = (branches << 1) as usize;
        let bound = doubled.max(sample_size.saturating_sub(doubled));
        let policy_sample = if bound > 0 {
            self.rng.gen_range(0..bound) + doubled
        } else {
            doubled
        };
        let kind = self.draw.draw(&mut self.rng);
        let moves = narrow(
            &self.tree,
            &self.queue,
            &self.weights,
            &mut self.rng,
            node,
            state,
            moves,
            TreePolicy::new(policy_sample, branches as usize, kind),
        );
        if moves.is_empty() {
            return;
        }

        // All siblings are linked before any of them is recursed into;
        // each subtree is then walked to completion in turn.
        let picks = sample_distinct(&mut self.rng, moves.len(), branches as usize);
        let mut jobs: Vec<(GameState, NodeId)> = Vec::with_capacity(picks.len());
        for index in picks {
            if self.cancel.is_cancelled() {
                break;
            }
            let mv = moves[index];
            let mut next = state.clone();
            if !next.apply(mv) {
                continue;
            }
            let (child, created) = self.tree.get_or_create(Some(mv), &next);
            self.tree.adopt(node, mv, child);
            if created {
                self.queue.append(EvalItem::new(next.clone(), child));
            }
            jobs.push((next, child));
        }
        trace!(
            ply = state.ply(),
            depth,
            branches = jobs.len(),
            kind = ?kind,
            "sampled expansion"
        );
        for (next, child) in jobs {
            self.expand(&next, child, branches, depth - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::eval_channel;
    use amazons_core::{Position, Tile, TILE_COUNT};

    // White's queen on (1,1) has exactly two legal moves: step to (1,2),
    // then shoot either back onto (1,1) or diagonally to (2,3).
    fn two_move_position() -> GameState {
        let mut tiles = [Tile::Empty; TILE_COUNT];
        for row in 1..=10u8 {
            for col in 1..=10u8 {
                tiles[Position::new(row, col).index()] = Tile::Arrow;
            }
        }
        tiles[Position::new(1, 2).index()] = Tile::Empty;
        tiles[Position::new(2, 3).index()] = Tile::Empty;
        tiles[Position::new(1, 1).index()] = Tile::White;
        for (row, col) in [(10, 10), (10, 8), (8, 10)] {
            tiles[Position::new(row, col).index()] = Tile::White;
        }
        for (row, col) in [(5, 5), (5, 7), (7, 5), (7, 7)] {
            tiles[Position::new(row, col).index()] = Tile::Black;
        }
        GameState::from_tiles(tiles, 0).unwrap()
    }

    fn search_for(tree: &Arc<GameTree>, queue: EvalQueue) -> SampledSearch {
        SampledSearch::new(
            Arc::clone(tree),
            queue,
            &SearchConfig::default(),
            CancelToken::new(),
            42,
        )
        .unwrap()
    }

    #[test]
    fn test_expands_both_moves_when_fewer_than_branches() {
        let tree = Arc::new(GameTree::new());
        let (queue, receivers) = eval_channel();
        let mut search = search_for(&tree, queue);
        let board = two_move_position();
        assert_eq!(
            generate_moves(&board, board.turn_pieces()).len(),
            2
        );

        assert!(search.run(&board, 5, 1));
        // Both available moves expanded, capped by availability.
        let root = tree.get(&board).unwrap();
        assert_eq!(tree.node(root).unwrap().child_count(), 2);
        assert_eq!(tree.len(), 3);

        let mut enqueued = 0;
        while receivers.append.try_recv().is_ok() {
            enqueued += 1;
        }
        assert_eq!(enqueued, 2);
        assert!(receivers.expedite.try_recv().is_err());
    }

    #[test]
    fn test_depth_zero_is_a_no_op() {
        let tree = Arc::new(GameTree::new());
        let (queue, receivers) = eval_channel();
        let mut search = search_for(&tree, queue);

        assert!(search.run(&GameState::new_game(), 3, 0));
        assert_eq!(tree.len(), 1);
        assert!(receivers.append.try_recv().is_err());
    }

    #[test]
    fn test_cancelled_run_reports_unfinished() {
        let tree = Arc::new(GameTree::new());
        let (queue, _receivers) = eval_channel();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut search = SampledSearch::new(
            Arc::clone(&tree),
            queue,
            &SearchConfig::default(),
            cancel,
            42,
        )
        .unwrap();

        assert!(!search.run(&GameState::new_game(), 3, 2));
        // The root is seeded even when the pass is abandoned.
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_wide_position_is_narrowed_before_sampling() {
        let tree = Arc::new(GameTree::new());
        let (queue, _receivers) = eval_channel();
        let mut search = search_for(&tree, queue);
        let board = GameState::new_game();

        assert!(search.run(&board, 2, 1));
        let root = tree.get(&board).unwrap();
        let children = tree.node(root).unwrap().child_count();
        // Narrowing scores a subset of the 2176 moves and adopts what it
        // creates; at depth one nothing below the root exists yet.
        assert!(children >= 2);
        assert!(children < 2176);
        assert_eq!(tree.len(), children + 1);
    }

    #[test]
    fn test_deeper_pass_reaches_grandchildren() {
        let tree = Arc::new(GameTree::new());
        let (queue, _receivers) = eval_channel();
        let mut search = search_for(&tree, queue);
        let board = GameState::new_game();

        assert!(search.run(&board, 1, 2));
        let root = tree.get(&board).unwrap();
        let root_node = tree.node(root).unwrap();
        let deep = root_node
            .child_ids()
            .into_iter()
            .filter_map(|id| tree.node(id))
            .any(|child| child.child_count() > 0);
        assert!(deep);
    }
}
