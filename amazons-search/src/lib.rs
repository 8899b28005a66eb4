//! Concurrent move search for the Game of the Amazons.
//!
//! This crate builds a shared game tree over `amazons-core` positions and
//! runs two complementary search strategies against it while a dedicated
//! evaluator scores positions in the background.
//!
//! # Overview
//!
//! A turn is a race against the clock. The pieces cooperate like this:
//!
//! 1. **Tree store**: a fingerprint-indexed arena of game nodes. Positions
//!    reached through different move orders share one node, so work done
//!    on a transposition is never repeated.
//! 2. **Exhaustive strategy**: breadth-first expansion of every legal
//!    continuation, feasible once the board has emptied out.
//! 3. **Sampled strategy**: randomized narrowing that keeps only the most
//!    promising branches, for the wide early and middle game.
//! 4. **Evaluator**: a single worker draining a two-lane queue; positions
//!    the decision depends on soonest jump the line.
//! 5. **Decision**: at the deadline, pick the best scored child of the
//!    root, forcing synchronous evaluation where the strategies did not
//!    get there in time.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! use amazons_core::GameState;
//! use amazons_search::{
//!     decide, eval_channel, CancelToken, EvalWorker, GameTree, SampledSearch,
//!     SearchConfig,
//! };
//!
//! let config = SearchConfig::default();
//! let tree = Arc::new(GameTree::new());
//! let (queue, receivers) = eval_channel();
//! let worker = EvalWorker::spawn(
//!     Arc::clone(&tree),
//!     receivers,
//!     config.eval_weights,
//!     config.evaluator_park,
//! );
//!
//! let board = GameState::new_game();
//! let cancel = CancelToken::new();
//! let mut sampled = SampledSearch::new(
//!     Arc::clone(&tree),
//!     queue.clone(),
//!     &config,
//!     cancel.clone(),
//!     42,
//! )?;
//! sampled.run(&board, config.initial_branches, config.initial_depth);
//!
//! let (root, _) = tree.get_or_create(None, &board);
//! let deadline = Instant::now() + config.decision_reserve;
//! let decision = decide(&tree, root, &config.eval_weights, deadline)?;
//! println!("playing {}", decision.mv);
//! ```
//!
//! # Configuration
//!
//! The [`SearchConfig`] struct controls search behavior:
//!
//! - `initial_branches` / `initial_depth`: starting effort of a sampled
//!   pass (default: 3 and 3)
//! - `branch_increment` / `depth_increment`: escalation per completed pass
//! - `turn_budget` / `decision_reserve`: wall-clock budget for a turn and
//!   the slice held back for the final decision
//! - `policy_weights`: how the sampled strategy chooses its narrowing
//!   heuristic
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          GameTree                           │
//! │            (arena + fingerprint index, shared)              │
//! └──────▲──────────────────▲──────────────────────▲────────────┘
//!        │                  │                      │
//! ┌──────┴────────┐  ┌──────┴───────┐  ┌───────────┴───────────┐
//! │  Exhaustive   │  │   Sampled    │  │      EvalWorker       │
//! │  (worklist)   │  │ (policy rng) │  │ (expedite ∥ append)   │
//! └──────┬────────┘  └──────┬───────┘  └───────────▲───────────┘
//!        │                  │                      │
//!        └──────────────────┴──── EvalQueue ───────┘
//! ```

pub mod cancel;
pub mod config;
pub mod decision;
pub mod evaluator;
pub mod exhaustive;
pub mod node;
pub mod policy;
pub mod sampled;
pub mod store;

// Re-export main types
pub use cancel::CancelToken;
pub use config::{PolicyWeights, SearchConfig};
pub use decision::{decide, Decision, DecisionError};
pub use evaluator::{eval_channel, EvalItem, EvalQueue, EvalReceivers, EvalWorker};
pub use exhaustive::ExhaustiveSearch;
pub use node::{GameNode, NodeId};
pub use policy::{HeuristicKind, PolicyError, TreePolicy};
pub use sampled::SampledSearch;
pub use store::{GameTree, TreeStats};
