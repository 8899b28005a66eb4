//! Deadline-bounded best-move decision.
//!
//! Reads whatever the search strategies managed to score and picks the
//! best child of the root. Children that are not ready yet are evaluated
//! synchronously on the spot while the deadline allows.

use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use amazons_core::{eval, EvalWeights, Move};

use crate::node::NodeId;
use crate::store::GameTree;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    /// The root has no children: no legal continuation, the game is lost.
    #[error("no legal continuation from the current root")]
    NoLegalMove,

    /// The deadline expired before any candidate was acceptable. The
    /// caller falls back to an arbitrary legal move.
    #[error("deadline expired before any candidate was ready")]
    Timeout,
}

/// The chosen continuation.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub node: NodeId,
    pub mv: Move,
    pub value: f64,
}

const RETRY_PAUSE: Duration = Duration::from_millis(1);

/// Pick the best child of `root` before `deadline`.
///
/// A candidate replaces the current best when it is at least as good on
/// both the heuristic value and the aggregate average. The first pass
/// only accepts values strictly above zero, biasing away from apparently
/// neutral moves; retry passes accept any non-negative value until the
/// deadline expires.
pub fn decide(
    tree: &GameTree,
    root: NodeId,
    weights: &EvalWeights,
    deadline: Instant,
) -> Result<Decision, DecisionError> {
    let root_node = tree.node(root).ok_or(DecisionError::NoLegalMove)?;
    let children = root_node.children_snapshot();
    if children.is_empty() {
        return Err(DecisionError::NoLegalMove);
    }

    let mut first_pass = true;
    loop {
        let mut best: Option<(Decision, f64)> = None;
        for &(mv, id) in &children {
            let node = match tree.node(id) {
                Some(node) => node,
                None => continue,
            };
            if !node.heuristic().is_ready() {
                if Instant::now() >= deadline {
                    continue;
                }
                let value = eval::combined(node.state(), weights);
                tree.publish_value(id, value);
            }
            let value = node.heuristic().value();
            let acceptable = if first_pass { value > 0.0 } else { value >= 0.0 };
            if !acceptable {
                continue;
            }
            let aggregate = node.heuristic().aggregate();
            let replaces = match &best {
                None => true,
                Some((current, current_agg)) => {
                    value >= current.value && aggregate >= *current_agg
                }
            };
            if replaces {
                best = Some((Decision { node: id, mv, value }, aggregate));
            }
        }

        if let Some((choice, _)) = best {
            debug!(value = choice.value, mv = %choice.mv, "decision made");
            return Ok(choice);
        }
        if Instant::now() >= deadline {
            return Err(DecisionError::Timeout);
        }
        first_pass = false;
        thread::sleep(RETRY_PAUSE);
    }
}
