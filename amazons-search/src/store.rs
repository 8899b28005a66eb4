//! Concurrent tree store with arena allocation.
//!
//! Nodes live in a slot arena and are addressed by `NodeId`; a DashMap
//! keyed by position fingerprint maps each distinct position to its one
//! retained node. Slots are cleared on prune and never reused, so a stale
//! handle reads as dead instead of aliasing a newer node.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use amazons_core::{Fingerprint, GameState, Move};

use crate::node::{GameNode, NodeId};

/// Shared store for the search DAG.
pub struct GameTree {
    arena: RwLock<Vec<Option<Arc<GameNode>>>>,
    index: DashMap<Fingerprint, NodeId>,
}

impl GameTree {
    pub fn new() -> GameTree {
        GameTree {
            arena: RwLock::new(Vec::new()),
            index: DashMap::new(),
        }
    }

    /// Resolve a handle. `None` for a pruned or never-allocated slot.
    pub fn node(&self, id: NodeId) -> Option<Arc<GameNode>> {
        self.arena.read().get(id.index()).and_then(|slot| slot.clone())
    }

    /// Look up the node holding this exact position, if any.
    pub fn get(&self, state: &GameState) -> Option<NodeId> {
        self.index.get(&state.fingerprint()).map(|entry| *entry)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Fetch the node for `state`, creating it when absent. Returns the
    /// handle and whether this call created it. Concurrent creators for
    /// the same fingerprint converge on a single retained node; a loser's
    /// tentative slot is retired immediately.
    pub fn get_or_create(&self, mv: Option<Move>, state: &GameState) -> (NodeId, bool) {
        let fingerprint = state.fingerprint();
        if let Some(existing) = self.index.get(&fingerprint) {
            return (*existing, false);
        }

        let node = Arc::new(GameNode::new(mv, state.clone(), fingerprint));
        let id = {
            let mut arena = self.arena.write();
            let id = NodeId(arena.len() as u32);
            arena.push(Some(node));
            id
        };

        match self.index.entry(fingerprint) {
            Entry::Occupied(entry) => {
                let winner = *entry.get();
                drop(entry);
                self.arena.write()[id.index()] = None;
                (winner, false)
            }
            Entry::Vacant(entry) => {
                entry.insert(id);
                (id, true)
            }
        }
    }

    /// Link `child` under `parent` with the move that reaches it. A self
    /// edge or an already-present child is a no-op. When the child's value
    /// is already published, the new edge is folded into the parent right
    /// away without disturbing the child's other parents.
    pub fn adopt(&self, parent: NodeId, mv: Move, child: NodeId) -> bool {
        if parent == child {
            return false;
        }
        let (parent_node, child_node) = match (self.node(parent), self.node(child)) {
            (Some(p), Some(c)) => (p, c),
            _ => return false,
        };
        if !parent_node.link_child(mv, child) {
            return false;
        }
        if child_node.link_parent(parent) {
            self.fold_into(parent, child_node.heuristic().value());
        }
        true
    }

    /// Record a node's evaluated score and propagate it toward ancestors.
    /// Each parent edge receives the fold exactly once, including edges
    /// added after this call through late adoption.
    pub fn publish_value(&self, id: NodeId, value: f64) {
        let node = match self.node(id) {
            Some(node) => node,
            None => return,
        };
        node.heuristic().set_value(value);
        for parent in node.take_unfolded_parents() {
            self.fold_into(parent, value);
        }
        node.heuristic().mark_propagated();
    }

    /// Widen a parent's subtree bounds with a child value, add the sample
    /// to its aggregate, and keep widening upward while bounds move.
    fn fold_into(&self, parent: NodeId, value: f64) {
        let node = match self.node(parent) {
            Some(node) => node,
            None => return,
        };
        node.heuristic().add_sample(value);
        if node.heuristic().widen(value) {
            self.widen_ancestors(parent, value);
        }
    }

    fn widen_ancestors(&self, from: NodeId, value: f64) {
        let mut pending = vec![from];
        while let Some(id) = pending.pop() {
            let node = match self.node(id) {
                Some(node) => node,
                None => continue,
            };
            for parent in node.parent_ids() {
                if let Some(parent_node) = self.node(parent) {
                    if parent_node.heuristic().widen(value) {
                        pending.push(parent);
                    }
                }
            }
        }
    }

    /// Remove every node whose ply is strictly below `ply_boundary` and
    /// that is not reachable from `root`, then strip dangling links from
    /// the survivors. Callers must stop the search threads first; the
    /// evaluator may keep running, it only touches live nodes.
    pub fn prune(&self, ply_boundary: u32, root: NodeId) -> usize {
        let mut reachable = HashSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if !reachable.insert(id) {
                continue;
            }
            if let Some(node) = self.node(id) {
                for child in node.child_ids() {
                    queue.push_back(child);
                }
            }
        }

        let mut removed = Vec::new();
        {
            let mut arena = self.arena.write();
            for (index, slot) in arena.iter_mut().enumerate() {
                let id = NodeId(index as u32);
                let stale = slot
                    .as_ref()
                    .map_or(false, |node| node.ply() < ply_boundary && !reachable.contains(&id));
                if stale {
                    if let Some(node) = slot.take() {
                        removed.push((id, node));
                    }
                }
            }
        }
        if removed.is_empty() {
            return 0;
        }

        let gone: HashSet<NodeId> = removed.iter().map(|(id, _)| *id).collect();
        for (_, node) in &removed {
            self.index.remove(&node.fingerprint());
        }
        let survivors: Vec<Arc<GameNode>> = {
            let arena = self.arena.read();
            arena.iter().flatten().cloned().collect()
        };
        for node in survivors {
            node.retain_links(|id| !gone.contains(&id));
        }
        debug!(removed = removed.len(), boundary = ply_boundary, "pruned stale branches");
        removed.len()
    }

    /// Snapshot of tree shape for logging.
    pub fn stats(&self, root: NodeId) -> TreeStats {
        let (root_children, root_max_sub) = match self.node(root) {
            Some(node) => (node.child_count(), node.heuristic().max_sub()),
            None => (0, f64::NEG_INFINITY),
        };
        TreeStats {
            live_nodes: self.index.len(),
            total_slots: self.arena.read().len(),
            root_children,
            root_max_sub,
        }
    }
}

impl Default for GameTree {
    fn default() -> GameTree {
        GameTree::new()
    }
}

/// Statistics about the search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub live_nodes: usize,
    pub total_slots: usize,
    pub root_children: usize,
    pub root_max_sub: f64,
}
