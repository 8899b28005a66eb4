//! Shared search-tree node representation.
//!
//! Each node represents a position reached by playing a move from some
//! parent position. Transpositions merge: a node can have several parents,
//! so the tree is really a DAG. Heuristic fields are individually atomic
//! rather than guarded by a node-wide lock; readers may observe the value
//! before the ready flag but never a torn number.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use amazons_core::{Fingerprint, GameState, Move};

/// Index into the node arena. Using a newtype for type safety. Slots are
/// never reused, so a `NodeId` stays valid (or dead, never recycled) for
/// the life of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An `f64` with atomic load/store and a few read-modify-write helpers,
/// stored as raw bits in an `AtomicU64`.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> AtomicF64 {
        AtomicF64(AtomicU64::new(value.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// Add `delta`, returning the previous value.
    pub fn fetch_add(&self, delta: f64) -> f64 {
        let result = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            Some((f64::from_bits(bits) + delta).to_bits())
        });
        match result {
            Ok(prev) | Err(prev) => f64::from_bits(prev),
        }
    }

    /// Raise to `value` if it is greater, returning the previous value.
    pub fn fetch_max(&self, value: f64) -> f64 {
        let result = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            Some(f64::from_bits(bits).max(value).to_bits())
        });
        match result {
            Ok(prev) | Err(prev) => f64::from_bits(prev),
        }
    }

    /// Lower to `value` if it is smaller, returning the previous value.
    pub fn fetch_min(&self, value: f64) -> f64 {
        let result = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            Some(f64::from_bits(bits).min(value).to_bits())
        });
        match result {
            Ok(prev) | Err(prev) => f64::from_bits(prev),
        }
    }
}

/// Per-node heuristic state.
///
/// `value` is the node's own combined score, written once by the evaluator
/// (or the decision engine's forced evaluation) and re-written with the
/// same number on re-evaluation. The subtree bounds track the extremes of
/// descendant values and only ever widen. The aggregate is the running
/// mean of direct-child values folded in at publication time.
#[derive(Debug)]
pub struct HeuristicRecord {
    value: AtomicF64,
    ready: AtomicBool,
    propagated: AtomicBool,
    max_sub: AtomicF64,
    min_sub: AtomicF64,
    agg_sum: AtomicF64,
    agg_count: AtomicU32,
    aggregated: AtomicBool,
}

impl HeuristicRecord {
    pub fn new() -> HeuristicRecord {
        HeuristicRecord {
            value: AtomicF64::new(f64::NEG_INFINITY),
            ready: AtomicBool::new(false),
            propagated: AtomicBool::new(false),
            max_sub: AtomicF64::new(f64::NEG_INFINITY),
            min_sub: AtomicF64::new(f64::INFINITY),
            agg_sum: AtomicF64::new(0.0),
            agg_count: AtomicU32::new(0),
            aggregated: AtomicBool::new(false),
        }
    }

    pub fn value(&self) -> f64 {
        self.value.load()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Publish the node's own score. The value lands before the ready flag
    /// so a reader that sees `ready` sees the full number.
    pub fn set_value(&self, value: f64) {
        self.value.store(value);
        self.ready.store(true, Ordering::Release);
    }

    pub fn has_propagated(&self) -> bool {
        self.propagated.load(Ordering::Acquire)
    }

    pub fn mark_propagated(&self) {
        self.propagated.store(true, Ordering::Release);
    }

    pub fn max_sub(&self) -> f64 {
        self.max_sub.load()
    }

    pub fn min_sub(&self) -> f64 {
        self.min_sub.load()
    }

    /// Widen the subtree bounds with a descendant value. Returns true when
    /// either bound actually moved, which tells the caller to keep
    /// widening toward the ancestors.
    pub fn widen(&self, value: f64) -> bool {
        let prev_max = self.max_sub.fetch_max(value);
        let prev_min = self.min_sub.fetch_min(value);
        value > prev_max || value < prev_min
    }

    /// Fold one direct-child sample into the running aggregate.
    pub fn add_sample(&self, value: f64) {
        self.agg_sum.fetch_add(value);
        self.agg_count.fetch_add(1, Ordering::AcqRel);
        self.aggregated.store(true, Ordering::Release);
    }

    pub fn is_aggregated(&self) -> bool {
        self.aggregated.load(Ordering::Acquire)
    }

    /// Mean of folded child samples, or negative infinity before any
    /// sample has landed. The sum and count are read separately; a
    /// concurrent fold can skew the mean by one sample, which is
    /// acceptable for a tiebreak.
    pub fn aggregate(&self) -> f64 {
        let count = self.agg_count.load(Ordering::Acquire);
        if count == 0 {
            f64::NEG_INFINITY
        } else {
            self.agg_sum.load() / count as f64
        }
    }
}

impl Default for HeuristicRecord {
    fn default() -> HeuristicRecord {
        HeuristicRecord::new()
    }
}

/// A parent link plus the marker telling whether this node's value has
/// already been folded into that parent. Folding is per edge so that a
/// parent adopted after propagation still receives the value exactly once.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParentEdge {
    pub parent: NodeId,
    pub folded: bool,
}

/// A node in the shared search DAG.
#[derive(Debug)]
pub struct GameNode {
    /// Move that produced this position, `None` for a seeded root.
    mv: Option<Move>,

    /// Position after the move.
    state: GameState,

    /// Cached store key for the position.
    fingerprint: Fingerprint,

    /// Children as (move, node) pairs. The move is labeled on the edge
    /// because a transposed child can be reached from different parents by
    /// different moves. Append-only outside of prune; guarded by its own
    /// lock, never held together with a parents lock.
    children: Mutex<Vec<(Move, NodeId)>>,

    /// Parent edges with per-edge fold markers.
    parents: Mutex<Vec<ParentEdge>>,

    heuristic: HeuristicRecord,
}

impl GameNode {
    pub fn new(mv: Option<Move>, state: GameState, fingerprint: Fingerprint) -> GameNode {
        GameNode {
            mv,
            state,
            fingerprint,
            children: Mutex::new(Vec::new()),
            parents: Mutex::new(Vec::new()),
            heuristic: HeuristicRecord::new(),
        }
    }

    pub fn game_move(&self) -> Option<Move> {
        self.mv
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn ply(&self) -> u32 {
        self.state.ply()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn heuristic(&self) -> &HeuristicRecord {
        &self.heuristic
    }

    pub fn children_snapshot(&self) -> Vec<(Move, NodeId)> {
        self.children.lock().clone()
    }

    pub fn child_ids(&self) -> Vec<NodeId> {
        self.children.lock().iter().map(|(_, id)| *id).collect()
    }

    pub fn parent_ids(&self) -> Vec<NodeId> {
        self.parents.lock().iter().map(|edge| edge.parent).collect()
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    /// Append `child` unless it is already linked. Returns false for a
    /// duplicate. The self-edge guard lives in the store, which knows both
    /// ids.
    pub(crate) fn link_child(&self, mv: Move, child: NodeId) -> bool {
        let mut children = self.children.lock();
        if children.iter().any(|(_, id)| *id == child) {
            return false;
        }
        children.push((mv, child));
        true
    }

    /// Register a parent edge and report whether this node's value should
    /// be folded into it right away (the value was already published).
    /// Checking readiness under the parents lock keeps the fold exactly
    /// once per edge against a racing publication.
    pub(crate) fn link_parent(&self, parent: NodeId) -> bool {
        let mut parents = self.parents.lock();
        let ready = self.heuristic.is_ready();
        parents.push(ParentEdge {
            parent,
            folded: ready,
        });
        ready
    }

    /// Claim every not-yet-folded parent edge, marking them folded and
    /// returning their targets.
    pub(crate) fn take_unfolded_parents(&self) -> Vec<NodeId> {
        let mut parents = self.parents.lock();
        parents
            .iter_mut()
            .filter(|edge| !edge.folded)
            .map(|edge| {
                edge.folded = true;
                edge.parent
            })
            .collect()
    }

    /// Drop links to pruned nodes. Only the prune pass calls this, with
    /// all search threads stopped.
    pub(crate) fn retain_links(&self, keep: impl Fn(NodeId) -> bool) {
        self.children.lock().retain(|(_, id)| keep(*id));
        self.parents.lock().retain(|edge| keep(edge.parent));
    }
}
