//! Match session orchestration.
//!
//! A [`Session`] owns the canonical board, the shared search tree and the
//! worker threads for one match. Turns alternate through two entry
//! points: [`Session::apply_opponent_move`] advances the board and tree
//! past the opponent's move, [`Session::take_turn`] races the search
//! strategies against the turn budget, commits the winning move and hands
//! it to the [`MoveSink`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use amazons_core::{generate_moves, GameState, Move};
use amazons_search::{
    decide, eval_channel, CancelToken, DecisionError, EvalQueue, EvalReceivers, EvalWorker,
    ExhaustiveSearch, GameTree, NodeId, SampledSearch, SearchConfig,
};

use crate::message::{MoveMessage, MoveSink};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The canonical board rejected a move. Either the opponent sent an
    /// illegal move or the engine chose one for a stale position; the
    /// session shuts itself down and every further call is rejected.
    #[error("canonical board rejected {mv}")]
    Desync { mv: Move },

    /// No legal continuation exists. The game is lost.
    #[error("no legal move available")]
    NoLegalMove,

    /// The session was shut down.
    #[error("session terminated")]
    Terminated,
}

/// Granularity of the wait before the decision pass.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// One match worth of engine state.
pub struct Session {
    board: Arc<Mutex<GameState>>,
    tree: Arc<GameTree>,
    root: NodeId,
    explored: Arc<AtomicBool>,
    searching: AtomicBool,
    terminated: AtomicBool,
    exhaustive_cancel: CancelToken,
    sampled_cancel: CancelToken,
    queue: EvalQueue,
    receivers: Option<EvalReceivers>,
    worker: Option<EvalWorker>,
    sink: Arc<dyn MoveSink>,
    config: SearchConfig,
    turn_seed: u64,
}

impl Session {
    /// Start a session from the standard initial position.
    pub fn new(config: SearchConfig, sink: Arc<dyn MoveSink>) -> Session {
        Session::with_board(config, sink, GameState::new_game())
    }

    fn with_board(config: SearchConfig, sink: Arc<dyn MoveSink>, board: GameState) -> Session {
        let tree = Arc::new(GameTree::new());
        let (root, _) = tree.get_or_create(None, &board);
        let (queue, receivers) = eval_channel();
        Session {
            board: Arc::new(Mutex::new(board)),
            tree,
            root,
            explored: Arc::new(AtomicBool::new(false)),
            searching: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            exhaustive_cancel: CancelToken::new(),
            sampled_cancel: CancelToken::new(),
            queue,
            receivers: Some(receivers),
            worker: None,
            sink,
            config,
            turn_seed: rand::random(),
        }
    }

    /// Fix the sampled strategy's base seed, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Session {
        self.turn_seed = seed;
        self
    }

    /// Snapshot of the canonical board.
    pub fn board(&self) -> GameState {
        self.board.lock().clone()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tree(&self) -> &Arc<GameTree> {
        &self.tree
    }

    /// True once an exhaustive pass has covered every reachable position.
    /// Sticky: later positions are a subset of what was covered.
    pub fn is_explored(&self) -> bool {
        self.explored.load(Ordering::Acquire)
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }

    /// Advance the canonical board and the tree root past the opponent's
    /// move, then drop branches the match can no longer reach.
    pub fn apply_opponent_move(&mut self, mv: Move) -> Result<(), SessionError> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(SessionError::Terminated);
        }
        let after = self.commit(mv)?;
        let (child, _) = self.tree.get_or_create(Some(mv), &after);
        self.tree.adopt(self.root, mv, child);
        self.root = child;
        let removed = self.tree.prune(after.ply(), self.root);
        debug!(%mv, ply = after.ply(), removed, "opponent move applied");
        Ok(())
    }

    /// Search for the length of the turn budget, then commit and emit the
    /// best move found. On a decision timeout the first generated legal
    /// move is played instead.
    pub fn take_turn(&mut self) -> Result<Move, SessionError> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(SessionError::Terminated);
        }
        let start = Instant::now();
        self.ensure_worker();
        self.exhaustive_cancel.reset();
        self.sampled_cancel.reset();
        self.searching.store(true, Ordering::Release);

        let seed = self.turn_seed;
        self.turn_seed = self.turn_seed.wrapping_add(1);
        let exhaustive = self.spawn_exhaustive();
        let sampled = self.spawn_sampled(seed);

        let reserve = self.config.decision_reserve;
        let search_until = start + self.config.turn_budget.saturating_sub(reserve);
        while Instant::now() < search_until {
            let remaining = search_until.saturating_duration_since(Instant::now());
            thread::sleep(remaining.min(WAIT_SLICE));
        }

        let deadline = start + self.config.turn_budget;
        let decision = decide(&self.tree, self.root, &self.config.eval_weights, deadline);

        self.exhaustive_cancel.cancel();
        self.sampled_cancel.cancel();
        let _ = exhaustive.join();
        let _ = sampled.join();
        self.searching.store(false, Ordering::Release);

        let mv = match decision {
            Ok(decision) => decision.mv,
            Err(DecisionError::Timeout) => {
                warn!("decision timed out, playing the first legal move");
                self.fallback_move()?
            }
            Err(DecisionError::NoLegalMove) => return Err(SessionError::NoLegalMove),
        };

        let after = self.commit(mv)?;
        let (new_root, _) = self.tree.get_or_create(Some(mv), &after);
        self.tree.adopt(self.root, mv, new_root);
        self.root = new_root;

        let message = MoveMessage::from_move(&mv);
        if let Err(error) = self.sink.send(&message) {
            warn!(%error, "move transmission failed");
        }

        let removed = self.tree.prune(after.ply(), self.root);
        info!(%mv, ply = after.ply(), removed, elapsed = ?start.elapsed(), "turn committed");
        Ok(mv)
    }

    /// Stop every worker. Further turn calls return
    /// [`SessionError::Terminated`].
    pub fn shutdown(&mut self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.exhaustive_cancel.cancel();
        self.sampled_cancel.cancel();
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        info!("session shut down");
    }

    /// Apply a move to the canonical board, returning the advanced copy.
    /// Rejection means the board and the match have diverged; the session
    /// shuts down and stays terminated.
    fn commit(&mut self, mv: Move) -> Result<GameState, SessionError> {
        let applied = {
            let mut board = self.board.lock();
            if board.apply(mv) {
                Some(board.clone())
            } else {
                None
            }
        };
        match applied {
            Some(after) => Ok(after),
            None => {
                warn!(%mv, "canonical board rejected move, terminating session");
                self.shutdown();
                Err(SessionError::Desync { mv })
            }
        }
    }

    fn ensure_worker(&mut self) {
        if self.worker.is_some() {
            return;
        }
        if let Some(receivers) = self.receivers.take() {
            self.worker = Some(EvalWorker::spawn(
                Arc::clone(&self.tree),
                receivers,
                self.config.eval_weights,
                self.config.evaluator_park,
            ));
        }
    }

    fn fallback_move(&self) -> Result<Move, SessionError> {
        let board = self.board.lock();
        generate_moves(&board, board.turn_pieces())
            .into_iter()
            .next()
            .ok_or(SessionError::NoLegalMove)
    }

    fn spawn_exhaustive(&self) -> JoinHandle<()> {
        let tree = Arc::clone(&self.tree);
        let queue = self.queue.clone();
        let cancel = self.exhaustive_cancel.clone();
        let explored = Arc::clone(&self.explored);
        let board = Arc::clone(&self.board);
        thread::spawn(move || run_exhaustive(tree, queue, cancel, explored, board))
    }

    fn spawn_sampled(&self, seed: u64) -> JoinHandle<()> {
        let tree = Arc::clone(&self.tree);
        let queue = self.queue.clone();
        let cancel = self.sampled_cancel.clone();
        let explored = Arc::clone(&self.explored);
        let board = Arc::clone(&self.board);
        let config = self.config.clone();
        thread::spawn(move || run_sampled(tree, queue, cancel, explored, board, config, seed))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Rerun the full expansion until one run completes without being
/// cancelled. A completed run also covers every later position of the
/// match, so the explored flag stays set for good.
fn run_exhaustive(
    tree: Arc<GameTree>,
    queue: EvalQueue,
    cancel: CancelToken,
    explored: Arc<AtomicBool>,
    board: Arc<Mutex<GameState>>,
) {
    let search = ExhaustiveSearch::new(tree, queue, cancel.clone());
    while !cancel.is_cancelled() && !explored.load(Ordering::Acquire) {
        let snapshot = board.lock().clone();
        if search.run(&snapshot) {
            explored.store(true, Ordering::Release);
            debug!("tree fully explored");
        }
    }
}

/// Run escalating sampled passes until cancelled or the tree is fully
/// explored. Effort grows after every completed pass and resets when a
/// pass is cut short; the snapshot is refreshed each pass so a match that
/// moved on is picked up immediately.
fn run_sampled(
    tree: Arc<GameTree>,
    queue: EvalQueue,
    cancel: CancelToken,
    explored: Arc<AtomicBool>,
    board: Arc<Mutex<GameState>>,
    config: SearchConfig,
    seed: u64,
) {
    let mut search = match SampledSearch::new(tree, queue, &config, cancel.clone(), seed) {
        Ok(search) => search,
        Err(error) => {
            warn!(%error, "sampled strategy disabled: bad policy weights");
            return;
        }
    };
    let mut effort = Escalation::new(&config);
    while !cancel.is_cancelled() && !explored.load(Ordering::Acquire) {
        let snapshot = board.lock().clone();
        if search.run(&snapshot, effort.branches(), effort.depth()) {
            effort.advance();
        } else {
            effort.reset();
        }
    }
}

/// Sampled-pass effort. Fractional growth widens branches roughly once
/// per three completed passes while depth grows faster; a cancelled pass
/// resets both, since the match moved to a fresh position.
struct Escalation {
    branches: f64,
    depth: f64,
    initial_branches: f64,
    initial_depth: f64,
    branch_step: f64,
    depth_step: f64,
}

impl Escalation {
    fn new(config: &SearchConfig) -> Escalation {
        Escalation {
            branches: config.initial_branches as f64,
            depth: config.initial_depth as f64,
            initial_branches: config.initial_branches as f64,
            initial_depth: config.initial_depth as f64,
            branch_step: config.branch_increment,
            depth_step: config.depth_increment,
        }
    }

    fn branches(&self) -> u32 {
        self.branches as u32
    }

    fn depth(&self) -> u32 {
        self.depth as u32
    }

    fn advance(&mut self) {
        self.branches += self.branch_step;
        self.depth += self.depth_step;
    }

    fn reset(&mut self) {
        self.branches = self.initial_branches;
        self.depth = self.initial_depth;
    }
}
