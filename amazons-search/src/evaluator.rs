//! Asynchronous heuristic evaluator.
//!
//! A single worker thread drains two lanes of (state, node) work items:
//! `append` feeds the back of the queue, `expedite` the front, and the
//! front lane always wins when both hold items. Processing computes the
//! combined heuristic for the state and publishes it onto the node, which
//! folds the value toward ancestors. A missing node (pruned while queued)
//! is skipped; one bad item never stops the loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, unbounded, Receiver, Sender, TryRecvError};
use tracing::{debug, trace};

use amazons_core::{eval, EvalWeights, GameState};

use crate::cancel::CancelToken;
use crate::node::NodeId;
use crate::store::GameTree;

/// One unit of evaluator work. Carries the state alongside the handle so
/// the worker never has to re-derive the position.
#[derive(Debug, Clone)]
pub struct EvalItem {
    pub state: GameState,
    pub node: NodeId,
}

impl EvalItem {
    pub fn new(state: GameState, node: NodeId) -> EvalItem {
        EvalItem { state, node }
    }
}

/// Producer handle for the evaluator queue.
#[derive(Debug, Clone)]
pub struct EvalQueue {
    append: Sender<EvalItem>,
    expedite: Sender<EvalItem>,
}

impl EvalQueue {
    /// Queue an item behind everything already waiting.
    pub fn append(&self, item: EvalItem) {
        let _ = self.append.send(item);
    }

    /// Queue an item ahead of the default lane.
    pub fn expedite(&self, item: EvalItem) {
        let _ = self.expedite.send(item);
    }
}

/// Consumer side of the evaluator queue.
#[derive(Debug)]
pub struct EvalReceivers {
    pub(crate) append: Receiver<EvalItem>,
    pub(crate) expedite: Receiver<EvalItem>,
}

/// Create the linked producer/consumer pair for one evaluator.
pub fn eval_channel() -> (EvalQueue, EvalReceivers) {
    let (append_tx, append_rx) = unbounded();
    let (expedite_tx, expedite_rx) = unbounded();
    (
        EvalQueue {
            append: append_tx,
            expedite: expedite_tx,
        },
        EvalReceivers {
            append: append_rx,
            expedite: expedite_rx,
        },
    )
}

enum Drained {
    Item(EvalItem),
    Empty,
    Disconnected,
}

/// Strict lane priority: the expedite lane is drained before the append
/// lane is even looked at.
fn try_next(receivers: &EvalReceivers) -> Drained {
    match receivers.expedite.try_recv() {
        Ok(item) => Drained::Item(item),
        Err(TryRecvError::Disconnected) => Drained::Disconnected,
        Err(TryRecvError::Empty) => match receivers.append.try_recv() {
            Ok(item) => Drained::Item(item),
            Err(TryRecvError::Disconnected) => Drained::Disconnected,
            Err(TryRecvError::Empty) => Drained::Empty,
        },
    }
}

/// Handle to the running evaluator thread.
#[derive(Debug)]
pub struct EvalWorker {
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl EvalWorker {
    /// Start the worker thread. It runs until cancelled or until every
    /// producer handle has been dropped.
    pub fn spawn(
        tree: Arc<GameTree>,
        receivers: EvalReceivers,
        weights: EvalWeights,
        park: Duration,
    ) -> EvalWorker {
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let handle = thread::spawn(move || {
            run_worker(&tree, &receivers, &weights, park, &worker_cancel);
            debug!("evaluator stopped");
        });
        EvalWorker {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop after the in-flight item, then join.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EvalWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(
    tree: &GameTree,
    receivers: &EvalReceivers,
    weights: &EvalWeights,
    park: Duration,
    cancel: &CancelToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match try_next(receivers) {
            Drained::Item(item) => process(tree, weights, item),
            Drained::Disconnected => break,
            Drained::Empty => {
                // Block for new work, but wake periodically to observe
                // cancellation.
                select! {
                    recv(receivers.expedite) -> msg => match msg {
                        Ok(item) => process(tree, weights, item),
                        Err(_) => break,
                    },
                    recv(receivers.append) -> msg => match msg {
                        Ok(item) => process_after_expedited(tree, receivers, weights, item),
                        Err(_) => break,
                    },
                    default(park) => {}
                }
            }
        }
    }
}

/// `select!` picks among ready arms arbitrarily, so an append item can be
/// handed over while the front lane also received work during the same
/// park. Empty the front lane before running the handed-over item.
fn process_after_expedited(
    tree: &GameTree,
    receivers: &EvalReceivers,
    weights: &EvalWeights,
    item: EvalItem,
) {
    while let Ok(front) = receivers.expedite.try_recv() {
        process(tree, weights, front);
    }
    process(tree, weights, item);
}

fn process(tree: &GameTree, weights: &EvalWeights, item: EvalItem) {
    if tree.node(item.node).is_none() {
        trace!(node = item.node.0, "dropping evaluation for pruned node");
        return;
    }
    let value = eval::combined(&item.state, weights);
    tree.publish_value(item.node, value);
}
