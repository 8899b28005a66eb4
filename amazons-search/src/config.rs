//! Search configuration parameters.

use std::time::Duration;

use amazons_core::EvalWeights;

/// Categorical weights for drawing the heuristic variant a tree policy
/// scores candidates with. They do not need to sum to one; the draw
/// normalizes over whatever mass is present.
#[derive(Debug, Clone, Copy)]
pub struct PolicyWeights {
    pub first_degree: f64,
    pub count: f64,
    pub territory: f64,
    pub all: f64,
    pub nothing: f64,
}

impl PolicyWeights {
    /// Weights in the fixed variant order used by the categorical draw:
    /// first degree, count, territory, all, nothing.
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.first_degree,
            self.count,
            self.territory,
            self.all,
            self.nothing,
        ]
    }
}

impl Default for PolicyWeights {
    fn default() -> Self {
        Self {
            first_degree: 0.25,
            count: 0.20,
            territory: 0.20,
            all: 0.25,
            nothing: 0.10,
        }
    }
}

/// Configuration for a search session.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Branch count the sampled strategy starts a turn with.
    pub initial_branches: u32,

    /// Depth the sampled strategy starts a turn with.
    pub initial_depth: u32,

    /// Fractional branch growth applied after each completed sampled pass.
    pub branch_increment: f64,

    /// Fractional depth growth applied after each completed sampled pass.
    pub depth_increment: f64,

    /// Categorical weights for the tree-policy heuristic draw.
    pub policy_weights: PolicyWeights,

    /// Blend weights for the combined heuristic.
    pub eval_weights: EvalWeights,

    /// Wall-clock budget for one full turn, including the decision.
    pub turn_budget: Duration,

    /// Slice of the turn budget reserved for the decision pass. Search is
    /// cancelled this long before the budget expires.
    pub decision_reserve: Duration,

    /// How long the evaluator sleeps when both lanes are empty.
    pub evaluator_park: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_branches: 3,
            initial_depth: 3,
            branch_increment: 0.333,
            depth_increment: 1.5,
            policy_weights: PolicyWeights::default(),
            eval_weights: EvalWeights::default(),
            turn_budget: Duration::from_secs(30),
            decision_reserve: Duration::from_millis(40),
            evaluator_park: Duration::from_millis(10),
        }
    }
}

impl SearchConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            initial_branches: 2,
            initial_depth: 2,
            turn_budget: Duration::from_millis(200),
            decision_reserve: Duration::from_millis(150),
            evaluator_park: Duration::from_millis(1),
            ..Self::default()
        }
    }

    /// Builder pattern: set the starting branch count.
    pub fn with_initial_branches(mut self, branches: u32) -> Self {
        self.initial_branches = branches;
        self
    }

    /// Builder pattern: set the starting depth.
    pub fn with_initial_depth(mut self, depth: u32) -> Self {
        self.initial_depth = depth;
        self
    }

    /// Builder pattern: set the turn budget.
    pub fn with_turn_budget(mut self, budget: Duration) -> Self {
        self.turn_budget = budget;
        self
    }

    /// Builder pattern: set the decision reserve.
    pub fn with_decision_reserve(mut self, reserve: Duration) -> Self {
        self.decision_reserve = reserve;
        self
    }
}
