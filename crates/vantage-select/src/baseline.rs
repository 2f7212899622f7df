//! Non-submodular reference orderings the greedy methods are compared with.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vantage_suite::types::{TestCase, TestSuite};

use crate::order::PrioritizedOrder;

/// Stream tag mixed into the experiment seed for the random baseline.
pub const RANDOM_ORDER_STREAM: u64 = 0x7261_6e64_6f6d; // "random"

/// Same seed, same shuffle, on every platform.
fn random_order_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ RANDOM_ORDER_STREAM)
}

/// Seeded shuffle of the whole suite.
pub fn random_order(suite: &TestSuite, seed: u64) -> PrioritizedOrder {
    let mut tests: Vec<&TestCase> = suite.tests().iter().collect();
    tests.shuffle(&mut random_order_rng(seed));

    let mut order = PrioritizedOrder::new("random");
    for t in tests {
        order.push(&t.id, None);
    }
    info!(seed, tests = order.len(), "random prioritization complete");
    order
}

/// Sort by score, highest first. Equal scores keep suite order.
fn stable_by_score<'a>(
    method: &str,
    suite: &'a TestSuite,
    score: impl Fn(&'a TestCase) -> f64,
) -> PrioritizedOrder {
    let mut scored: Vec<(&TestCase, f64)> = suite.tests().iter().map(|t| (t, score(t))).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut order = PrioritizedOrder::new(method);
    for (t, s) in scored {
        order.push(&t.id, Some(s));
    }
    order
}

/// Complexity weight of each calculator function a test may target. Used
/// as the default `function_weights`; targets not listed score 0.
pub const DEFAULT_FUNCTION_WEIGHTS: &[(&str, f64)] = &[
    ("square_root", 50.0),
    ("divide", 40.0),
    ("power", 30.0),
    ("multiply", 20.0),
    ("subtract", 10.0),
    ("add", 5.0),
];

/// Weights for the semantic-feature score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticWeights {
    pub exception: f64,
    pub per_assertion: f64,
    pub per_unique_call: f64,
    /// Extra weight per targeted library function.
    pub function_weights: BTreeMap<String, f64>,
}

impl Default for SemanticWeights {
    fn default() -> Self {
        Self {
            exception: 100.0,
            per_assertion: 10.0,
            per_unique_call: 5.0,
            function_weights: DEFAULT_FUNCTION_WEIGHTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        }
    }
}

impl SemanticWeights {
    pub fn score(&self, test: &TestCase) -> f64 {
        let f = &test.features;
        let mut score = 0.0;
        if f.raises_exception {
            score += self.exception;
        }
        score += f64::from(f.assertion_count) * self.per_assertion;
        if let Some(target) = &f.target_function {
            score += self.function_weights.get(target).copied().unwrap_or(0.0);
        }
        score += f.unique_calls.len() as f64 * self.per_unique_call;
        score
    }
}

/// Order by static semantic features of each test.
pub fn semantic_order(suite: &TestSuite, weights: &SemanticWeights) -> PrioritizedOrder {
    let order = stable_by_score("semantic", suite, |t| weights.score(t));
    for (rank, entry) in order.entries.iter().take(5).enumerate() {
        debug!(rank = rank + 1, test = %entry.id, score = ?entry.score, "semantic top test");
    }
    order
}

/// Outcome of a test in a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoricalOutcome {
    Pass,
    Fail,
}

/// Previous-run outcomes keyed by test name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureHistory {
    outcomes: BTreeMap<String, HistoricalOutcome>,
}

impl FailureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, test: impl Into<String>, outcome: HistoricalOutcome) {
        self.outcomes.insert(test.into(), outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Method names (last `::` segment) of every recorded failure.
    pub fn failed_methods(&self) -> BTreeSet<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| **o == HistoricalOutcome::Fail)
            .map(|(name, _)| name.rsplit("::").next().unwrap_or(name))
            .collect()
    }
}

/// Score of a test that failed last time.
pub const PREVIOUS_FAILURE_SCORE: f64 = 100.0;

/// Previously failing tests first, everything else in suite order.
///
/// Names are matched on the method name only, since history files may use
/// a different path prefix than the suite.
pub fn failure_history_order(suite: &TestSuite, history: &FailureHistory) -> PrioritizedOrder {
    let failed = history.failed_methods();
    let order = stable_by_score("failure_history", suite, |t| {
        if failed.contains(t.method_name()) {
            PREVIOUS_FAILURE_SCORE
        } else {
            0.0
        }
    });
    let boosted = order
        .entries
        .iter()
        .filter(|e| e.score.unwrap_or(0.0) > 0.0)
        .count();
    info!(
        history = history.len(),
        boosted, "failure-history prioritization complete"
    );
    order
}
