//! Greedy submodular maximization over a test suite.
//!
//! Each round scores every remaining test against the current selection and
//! commits the strict maximum. Ties go to the earliest test in suite order.
//! Rounds are sequential; inside a round candidates are independent, so
//! large pools are scored with rayon and reduced on the calling thread:
//! map, then reduce, then commit.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vantage_suite::types::{TestCase, TestSuite};

use crate::objective::{Objective, ObjectiveError};
use crate::order::PrioritizedOrder;

#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    #[error("objective '{objective}' failed in round {round} on test '{candidate}': {source}")]
    Objective {
        objective: String,
        round: usize,
        candidate: String,
        #[source]
        source: ObjectiveError,
    },
}

/// Tuning for the greedy loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyConfig {
    /// Pools at least this large are scored in parallel.
    pub parallel_threshold: usize,
    /// Emit a progress line every this many picks (0 = never).
    pub progress_every: usize,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 64,
            progress_every: 10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GreedyPrioritizer {
    config: GreedyConfig,
}

impl GreedyPrioritizer {
    pub fn new(config: GreedyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GreedyConfig {
        &self.config
    }

    /// Select up to `k` tests from `suite`, in pick order.
    ///
    /// `k = 0` or an empty suite yields an empty order.
    pub fn prioritize(
        &self,
        suite: &TestSuite,
        objective: &dyn Objective,
        k: usize,
    ) -> Result<PrioritizedOrder, SelectError> {
        let started = Instant::now();
        let rounds = k.min(suite.len());
        let mut order = PrioritizedOrder::new(objective.name());
        let mut selected: Vec<&TestCase> = Vec::with_capacity(rounds);
        let mut remaining: Vec<&TestCase> = suite.tests().iter().collect();

        for round in 0..rounds {
            let scores = self.score_round(objective, &selected, &remaining);

            let mut best: Option<(usize, f64)> = None;
            for (idx, score) in scores.into_iter().enumerate() {
                let gain = score
                    .and_then(|g| {
                        if g.is_finite() {
                            Ok(g)
                        } else {
                            Err(ObjectiveError::NonFinite)
                        }
                    })
                    .map_err(|source| SelectError::Objective {
                        objective: objective.name().to_string(),
                        round,
                        candidate: remaining[idx].id.clone(),
                        source,
                    })?;
                match best {
                    Some((_, best_gain)) if gain <= best_gain => {}
                    _ => best = Some((idx, gain)),
                }
            }

            // `remaining` is non-empty for every round, so a winner exists.
            let Some((idx, gain)) = best else { break };
            let winner = remaining.remove(idx);
            debug!(round, test = %winner.id, gain, "greedy pick");
            order.push(&winner.id, Some(gain));
            selected.push(winner);

            let picked = round + 1;
            if self.config.progress_every > 0 && picked % self.config.progress_every == 0 {
                info!(picked, total = rounds, "greedy selection progress");
            }
        }

        info!(
            objective = objective.name(),
            selected = order.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "greedy prioritization complete"
        );
        Ok(order)
    }

    /// Order the whole suite.
    pub fn prioritize_all(
        &self,
        suite: &TestSuite,
        objective: &dyn Objective,
    ) -> Result<PrioritizedOrder, SelectError> {
        self.prioritize(suite, objective, suite.len())
    }

    /// Score every remaining candidate; results are indexed like `remaining`.
    fn score_round(
        &self,
        objective: &dyn Objective,
        selected: &[&TestCase],
        remaining: &[&TestCase],
    ) -> Vec<Result<f64, ObjectiveError>> {
        if remaining.len() >= self.config.parallel_threshold {
            remaining
                .par_iter()
                .map(|candidate| objective.evaluate(selected, candidate))
                .collect()
        } else {
            remaining
                .iter()
                .map(|candidate| objective.evaluate(selected, candidate))
                .collect()
        }
    }
}
