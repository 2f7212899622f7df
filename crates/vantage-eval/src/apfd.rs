//! APFD (Average Percentage of Faults Detected) and the fault-detection
//! curve.
//!
//! ```text
//! APFD = 1 - (TF_1 + ... + TF_m) / (n * m) + 1 / (2n)
//! ```
//!
//! where `TF_i` is the 1-based position of the first test in the order that
//! detects fault `i`, `n` the order length and `m` the number of faults.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vantage_select::order::PrioritizedOrder;
use vantage_suite::types::{FaultModel, SuiteError, TestSuite};

use crate::classify::{derive_faults, FaultClassifier};
use crate::transcript::ExecutionRecord;

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("test '{0}' appears more than once in the order")]
    DuplicateInOrder(String),

    #[error("ordered test '{0}' is not part of the suite")]
    UnknownTestInOrder(String),

    #[error("inconsistent fault model: {0}")]
    Suite(#[from] SuiteError),
}

/// How a fault that no test in the order detects enters the sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndetectedPolicy {
    /// Left out of both the position sum and `m`: APFD is taken over the
    /// detected faults only, and an order that detects nothing scores 0.
    #[default]
    Exclude,
    /// Contributes `n + 1`, as if found just after the last test.
    Penalize,
}

/// One point of the fault-detection curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// 1-based execution position.
    pub position: usize,
    /// Distinct faults detected by tests at positions <= `position`.
    pub faults_found: usize,
    /// `faults_found / m`.
    pub fraction: f64,
}

/// Effectiveness of one order against one fault model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub apfd: f64,
    pub total_tests: usize,
    pub total_faults: usize,
    pub detected_faults: usize,
    pub first_positions: BTreeMap<String, usize>,
    /// Test sitting at each fault's first position.
    pub first_detectors: BTreeMap<String, String>,
    pub curve: Vec<CurvePoint>,
    /// Mean first position over detected faults.
    pub avg_position: f64,
    /// Share of the order (in percent) needed to reach the last detected fault.
    pub tests_needed_percentage: f64,
}

impl Metrics {
    fn degenerate(total_tests: usize, total_faults: usize) -> Self {
        Self {
            apfd: 0.0,
            total_tests,
            total_faults,
            detected_faults: 0,
            first_positions: BTreeMap::new(),
            first_detectors: BTreeMap::new(),
            curve: Vec::new(),
            avg_position: 0.0,
            tests_needed_percentage: 0.0,
        }
    }

    /// Faults with no detector in the evaluated order.
    pub fn undetected_faults(&self) -> usize {
        self.total_faults - self.detected_faults
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApfdEvaluator {
    policy: UndetectedPolicy,
}

impl ApfdEvaluator {
    pub fn new(policy: UndetectedPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UndetectedPolicy {
        self.policy
    }

    /// Score `order` against `faults`.
    ///
    /// An empty order or an empty fault model is a zero result, not an error.
    pub fn evaluate(
        &self,
        order: &PrioritizedOrder,
        faults: &FaultModel,
    ) -> Result<Metrics, EvalError> {
        let mut position_of: HashMap<&str, usize> = HashMap::with_capacity(order.len());
        for (i, id) in order.ids().enumerate() {
            if position_of.insert(id, i + 1).is_some() {
                return Err(EvalError::DuplicateInOrder(id.to_string()));
            }
        }

        let n = order.len();
        let m = faults.len();
        if n == 0 || m == 0 {
            warn!(tests = n, faults = m, "no tests or no faults, APFD is 0");
            return Ok(Metrics::degenerate(n, m));
        }

        let mut first_positions = BTreeMap::new();
        let mut first_detectors = BTreeMap::new();
        for (fault, detectors) in faults.iter() {
            let first = detectors
                .iter()
                .filter_map(|d| position_of.get(d.as_str()).map(|&p| (p, d)))
                .min();
            if let Some((position, detector)) = first {
                first_positions.insert(fault.clone(), position);
                first_detectors.insert(fault.clone(), detector.clone());
            }
        }

        let detected = first_positions.len();
        let detected_sum: usize = first_positions.values().sum();
        let (position_sum, counted) = match self.policy {
            UndetectedPolicy::Exclude => (detected_sum, detected),
            UndetectedPolicy::Penalize => (detected_sum + (m - detected) * (n + 1), m),
        };

        let (nf, mf) = (n as f64, m as f64);
        let apfd = if counted == 0 {
            warn!(tests = n, faults = m, "no fault detected, APFD is 0");
            0.0
        } else {
            // Penalized sums can push the raw value below 0.
            let raw = 1.0 - position_sum as f64 / (nf * counted as f64) + 1.0 / (2.0 * nf);
            raw.clamp(0.0, 1.0)
        };

        let mut found_at = vec![0usize; n + 1];
        for &p in first_positions.values() {
            found_at[p] += 1;
        }
        let mut found = 0;
        let curve = (1..=n)
            .map(|position| {
                found += found_at[position];
                CurvePoint {
                    position,
                    faults_found: found,
                    fraction: found as f64 / mf,
                }
            })
            .collect();

        let (avg_position, tests_needed_percentage) = if detected > 0 {
            let last = first_positions.values().copied().max().unwrap_or(0);
            (
                detected_sum as f64 / detected as f64,
                last as f64 / nf * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        info!(
            method = %order.method,
            apfd,
            tests = n,
            faults = m,
            detected,
            "APFD computed"
        );

        Ok(Metrics {
            apfd,
            total_tests: n,
            total_faults: m,
            detected_faults: detected,
            first_positions,
            first_detectors,
            curve,
            avg_position,
            tests_needed_percentage,
        })
    }

    /// Like [`evaluate`](Self::evaluate), after checking that the order and
    /// every fault detector belong to `suite`.
    pub fn evaluate_against(
        &self,
        suite: &TestSuite,
        order: &PrioritizedOrder,
        faults: &FaultModel,
    ) -> Result<Metrics, EvalError> {
        if let Some(unknown) = order.ids().find(|id| !suite.contains(id)) {
            return Err(EvalError::UnknownTestInOrder(unknown.to_string()));
        }
        faults.validate_against(suite)?;
        self.evaluate(order, faults)
    }

    /// Score a recorded execution: faults come from classifying its
    /// failures, the order is the execution order itself.
    pub fn evaluate_execution(
        &self,
        records: &[ExecutionRecord],
        classifier: &FaultClassifier,
    ) -> Result<Metrics, EvalError> {
        let derived = derive_faults(records, classifier);
        self.evaluate(&derived.order, &derived.model)
    }
}
