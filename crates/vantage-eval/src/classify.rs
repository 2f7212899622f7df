//! Map failed executions to fault identifiers.
//!
//! Rules are checked in order and the first match wins. A failure no rule
//! recognizes gets an `unknown_fault_N` bucket keyed by the test and the
//! first error line of its output, so the same failure seen twice lands in
//! one bucket while unrelated failures never merge.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vantage_select::order::PrioritizedOrder;
use vantage_suite::types::FaultModel;

use crate::transcript::ExecutionRecord;

pub const UNKNOWN_FAULT_PREFIX: &str = "unknown_fault_";

/// Method name used for orders recovered from a transcript.
pub const EXECUTION_METHOD: &str = "execution";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRule {
    pub fault: String,
    /// Substring of the test id.
    pub test_contains: String,
    /// Substring of the captured output; absent means any output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_contains: Option<String>,
}

impl FaultRule {
    pub fn new(fault: impl Into<String>, test_contains: impl Into<String>) -> Self {
        Self {
            fault: fault.into(),
            test_contains: test_contains.into(),
            output_contains: None,
        }
    }

    pub fn with_output(mut self, output_contains: impl Into<String>) -> Self {
        self.output_contains = Some(output_contains.into());
        self
    }

    pub fn matches(&self, test_id: &str, output: &str) -> bool {
        test_id.contains(&self.test_contains)
            && self
                .output_contains
                .as_deref()
                .map_or(true, |needle| output.contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultClassifier {
    rules: Vec<FaultRule>,
}

impl FaultClassifier {
    pub fn new(rules: Vec<FaultRule>) -> Self {
        Self { rules }
    }

    /// Parse a JSON array of rules.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn rules(&self) -> &[FaultRule] {
        &self.rules
    }

    pub fn classify(&self, test_id: &str, output: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(test_id, output))
            .map(|rule| rule.fault.as_str())
    }
}

/// First error line of a failure's output.
///
/// Prefers pytest's `E   ...` lines; otherwise the first non-blank line.
pub fn failure_signature(output: &str) -> String {
    let mut first_nonblank = None;
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("E ") {
            return rest.trim().to_string();
        }
        first_nonblank.get_or_insert(trimmed);
    }
    first_nonblank.unwrap_or("").to_string()
}

/// Faults recovered from one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFaults {
    pub model: FaultModel,
    /// Fault -> (1-based position in `order`, first detecting test).
    pub first_detection: BTreeMap<String, (usize, String)>,
    /// Execution order, each test id once.
    pub order: PrioritizedOrder,
}

impl DerivedFaults {
    pub fn unknown_faults(&self) -> usize {
        self.model
            .fault_ids()
            .filter(|f| f.starts_with(UNKNOWN_FAULT_PREFIX))
            .count()
    }
}

/// Classify every failed record and rebuild the execution order.
///
/// A test id executed more than once (e.g. several parameters) keeps its
/// first position.
pub fn derive_faults(records: &[ExecutionRecord], classifier: &FaultClassifier) -> DerivedFaults {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order_ids: Vec<&str> = Vec::new();
    let mut position_of: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if seen.insert(record.test_id.as_str()) {
            order_ids.push(record.test_id.as_str());
            position_of.insert(record.test_id.as_str(), order_ids.len());
        }
    }

    let mut model = FaultModel::new();
    let mut first_detection: BTreeMap<String, (usize, String)> = BTreeMap::new();
    let mut unknown: HashMap<(&str, String), String> = HashMap::new();

    for record in records.iter().filter(|r| r.failed()) {
        let fault = match classifier.classify(&record.test_id, &record.output) {
            Some(fault) => fault.to_string(),
            None => {
                let context = (record.test_id.as_str(), failure_signature(&record.output));
                let next = unknown.len() + 1;
                let bucket = unknown
                    .entry(context)
                    .or_insert_with(|| format!("{UNKNOWN_FAULT_PREFIX}{next}"));
                debug!(test = %record.test_id, bucket = %bucket, "unrecognized failure");
                bucket.clone()
            }
        };

        model.add_detector(&fault, &record.test_id);
        let position = position_of
            .get(record.test_id.as_str())
            .copied()
            .unwrap_or(record.position);
        first_detection
            .entry(fault)
            .or_insert_with(|| (position, record.test_id.clone()));
    }

    info!(
        executed = order_ids.len(),
        faults = model.len(),
        unknown = unknown.len(),
        "faults derived from execution"
    );

    DerivedFaults {
        model,
        first_detection,
        order: PrioritizedOrder::from_ids(EXECUTION_METHOD, order_ids),
    }
}
