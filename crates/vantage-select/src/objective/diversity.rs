use std::collections::BTreeSet;

use vantage_suite::types::TestCase;

use super::{Objective, ObjectiveError};

/// Gain of the first pick, before there is anything to be diverse from.
pub const BOOTSTRAP_GAIN: f64 = 1.0;

/// Jaccard distance; two empty sets are at distance 0.
pub fn jaccard_distance(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    1.0 - intersection as f64 / union as f64
}

/// Gain = mean Jaccard distance from the candidate to each selected test.
#[derive(Debug, Clone, Default)]
pub struct DiversityObjective;

impl DiversityObjective {
    pub fn new() -> Self {
        Self
    }
}

impl Objective for DiversityObjective {
    fn name(&self) -> &str {
        "diversity"
    }

    fn evaluate(&self, selected: &[&TestCase], candidate: &TestCase) -> Result<f64, ObjectiveError> {
        if selected.is_empty() {
            return Ok(BOOTSTRAP_GAIN);
        }
        let total: f64 = selected
            .iter()
            .map(|s| jaccard_distance(&candidate.coverage, &s.coverage))
            .sum();
        Ok(total / selected.len() as f64)
    }
}
