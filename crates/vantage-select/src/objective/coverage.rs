use std::collections::BTreeSet;

use vantage_suite::types::{TestCase, TestSuite};

use super::{Objective, ObjectiveError};

/// Gain = number of newly covered elements.
///
/// The universe is fixed before the run; elements outside it never count.
#[derive(Debug, Clone)]
pub struct CoverageObjective {
    universe: BTreeSet<String>,
}

impl CoverageObjective {
    pub fn new(universe: BTreeSet<String>) -> Self {
        Self { universe }
    }

    /// Universe = union of every test's coverage.
    pub fn from_suite(suite: &TestSuite) -> Self {
        Self::new(suite.universe())
    }

    pub fn universe(&self) -> &BTreeSet<String> {
        &self.universe
    }
}

impl Objective for CoverageObjective {
    fn name(&self) -> &str {
        "coverage"
    }

    fn evaluate(&self, selected: &[&TestCase], candidate: &TestCase) -> Result<f64, ObjectiveError> {
        let new = candidate
            .coverage
            .iter()
            .filter(|e| self.universe.contains(*e))
            .filter(|e| !selected.iter().any(|s| s.coverage.contains(*e)))
            .count();
        Ok(new as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tests() -> Vec<TestCase> {
        vec![
            TestCase::new("t1").with_coverage(["a", "b"]),
            TestCase::new("t2").with_coverage(["b", "c"]),
            TestCase::new("t3").with_coverage(["d"]),
        ]
    }

    #[test]
    fn test_gain_on_empty_selection_is_full_coverage() {
        let suite = TestSuite::new(tests()).unwrap();
        let obj = CoverageObjective::from_suite(&suite);
        assert_eq!(obj.evaluate(&[], &suite.tests()[0]).unwrap(), 2.0);
    }

    #[test]
    fn test_gain_counts_only_new_elements() {
        let suite = TestSuite::new(tests()).unwrap();
        let obj = CoverageObjective::from_suite(&suite);
        let t = suite.tests();
        assert_eq!(obj.evaluate(&[&t[0]], &t[1]).unwrap(), 1.0);
        assert_eq!(obj.evaluate(&[&t[0], &t[1]], &t[2]).unwrap(), 1.0);
        assert_eq!(obj.evaluate(&[&t[1]], &t[1]).unwrap(), 0.0);
    }

    #[test]
    fn test_elements_outside_universe_ignored() {
        let universe: BTreeSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        let obj = CoverageObjective::new(universe);
        let t = TestCase::new("t").with_coverage(["a", "z"]);
        assert_eq!(obj.evaluate(&[], &t).unwrap(), 1.0);
    }
}
