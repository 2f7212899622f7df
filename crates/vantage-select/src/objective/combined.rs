use vantage_suite::types::{TestCase, TestSuite};

use super::{CoverageObjective, DiversityObjective, Objective, ObjectiveError};

/// Convex combination `alpha * coverage + (1 - alpha) * diversity`.
#[derive(Debug, Clone)]
pub struct CombinedObjective {
    coverage: CoverageObjective,
    diversity: DiversityObjective,
    alpha: f64,
}

impl CombinedObjective {
    pub fn new(
        coverage: CoverageObjective,
        diversity: DiversityObjective,
        alpha: f64,
    ) -> Result<Self, ObjectiveError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ObjectiveError::InvalidWeight(alpha));
        }
        Ok(Self {
            coverage,
            diversity,
            alpha,
        })
    }

    pub fn from_suite(suite: &TestSuite, alpha: f64) -> Result<Self, ObjectiveError> {
        Self::new(
            CoverageObjective::from_suite(suite),
            DiversityObjective::new(),
            alpha,
        )
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Objective for CombinedObjective {
    fn name(&self) -> &str {
        "combined"
    }

    fn evaluate(&self, selected: &[&TestCase], candidate: &TestCase) -> Result<f64, ObjectiveError> {
        let coverage = self.coverage.evaluate(selected, candidate)?;
        let diversity = self.diversity.evaluate(selected, candidate)?;
        Ok(self.alpha * coverage + (1.0 - self.alpha) * diversity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite() -> TestSuite {
        TestSuite::new(vec![
            TestCase::new("t1").with_coverage(["a", "b"]),
            TestCase::new("t2").with_coverage(["b", "c"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        assert_eq!(
            CombinedObjective::from_suite(&suite(), 1.5).unwrap_err(),
            ObjectiveError::InvalidWeight(1.5)
        );
        assert!(CombinedObjective::from_suite(&suite(), -0.1).is_err());
        assert!(CombinedObjective::from_suite(&suite(), f64::NAN).is_err());
    }

    #[test]
    fn test_alpha_extremes_select_single_objective() {
        let s = suite();
        let t = s.tests();
        let pure_cov = CombinedObjective::from_suite(&s, 1.0).unwrap();
        let pure_div = CombinedObjective::from_suite(&s, 0.0).unwrap();
        assert_eq!(pure_cov.evaluate(&[&t[0]], &t[1]).unwrap(), 1.0);
        let div = pure_div.evaluate(&[&t[0]], &t[1]).unwrap();
        assert!((div - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_half_weighting() {
        let s = suite();
        let obj = CombinedObjective::from_suite(&s, 0.5).unwrap();
        // empty selection: coverage 2, diversity bootstrap 1
        assert_eq!(obj.evaluate(&[], &s.tests()[0]).unwrap(), 1.5);
    }
}
