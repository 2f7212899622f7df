use vantage_suite::types::TestCase;

use super::{Objective, ObjectiveError};
use crate::similarity::{CosineSimilarity, Similarity};

/// Facility location over a fixed set of reference embeddings.
///
/// Each reference (an embedded source-code unit) is "served" by the most
/// similar selected test. A candidate gains the total improvement it brings
/// to those per-reference maxima. The first pick has no maxima to improve,
/// so it scores its mean similarity to the references, floored at zero.
pub struct FacilityLocationObjective<S = CosineSimilarity> {
    references: Vec<Vec<f32>>,
    similarity: S,
}

impl FacilityLocationObjective<CosineSimilarity> {
    pub fn new(references: Vec<Vec<f32>>) -> Self {
        Self::with_similarity(references, CosineSimilarity)
    }
}

impl<S: Similarity> FacilityLocationObjective<S> {
    pub fn with_similarity(references: Vec<Vec<f32>>, similarity: S) -> Self {
        Self {
            references,
            similarity,
        }
    }

    pub fn references(&self) -> &[Vec<f32>] {
        &self.references
    }

    fn embedding_of<'t>(&self, test: &'t TestCase) -> Result<&'t [f32], ObjectiveError> {
        test.embedding
            .as_deref()
            .ok_or_else(|| ObjectiveError::MissingEmbedding(test.id.clone()))
    }

    /// Best similarity any selected test achieves against `reference`.
    fn current_max(&self, selected: &[&[f32]], reference: &[f32]) -> Result<f64, ObjectiveError> {
        selected
            .iter()
            .try_fold(f64::NEG_INFINITY, |best, s| -> Result<f64, ObjectiveError> {
                Ok(best.max(self.similarity.similarity(s, reference)?))
            })
    }
}

impl<S: Similarity> Objective for FacilityLocationObjective<S> {
    fn name(&self) -> &str {
        "facility_location"
    }

    fn evaluate(&self, selected: &[&TestCase], candidate: &TestCase) -> Result<f64, ObjectiveError> {
        let candidate_emb = self.embedding_of(candidate)?;
        if self.references.is_empty() {
            return Ok(0.0);
        }

        if selected.is_empty() {
            let mut total = 0.0;
            for reference in &self.references {
                total += self.similarity.similarity(candidate_emb, reference)?;
            }
            return Ok((total / self.references.len() as f64).max(0.0));
        }

        let selected_embs = selected
            .iter()
            .map(|t| self.embedding_of(t))
            .collect::<Result<Vec<_>, _>>()?;

        let mut gain = 0.0;
        for reference in &self.references {
            let current = self.current_max(&selected_embs, reference)?;
            let new = self.similarity.similarity(candidate_emb, reference)?;
            gain += (new - current).max(0.0);
        }
        Ok(gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> Vec<Vec<f32>> {
        vec![vec![1.0, 0.0], vec![0.0, 1.0]]
    }

    #[test]
    fn test_first_pick_is_mean_similarity() {
        let obj = FacilityLocationObjective::new(refs());
        let t = TestCase::new("t").with_embedding(vec![1.0, 0.0]);
        // sims: 1.0 and 0.0
        assert!((obj.evaluate(&[], &t).unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_marginal_gain_only_counts_improvements() {
        let obj = FacilityLocationObjective::new(refs());
        let a = TestCase::new("a").with_embedding(vec![1.0, 0.0]);
        let b = TestCase::new("b").with_embedding(vec![0.0, 1.0]);
        // b improves ref2 from 0 to 1, ref1 stays at 1.
        assert!((obj.evaluate(&[&a], &b).unwrap() - 1.0).abs() < 1e-9);
        // a duplicate of a brings nothing.
        assert_eq!(obj.evaluate(&[&a], &a).unwrap(), 0.0);
        // once both are served nothing improves.
        assert_eq!(obj.evaluate(&[&a, &b], &a).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_embedding_is_typed_error() {
        let obj = FacilityLocationObjective::new(refs());
        let err = obj.evaluate(&[], &TestCase::new("bare")).unwrap_err();
        assert_eq!(err, ObjectiveError::MissingEmbedding("bare".to_string()));
    }

    #[test]
    fn test_malformed_reference_propagates() {
        let obj = FacilityLocationObjective::new(vec![vec![1.0, 0.0, 0.0]]);
        let t = TestCase::new("t").with_embedding(vec![1.0, 0.0]);
        assert!(matches!(
            obj.evaluate(&[], &t),
            Err(ObjectiveError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_no_references_yields_zero_gain() {
        let obj = FacilityLocationObjective::new(vec![]);
        let t = TestCase::new("t").with_embedding(vec![1.0]);
        assert_eq!(obj.evaluate(&[], &t).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_mean_floors_at_zero() {
        let obj = FacilityLocationObjective::new(vec![vec![1.0, 0.0]]);
        let t = TestCase::new("t").with_embedding(vec![-1.0, 0.0]);
        assert_eq!(obj.evaluate(&[], &t).unwrap(), 0.0);
    }
}
