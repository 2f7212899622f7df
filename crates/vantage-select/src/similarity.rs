//! Pairwise similarity between dense embeddings.
//!
//! The embedding model itself lives outside this crate; the facility-location
//! objective only needs a way to compare two vectors.

use crate::objective::ObjectiveError;

/// Capability injected into embedding-based objectives.
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f64, ObjectiveError>;
}

fn check_finite(v: &[f32]) -> Result<(), ObjectiveError> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(ObjectiveError::NonFinite)
    }
}

/// Cosine similarity over raw (not pre-normalized) embeddings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl Similarity for CosineSimilarity {
    fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f64, ObjectiveError> {
        if a.len() != b.len() {
            return Err(ObjectiveError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        check_finite(a)?;
        check_finite(b)?;

        let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
        for (x, y) in a.iter().zip(b) {
            let (x, y) = (f64::from(*x), f64::from(*y));
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }
        if norm_a == 0.0 || norm_b == 0.0 {
            return Err(ObjectiveError::ZeroNorm);
        }
        Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
    }
}
