//! Marginal-gain objectives for greedy prioritization.
//!
//! Every objective here is monotone non-decreasing and submodular in the
//! selected set, which is what gives the greedy loop its (1 - 1/e)
//! approximation guarantee. New objectives must preserve both properties.

pub mod combined;
pub mod coverage;
pub mod diversity;
pub mod facility;

pub use combined::CombinedObjective;
pub use coverage::CoverageObjective;
pub use diversity::DiversityObjective;
pub use facility::FacilityLocationObjective;

use vantage_suite::types::TestCase;

/// Errors raised while scoring a candidate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ObjectiveError {
    #[error("test '{0}' has no embedding")]
    MissingEmbedding(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("zero-norm vector cannot be compared")]
    ZeroNorm,

    #[error("vector contains non-finite values")]
    NonFinite,

    #[error("weight {0} outside [0, 1]")]
    InvalidWeight(f64),
}

/// Scores the marginal gain of appending `candidate` to `selected`.
///
/// `selected` is in pick order and may be empty. Implementations must be
/// pure: the greedy loop may score candidates of one round concurrently.
pub trait Objective: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, selected: &[&TestCase], candidate: &TestCase)
        -> Result<f64, ObjectiveError>;
}
