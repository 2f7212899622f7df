use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{FaultModel, TestSuite};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a suite document: `{"tests": [{"id": ..., "coverage": [...]}, ...]}`.
pub fn parse_suite(json: &str) -> Result<TestSuite, ParseError> {
    let suite: TestSuite = serde_json::from_str(json)?;
    debug!(tests = suite.len(), "suite parsed");
    Ok(suite)
}

/// Parse a fault model document: `{"fault_id": ["test_id", ...], ...}`.
pub fn parse_fault_model(json: &str) -> Result<FaultModel, ParseError> {
    let faults: FaultModel = serde_json::from_str(json)?;
    debug!(faults = faults.len(), "fault model parsed");
    Ok(faults)
}

/// Parse reference embeddings keyed by source unit name.
///
/// Sorted by name so the reference order never depends on the file layout.
pub fn parse_references(json: &str) -> Result<Vec<(String, Vec<f32>)>, ParseError> {
    let map: BTreeMap<String, Vec<f32>> = serde_json::from_str(json)?;
    Ok(map.into_iter().collect())
}
