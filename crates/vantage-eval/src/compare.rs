//! Side-by-side comparison of prioritization methods.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::apfd::Metrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    pub method: String,
    pub metrics: Metrics,
}

impl MethodResult {
    pub fn new(method: impl Into<String>, metrics: Metrics) -> Self {
        Self {
            method: method.into(),
            metrics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMethod {
    /// 1-based.
    pub rank: usize,
    pub method: String,
    pub apfd: f64,
    pub detected_faults: usize,
    pub avg_position: f64,
}

/// Which method found a fault earliest and which latest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultComparison {
    pub fault: String,
    pub best_method: String,
    pub best_position: usize,
    pub worst_method: String,
    pub worst_position: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub ranking: Vec<RankedMethod>,
    pub faults: Vec<FaultComparison>,
}

impl Comparison {
    pub fn winner(&self) -> Option<&RankedMethod> {
        self.ranking.first()
    }
}

/// Rank methods by APFD (highest first, ties keep input order) and find the
/// earliest and latest detecting method for every fault. A method that never
/// detected a fault does not take part in that fault's comparison.
pub fn compare(results: &[MethodResult]) -> Comparison {
    let mut sorted: Vec<&MethodResult> = results.iter().collect();
    sorted.sort_by(|a, b| b.metrics.apfd.total_cmp(&a.metrics.apfd));
    let ranking = sorted
        .into_iter()
        .enumerate()
        .map(|(i, r)| RankedMethod {
            rank: i + 1,
            method: r.method.clone(),
            apfd: r.metrics.apfd,
            detected_faults: r.metrics.detected_faults,
            avg_position: r.metrics.avg_position,
        })
        .collect();

    // fault -> (best, worst) as (position, method)
    let mut extremes: BTreeMap<&str, ((usize, &str), (usize, &str))> = BTreeMap::new();
    for r in results {
        for (fault, &position) in &r.metrics.first_positions {
            let entry = (position, r.method.as_str());
            extremes
                .entry(fault.as_str())
                .and_modify(|(best, worst)| {
                    if position < best.0 {
                        *best = entry;
                    }
                    if position > worst.0 {
                        *worst = entry;
                    }
                })
                .or_insert((entry, entry));
        }
    }

    let faults = extremes
        .into_iter()
        .map(|(fault, (best, worst))| FaultComparison {
            fault: fault.to_string(),
            best_method: best.1.to_string(),
            best_position: best.0,
            worst_method: worst.1.to_string(),
            worst_position: worst.0,
        })
        .collect();

    Comparison { ranking, faults }
}
