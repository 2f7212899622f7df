use serde::{Deserialize, Serialize};

/// One position in a prioritized order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTest {
    pub id: String,
    /// Score that earned this position: the marginal gain for greedy
    /// orders, the heuristic score for baselines, `None` for random.
    pub score: Option<f64>,
}

/// An execution order over a subset of a suite, each test at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedOrder {
    /// Name of the method that produced the order.
    pub method: String,
    pub entries: Vec<RankedTest>,
}

impl PrioritizedOrder {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, id: &str, score: Option<f64>) {
        self.entries.push(RankedTest {
            id: id.to_string(),
            score,
        });
    }

    /// Build an order directly from ids, e.g. a recorded execution order.
    pub fn from_ids<I, S>(method: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: method.into(),
            entries: ids
                .into_iter()
                .map(|id| RankedTest {
                    id: id.into(),
                    score: None,
                })
                .collect(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The plain list of ids, as consumed by a test-execution driver.
    pub fn to_id_list(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }
}
