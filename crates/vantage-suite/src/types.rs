use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Errors raised while assembling suites and fault models.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("duplicate test id '{0}'")]
    DuplicateTestId(String),

    #[error("fault '{fault}' references unknown test '{test}'")]
    UnknownTest { fault: String, test: String },
}

/// Static features of a test's source, used by the semantic-score baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticFeatures {
    /// Number of `assert` statements in the test body.
    pub assertion_count: u32,
    /// Whether the test expects an exception to be raised.
    pub raises_exception: bool,
    /// Library function the test name points at, if any.
    pub target_function: Option<String>,
    /// Distinct method names invoked on a receiver (`obj.method(`).
    pub unique_calls: BTreeSet<String>,
}

/// A single test case and the coverage data it exercises.
///
/// `coverage` is the symbolic representation (functions, variables, regions);
/// `embedding` is the dense one. Objectives pick whichever they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub coverage: BTreeSet<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub features: SemanticFeatures,
}

impl TestCase {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            coverage: BTreeSet::new(),
            embedding: None,
            features: SemanticFeatures::default(),
        }
    }

    /// Builder-style helper for symbolic coverage.
    pub fn with_coverage<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.coverage = elements.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_features(mut self, features: SemanticFeatures) -> Self {
        self.features = features;
        self
    }

    /// Method name: the last `::`-separated segment of the id.
    pub fn method_name(&self) -> &str {
        self.id.rsplit("::").next().unwrap_or(&self.id)
    }
}

/// An ordered, id-unique collection of test cases.
///
/// Insertion order is the enumeration order every consumer sees, which
/// makes greedy tie-breaking reproducible.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSuite {
    tests: Vec<TestCase>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TestSuite {
    pub fn new(tests: Vec<TestCase>) -> Result<Self, SuiteError> {
        let mut index = HashMap::with_capacity(tests.len());
        for (i, test) in tests.iter().enumerate() {
            if index.insert(test.id.clone(), i).is_some() {
                return Err(SuiteError::DuplicateTestId(test.id.clone()));
            }
        }
        Ok(Self { tests, index })
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn get(&self, id: &str) -> Option<&TestCase> {
        self.index.get(id).map(|&i| &self.tests[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Position of a test in enumeration order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Union of every test's symbolic coverage.
    pub fn universe(&self) -> BTreeSet<String> {
        self.tests
            .iter()
            .flat_map(|t| t.coverage.iter().cloned())
            .collect()
    }
}

impl<'de> Deserialize<'de> for TestSuite {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            tests: Vec<TestCase>,
        }
        let raw = Raw::deserialize(deserializer)?;
        TestSuite::new(raw.tests).map_err(serde::de::Error::custom)
    }
}

/// Which tests are capable of detecting which fault.
///
/// Backed by a sorted map so that every computation over the model is
/// independent of how the mapping was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultModel {
    faults: BTreeMap<String, BTreeSet<String>>,
}

impl FaultModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fault with its detecting tests. Re-registering a fault
    /// extends its detector set.
    pub fn insert<I, S>(&mut self, fault: impl Into<String>, detectors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.faults
            .entry(fault.into())
            .or_default()
            .extend(detectors.into_iter().map(Into::into));
    }

    /// Add a single detector to a fault, creating the fault if needed.
    pub fn add_detector(&mut self, fault: &str, test: &str) {
        self.faults
            .entry(fault.to_string())
            .or_default()
            .insert(test.to_string());
    }

    pub fn detectors(&self, fault: &str) -> Option<&BTreeSet<String>> {
        self.faults.get(fault)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.faults.iter()
    }

    pub fn fault_ids(&self) -> impl Iterator<Item = &String> {
        self.faults.keys()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Every detector must be a member of `suite`.
    pub fn validate_against(&self, suite: &TestSuite) -> Result<(), SuiteError> {
        for (fault, detectors) in &self.faults {
            if let Some(test) = detectors.iter().find(|t| !suite.contains(t)) {
                return Err(SuiteError::UnknownTest {
                    fault: fault.clone(),
                    test: test.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<F, I, S> FromIterator<(F, I)> for FaultModel
where
    F: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (F, I)>>(iter: T) -> Self {
        let mut model = FaultModel::new();
        for (fault, detectors) in iter {
            model.insert(fault, detectors);
        }
        model
    }
}
