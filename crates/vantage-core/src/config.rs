//! Experiment configuration.
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`VANTAGE_SEED`, `VANTAGE_BUDGET`)
//! 2. JSON config file
//! 3. Compiled defaults

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vantage_eval::apfd::UndetectedPolicy;
use vantage_eval::classify::{FaultClassifier, FaultRule};
use vantage_select::baseline::SemanticWeights;
use vantage_select::greedy::GreedyConfig;

pub const SEED_ENV: &str = "VANTAGE_SEED";
pub const BUDGET_ENV: &str = "VANTAGE_BUDGET";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("validation failed for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}

/// A prioritization method to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Method {
    Random,
    Coverage,
    Diversity,
    /// `alpha` falls back to the experiment-wide value.
    Combined {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alpha: Option<f64>,
    },
    FacilityLocation,
    Semantic,
    FailureHistory,
}

impl Method {
    /// Name used in reports and output files.
    pub fn label(&self) -> String {
        match self {
            Method::Random => "random".into(),
            Method::Coverage => "coverage".into(),
            Method::Diversity => "diversity".into(),
            Method::Combined { alpha: None } => "combined".into(),
            Method::Combined { alpha: Some(a) } => format!("combined_{a}"),
            Method::FacilityLocation => "facility_location".into(),
            Method::Semantic => "semantic".into(),
            Method::FailureHistory => "failure_history".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub methods: Vec<Method>,
    /// Tests to select per method; `None` orders the whole suite.
    pub budget: Option<usize>,
    pub seed: u64,
    /// Coverage weight of the combined objective.
    pub alpha: f64,
    pub undetected_policy: UndetectedPolicy,
    pub parallel_threshold: usize,
    pub function_weights: BTreeMap<String, f64>,
    pub classifier_rules: Vec<FaultRule>,
    /// Trailing `::` segments of transcript ids to keep, to line them up
    /// with suite ids.
    pub transcript_id_segments: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            methods: vec![
                Method::Random,
                Method::Coverage,
                Method::Diversity,
                Method::Combined { alpha: None },
                Method::Semantic,
            ],
            budget: None,
            seed: 42,
            alpha: 0.5,
            undetected_policy: UndetectedPolicy::default(),
            parallel_threshold: GreedyConfig::default().parallel_threshold,
            function_weights: BTreeMap::new(),
            classifier_rules: Vec::new(),
            transcript_id_segments: None,
            output_dir: None,
        }
    }
}

impl ExperimentConfig {
    /// Load from a JSON file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without touching the environment.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: "<string>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply `VANTAGE_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(SEED_ENV) {
            self.seed = value.trim().parse().map_err(|_| ConfigError::Env {
                var: SEED_ENV,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(BUDGET_ENV) {
            self.budget = Some(value.trim().parse().map_err(|_| ConfigError::Env {
                var: BUDGET_ENV,
                value: value.clone(),
            })?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.methods.is_empty() {
            return Err(ConfigError::ValidationFailed {
                field: "methods".to_string(),
                message: "at least one method is required".to_string(),
            });
        }
        let alphas = std::iter::once(self.alpha).chain(self.methods.iter().filter_map(|m| match m {
            Method::Combined { alpha } => *alpha,
            _ => None,
        }));
        for alpha in alphas {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(ConfigError::ValidationFailed {
                    field: "alpha".to_string(),
                    message: format!("{alpha} is not between 0.0 and 1.0"),
                });
            }
        }
        let mut labels = BTreeSet::new();
        let duplicate = self
            .methods
            .iter()
            .map(Method::label)
            .find(|label| !labels.insert(label.clone()));
        if let Some(duplicate) = duplicate {
            return Err(ConfigError::ValidationFailed {
                field: "methods".to_string(),
                message: format!("method '{duplicate}' is listed more than once"),
            });
        }
        if let Some((name, weight)) = self.function_weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ConfigError::ValidationFailed {
                field: format!("function_weights.{name}"),
                message: format!("{weight} is not finite"),
            });
        }
        if self.transcript_id_segments == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "transcript_id_segments".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn greedy_config(&self) -> GreedyConfig {
        GreedyConfig {
            parallel_threshold: self.parallel_threshold,
            ..GreedyConfig::default()
        }
    }

    /// Default weights, with `function_weights` entries added or replaced.
    pub fn semantic_weights(&self) -> SemanticWeights {
        let mut weights = SemanticWeights::default();
        weights.function_weights.extend(
            self.function_weights
                .iter()
                .map(|(name, weight)| (name.clone(), *weight)),
        );
        weights
    }

    pub fn classifier(&self) -> FaultClassifier {
        FaultClassifier::new(self.classifier_rules.clone())
    }
}
