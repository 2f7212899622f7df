//! Run every configured method over one suite and compare the results.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vantage_eval::apfd::{ApfdEvaluator, EvalError};
use vantage_eval::classify::derive_faults;
use vantage_eval::compare::{compare, Comparison, MethodResult};
use vantage_eval::transcript::TranscriptParser;
use vantage_select::baseline::{
    failure_history_order, random_order, semantic_order, FailureHistory,
};
use vantage_select::greedy::{GreedyPrioritizer, SelectError};
use vantage_select::objective::{
    CombinedObjective, CoverageObjective, DiversityObjective, FacilityLocationObjective,
    ObjectiveError,
};
use vantage_select::order::PrioritizedOrder;
use vantage_suite::parse::{parse_fault_model, parse_references, parse_suite, ParseError};
use vantage_suite::types::{FaultModel, TestSuite};

use crate::config::{ConfigError, ExperimentConfig, Method};

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no fault model: supply a fault file or a transcript")]
    MissingFaults,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Objective(#[from] ObjectiveError),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Input files of an experiment. Either `faults` or `transcript` is needed.
#[derive(Debug, Clone, Default)]
pub struct ExperimentPaths {
    pub suite: PathBuf,
    pub faults: Option<PathBuf>,
    pub transcript: Option<PathBuf>,
    pub references: Option<PathBuf>,
    pub history: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub results: Vec<MethodResult>,
    pub orders: Vec<PrioritizedOrder>,
    pub comparison: Comparison,
}

pub struct Experiment {
    config: ExperimentConfig,
    suite: TestSuite,
    faults: FaultModel,
    references: Vec<Vec<f32>>,
    history: FailureHistory,
}

fn read(path: &Path) -> Result<String, ExperimentError> {
    std::fs::read_to_string(path).map_err(|source| ExperimentError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_err(path: &Path) -> impl FnOnce(ParseError) -> ExperimentError + '_ {
    move |source| ExperimentError::Parse {
        path: path.display().to_string(),
        source,
    }
}

/// Read a failure history. A missing or malformed file is not fatal: the
/// history is simply empty.
pub fn load_history(path: &Path) -> FailureHistory {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failure history unavailable, using none");
            return FailureHistory::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(history) => history,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid failure history, using none");
            FailureHistory::new()
        }
    }
}

/// Persist an order as a JSON array of test ids.
pub fn save_order(order: &PrioritizedOrder, path: &Path) -> Result<(), ExperimentError> {
    let json = serde_json::to_string_pretty(&order.to_id_list())?;
    std::fs::write(path, json).map_err(|source| ExperimentError::Io {
        path: path.display().to_string(),
        source,
    })
}

impl Experiment {
    pub fn new(config: ExperimentConfig, suite: TestSuite, faults: FaultModel) -> Self {
        Self {
            config,
            suite,
            faults,
            references: Vec::new(),
            history: FailureHistory::new(),
        }
    }

    pub fn with_references(mut self, references: Vec<Vec<f32>>) -> Self {
        self.references = references;
        self
    }

    pub fn with_history(mut self, history: FailureHistory) -> Self {
        self.history = history;
        self
    }

    /// Assemble an experiment from files. With a transcript, faults are
    /// derived from its failures using the configured classifier rules.
    pub fn from_paths(config: ExperimentConfig, paths: &ExperimentPaths) -> Result<Self, ExperimentError> {
        config.validate()?;
        let suite = parse_suite(&read(&paths.suite)?).map_err(parse_err(&paths.suite))?;

        let faults = match (&paths.faults, &paths.transcript) {
            (Some(path), _) => parse_fault_model(&read(path)?).map_err(parse_err(path))?,
            (None, Some(path)) => {
                let mut parser = TranscriptParser::new();
                if let Some(n) = config.transcript_id_segments {
                    parser = parser.keep_segments(n);
                }
                let records = parser.parse(&read(path)?);
                derive_faults(&records, &config.classifier()).model
            }
            (None, None) => return Err(ExperimentError::MissingFaults),
        };

        let references = match &paths.references {
            Some(path) => parse_references(&read(path)?)
                .map_err(parse_err(path))?
                .into_iter()
                .map(|(_, embedding)| embedding)
                .collect(),
            None => Vec::new(),
        };
        let history = paths
            .history
            .as_deref()
            .map(load_history)
            .unwrap_or_default();

        info!(
            tests = suite.len(),
            faults = faults.len(),
            references = references.len(),
            "experiment inputs loaded"
        );
        Ok(Self::new(config, suite, faults)
            .with_references(references)
            .with_history(history))
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    pub fn faults(&self) -> &FaultModel {
        &self.faults
    }

    fn budget(&self) -> usize {
        self.config.budget.unwrap_or(self.suite.len())
    }

    /// Produce the order for one method, labelled and cut to the budget.
    pub fn prioritize(&self, method: &Method) -> Result<PrioritizedOrder, ExperimentError> {
        let k = self.budget();
        let greedy = GreedyPrioritizer::new(self.config.greedy_config());

        let mut order = match method {
            Method::Random => random_order(&self.suite, self.config.seed),
            Method::Coverage => {
                greedy.prioritize(&self.suite, &CoverageObjective::from_suite(&self.suite), k)?
            }
            Method::Diversity => greedy.prioritize(&self.suite, &DiversityObjective::new(), k)?,
            Method::Combined { alpha } => {
                let objective =
                    CombinedObjective::from_suite(&self.suite, alpha.unwrap_or(self.config.alpha))?;
                greedy.prioritize(&self.suite, &objective, k)?
            }
            Method::FacilityLocation => {
                if self.references.is_empty() {
                    warn!("facility location without reference embeddings, all gains are 0");
                }
                let objective = FacilityLocationObjective::new(self.references.clone());
                greedy.prioritize(&self.suite, &objective, k)?
            }
            Method::Semantic => semantic_order(&self.suite, &self.config.semantic_weights()),
            Method::FailureHistory => failure_history_order(&self.suite, &self.history),
        };

        order.entries.truncate(k);
        order.method = method.label();
        Ok(order)
    }

    pub fn run(&self) -> Result<ExperimentReport, ExperimentError> {
        // Also guards configs built in code, which skip `load`.
        self.config.validate()?;
        let started = Instant::now();
        let evaluator = ApfdEvaluator::new(self.config.undetected_policy);
        let mut results = Vec::with_capacity(self.config.methods.len());
        let mut orders = Vec::with_capacity(self.config.methods.len());

        for method in &self.config.methods {
            let order = self.prioritize(method)?;
            let metrics = evaluator.evaluate_against(&self.suite, &order, &self.faults)?;
            info!(
                method = %order.method,
                apfd = metrics.apfd,
                detected = metrics.detected_faults,
                "method evaluated"
            );
            results.push(MethodResult::new(order.method.clone(), metrics));
            orders.push(order);
        }

        let comparison = compare(&results);
        if let Some(best) = comparison.winner() {
            info!(
                method = %best.method,
                apfd = best.apfd,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "experiment complete"
            );
        }

        let report = ExperimentReport {
            results,
            orders,
            comparison,
        };
        if let Some(dir) = &self.config.output_dir {
            write_report(&report, dir)?;
        }
        Ok(report)
    }
}

/// Write `<method>_order.json` per method and `comparison.json`.
pub fn write_report(report: &ExperimentReport, dir: &Path) -> Result<(), ExperimentError> {
    std::fs::create_dir_all(dir).map_err(|source| ExperimentError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    for order in &report.orders {
        save_order(order, &dir.join(format!("{}_order.json", order.method)))?;
    }
    let path = dir.join("comparison.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json).map_err(|source| ExperimentError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(dir = %dir.display(), orders = report.orders.len(), "report written");
    Ok(())
}
