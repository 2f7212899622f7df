//! Experiment orchestration: configuration, logging setup and the runner
//! that prioritizes a suite with several methods and compares their APFD.

pub mod config;
pub mod experiment;
pub mod logging;

pub use config::{ConfigError, ExperimentConfig, Method};
pub use experiment::{Experiment, ExperimentError, ExperimentPaths, ExperimentReport};
