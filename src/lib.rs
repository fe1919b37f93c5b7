//! renaissance-uq: uncertainty quantification for historical invention models
//!
//! Monte Carlo and Sobol/Saltelli sensitivity analysis over the deterministic
//! physics simulations of reconstructed Renaissance machines. Configure the
//! uncertain parameters (with their historical provenance), hand over a
//! `simulate(params)` callable, and get ensemble statistics, ranked
//! sensitivity indices, and traceable report artifacts back.

pub mod config;
pub mod distributions;
pub mod report;
pub mod runner;
pub mod sampling;
pub mod sensitivity;
pub mod stats;
pub mod study;
pub mod yaml;

pub use config::{ConfigError, ParameterSpec, StudyConfig};
pub use distributions::{DistributionError, ParameterDistribution};
pub use runner::{
    CancelToken, OutcomeRecord, ParamView, RunOutcomes, SampleFailure, SimulationError,
    SimulationModel,
};
pub use sampling::{SampleSet, SamplingError, SobolSequence};
pub use sensitivity::{SensitivityError, SensitivityIndex};
pub use stats::{ConfidenceInterval, OutcomeSummary, StatsError};
pub use study::{SensitivityOutcome, StudyError, StudyReport, StudyRun, UqStudy};
