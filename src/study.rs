//! Study orchestration - single-pass batch pipeline
//!
//! configuration → Saltelli design → batch runner → aggregator + sensitivity
//! calculator → report. No persistent or long-lived session state exists;
//! each run is a self-contained batch whose report always states how many
//! samples succeeded and how many failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, StudyConfig};
use crate::runner::{self, CancelToken, RunOutcomes, SimulationModel};
use crate::sampling::{self, SampleSet, SamplingError};
use crate::sensitivity::{self, SensitivityError, SensitivityIndex};
use crate::stats::{self, OutcomeSummary, StatsError};

/// Errors that abort a study run
#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Sensitivity portion of a study report
///
/// Degenerate output variance is a warning-level result rather than an
/// error: the statistics remain valid, the indices are just undefined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SensitivityOutcome {
    /// Indices computed and ranked descending by total-order contribution
    Ranked { indices: Vec<SensitivityIndex> },
    /// Output variance ≈ 0, indices undefined
    Degenerate { variance: f64 },
    /// Not computed (cancelled run, plain Monte Carlo sample, or too few
    /// surviving design rows)
    Unavailable { reason: String },
}

impl SensitivityOutcome {
    pub fn indices(&self) -> Option<&[SensitivityIndex]> {
        match self {
            SensitivityOutcome::Ranked { indices } => Some(indices),
            _ => None,
        }
    }
}

/// Final report of one study run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invention: Option<String>,
    pub seed: u64,
    pub base_samples: usize,
    /// Rows attempted (equals the design size unless cancelled)
    pub total_samples: usize,
    pub successes: usize,
    pub failures: usize,
    pub cancelled: bool,
    pub summary: OutcomeSummary,
    pub sensitivity: SensitivityOutcome,
    pub completed_at: DateTime<Utc>,
}

/// A completed run: the design, the raw outcomes, and the derived report
///
/// Design and outcomes are kept so the report module can emit the full
/// traceability CSV; nothing here is persisted by the library itself.
#[derive(Debug)]
pub struct StudyRun {
    pub samples: SampleSet,
    pub outcomes: RunOutcomes,
    pub report: StudyReport,
}

/// One uncertainty study over a single invention model
pub struct UqStudy {
    config: StudyConfig,
}

impl UqStudy {
    /// Create a study, validating the configuration fail-fast
    pub fn new(config: StudyConfig) -> Result<Self, StudyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Run the full Saltelli analysis: statistics plus sensitivity indices
    pub fn run<M: SimulationModel>(&self, model: &M) -> Result<StudyRun, StudyError> {
        self.run_with_cancel(model, &CancelToken::new())
    }

    /// Like [`UqStudy::run`], with a cooperative cancellation token checked
    /// between samples. A cancelled run still yields degraded-N statistics
    /// from the rows completed so far.
    pub fn run_with_cancel<M: SimulationModel>(
        &self,
        model: &M,
        token: &CancelToken,
    ) -> Result<StudyRun, StudyError> {
        let samples = sampling::saltelli_design(
            &self.config.parameters,
            self.config.base_samples,
            self.config.seed,
        )?;

        tracing::info!(
            invention = self.config.invention.as_deref().unwrap_or("-"),
            parameters = samples.dimension(),
            rows = samples.len(),
            seed = self.config.seed,
            "running uncertainty study"
        );

        let outcomes = runner::run_batch_with_cancel(&samples, model, token);

        let sensitivity = if outcomes.cancelled() {
            SensitivityOutcome::Unavailable {
                reason: "run cancelled before the design completed".to_string(),
            }
        } else {
            match sensitivity::sobol_indices(&samples, &outcomes) {
                Ok(indices) => SensitivityOutcome::Ranked { indices },
                Err(SensitivityError::DegenerateOutputVariance { variance }) => {
                    tracing::warn!(variance, "output variance degenerate, indices undefined");
                    SensitivityOutcome::Degenerate { variance }
                }
                Err(err) => SensitivityOutcome::Unavailable {
                    reason: err.to_string(),
                },
            }
        };

        self.finish(samples, outcomes, sensitivity)
    }

    /// Run a plain Monte Carlo ensemble: statistics only, no variance
    /// decomposition. Uses N independent draws instead of the N·(k+2)
    /// Saltelli design.
    pub fn run_monte_carlo<M: SimulationModel>(&self, model: &M) -> Result<StudyRun, StudyError> {
        let samples = sampling::monte_carlo(
            &self.config.parameters,
            self.config.base_samples,
            self.config.seed,
        );
        let outcomes = runner::run_batch(&samples, model);
        let sensitivity = SensitivityOutcome::Unavailable {
            reason: "plain Monte Carlo sample carries no Saltelli structure".to_string(),
        };
        self.finish(samples, outcomes, sensitivity)
    }

    fn finish(
        &self,
        samples: SampleSet,
        outcomes: RunOutcomes,
        sensitivity: SensitivityOutcome,
    ) -> Result<StudyRun, StudyError> {
        let successes = outcomes.successes();
        let summary = stats::summarize(&successes, self.config.confidence)?;

        let report = StudyReport {
            invention: self.config.invention.clone(),
            seed: self.config.seed,
            base_samples: self.config.base_samples,
            total_samples: outcomes.len(),
            successes: outcomes.success_count(),
            failures: outcomes.failure_count(),
            cancelled: outcomes.cancelled(),
            summary,
            sensitivity,
            completed_at: Utc::now(),
        };

        tracing::info!(
            successes = report.successes,
            failures = report.failures,
            cancelled = report.cancelled,
            "study complete"
        );

        Ok(StudyRun {
            samples,
            outcomes,
            report,
        })
    }
}
