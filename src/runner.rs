//! Batch simulation runner - drives an invention model over a sample set
//!
//! The runner is the sole integration point with each invention's physics:
//! anything that can map a parameter vector to a scalar outcome can be
//! analyzed. A raising or non-finite invocation is recorded as a failure for
//! that row and the batch continues, since some historical parameter
//! combinations are physically invalid and must not halt a whole study.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sampling::SampleSet;

/// Error returned by a simulation model for an invalid parameter combination
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SimulationError {
    message: String,
}

impl SimulationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One parameter vector, viewed as a name → value mapping
///
/// Columns are in sample-set order; lookups scan linearly, which is fine at
/// the handful of parameters an invention model takes.
#[derive(Debug, Clone, Copy)]
pub struct ParamView<'a> {
    names: &'a [String],
    values: &'a [f64],
}

impl<'a> ParamView<'a> {
    pub fn new(names: &'a [String], values: &'a [f64]) -> Self {
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        self.names
    }

    pub fn values(&self) -> &[f64] {
        self.values
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Look up a parameter by name, failing the sample if absent
    pub fn require(&self, name: &str) -> Result<f64, SimulationError> {
        self.get(name)
            .ok_or_else(|| SimulationError::new(format!("missing parameter '{name}'")))
    }
}

/// A deterministic invention model: parameter mapping in, scalar outcome out
///
/// Implementations must be pure given their inputs; the runner may otherwise
/// be parallelized across rows without affecting correctness.
pub trait SimulationModel {
    fn simulate(&self, params: &ParamView<'_>) -> Result<f64, SimulationError>;
}

impl<F> SimulationModel for F
where
    F: Fn(&ParamView<'_>) -> Result<f64, SimulationError>,
{
    fn simulate(&self, params: &ParamView<'_>) -> Result<f64, SimulationError> {
        self(params)
    }
}

/// Record of one failed sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleFailure {
    /// Row index in the originating sample set
    pub index: usize,
    /// Model-supplied reason, verbatim
    pub reason: String,
}

/// Outcome of one simulate invocation, paired by index with its row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeRecord {
    Success(f64),
    Failure(SampleFailure),
}

impl OutcomeRecord {
    pub fn value(&self) -> Option<f64> {
        match self {
            OutcomeRecord::Success(v) => Some(*v),
            OutcomeRecord::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeRecord::Failure(_))
    }
}

/// Cooperative cancellation handle, checked between samples
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Collected outcomes of one batch run
///
/// Holds exactly one record per attempted row; a cancelled run is truncated
/// but its records remain usable for degraded-N statistics.
#[derive(Debug, Clone)]
pub struct RunOutcomes {
    records: Vec<OutcomeRecord>,
    cancelled: bool,
}

impl RunOutcomes {
    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    /// Number of attempted rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn success_count(&self) -> usize {
        self.records.len() - self.failure_count()
    }

    pub fn failure_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_failure()).count()
    }

    /// Successful outcome values, in row order
    pub fn successes(&self) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.value()).collect()
    }

    /// Failure records, in row order
    pub fn failures(&self) -> Vec<&SampleFailure> {
        self.records
            .iter()
            .filter_map(|r| match r {
                OutcomeRecord::Failure(f) => Some(f),
                OutcomeRecord::Success(_) => None,
            })
            .collect()
    }
}

/// Invoke `model` once per sample-set row, in order
pub fn run_batch<M: SimulationModel>(samples: &SampleSet, model: &M) -> RunOutcomes {
    run_batch_with_cancel(samples, model, &CancelToken::new())
}

/// Like [`run_batch`], stopping at the next row boundary once `token` is
/// cancelled
pub fn run_batch_with_cancel<M: SimulationModel>(
    samples: &SampleSet,
    model: &M,
    token: &CancelToken,
) -> RunOutcomes {
    let mut records = Vec::with_capacity(samples.len());
    let mut cancelled = false;

    for (index, row) in samples.rows().iter().enumerate() {
        if token.is_cancelled() {
            cancelled = true;
            break;
        }

        let params = ParamView::new(samples.names(), row);
        let record = match model.simulate(&params) {
            Ok(value) if value.is_finite() => OutcomeRecord::Success(value),
            Ok(value) => {
                tracing::warn!(index, value, "model returned non-finite outcome");
                OutcomeRecord::Failure(SampleFailure {
                    index,
                    reason: format!("non-finite outcome {value}"),
                })
            }
            Err(err) => {
                tracing::debug!(index, error = %err, "sample failed");
                OutcomeRecord::Failure(SampleFailure {
                    index,
                    reason: err.to_string(),
                })
            }
        };
        records.push(record);
    }

    RunOutcomes { records, cancelled }
}
