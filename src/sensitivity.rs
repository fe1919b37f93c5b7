//! Variance-based sensitivity indices over a Saltelli-structured outcome set
//!
//! First-order indices use the Saltelli (2010) estimator, total-order indices
//! the Jansen estimator. Negative estimates are a known finite-sample
//! artifact and are clipped to zero (logged, never silent), so all reported
//! indices lie in [0, 1].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::RunOutcomes;
use crate::sampling::SampleSet;

/// Relative floor below which output variance counts as zero
const VARIANCE_FLOOR: f64 = 1e-12;

/// Errors raised by the index calculator
#[derive(Debug, Error)]
pub enum SensitivityError {
    #[error(
        "total output variance ≈ 0 ({variance:.3e}); sensitivity indices are undefined"
    )]
    DegenerateOutputVariance { variance: f64 },

    #[error("only {available} fully paired design row(s) succeeded, need at least {required}")]
    InsufficientPairedSamples { available: usize, required: usize },

    #[error("outcomes do not come from a Saltelli design")]
    NotSaltelliDesign,
}

/// First- and total-order Sobol indices for one parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityIndex {
    pub parameter: String,
    /// S_i: share of output variance attributable to this parameter alone
    pub first_order: f64,
    /// S_Ti: share including all interactions involving this parameter
    pub total_order: f64,
    /// 1-based contribution rank by total-order index
    pub rank: usize,
}

/// Compute Sobol indices from a Saltelli design and its outcomes
///
/// A design row j contributes to the estimators only if its A, B, and every
/// AB_i member all succeeded; rows with any failed member are excluded
/// pairwise so the estimator terms stay aligned. The result is sorted
/// descending by total-order index, ready for tornado-chart rendering.
pub fn sobol_indices(
    design: &SampleSet,
    outcomes: &RunOutcomes,
) -> Result<Vec<SensitivityIndex>, SensitivityError> {
    if !design.is_saltelli() {
        return Err(SensitivityError::NotSaltelliDesign);
    }

    let k = design.dimension();
    let n = design.base_samples();
    if k == 0 {
        return Ok(Vec::new());
    }

    let records = outcomes.records();
    let value_at = |row: usize| -> Option<f64> { records.get(row).and_then(|r| r.value()) };

    // Keep only rows where the whole (A, B, AB_1..AB_k) tuple succeeded.
    let mut f_a: Vec<f64> = Vec::with_capacity(n);
    let mut f_b: Vec<f64> = Vec::with_capacity(n);
    let mut f_ab: Vec<Vec<f64>> = vec![Vec::with_capacity(n); k];
    'rows: for j in 0..n {
        let Some(a) = value_at(design.block_a_row(j)) else {
            continue;
        };
        let Some(b) = value_at(design.block_b_row(j)) else {
            continue;
        };
        let mut ab = Vec::with_capacity(k);
        for i in 0..k {
            match value_at(design.block_ab_row(i, j)) {
                Some(v) => ab.push(v),
                None => continue 'rows,
            }
        }
        f_a.push(a);
        f_b.push(b);
        for (i, v) in ab.into_iter().enumerate() {
            f_ab[i].push(v);
        }
    }

    let n_eff = f_a.len();
    if n_eff < 2 {
        return Err(SensitivityError::InsufficientPairedSamples {
            available: n_eff,
            required: 2,
        });
    }
    if n_eff < n {
        tracing::info!(
            excluded = n - n_eff,
            retained = n_eff,
            "design rows with failed members excluded from sensitivity estimation"
        );
    }

    // Total variance over the pooled A and B outcomes
    let pooled = n_eff as f64 * 2.0;
    let mean = (f_a.iter().sum::<f64>() + f_b.iter().sum::<f64>()) / pooled;
    let variance = (f_a.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        + f_b.iter().map(|v| (v - mean).powi(2)).sum::<f64>())
        / pooled;

    if variance <= VARIANCE_FLOOR * (1.0 + mean * mean) {
        return Err(SensitivityError::DegenerateOutputVariance { variance });
    }

    let nf = n_eff as f64;
    let mut indices: Vec<SensitivityIndex> = Vec::with_capacity(k);
    for (i, name) in design.names().iter().enumerate() {
        // Saltelli 2010: V_i ≈ (1/N) Σ f_B (f_AB_i − f_A)
        let v_i = (0..n_eff)
            .map(|j| f_b[j] * (f_ab[i][j] - f_a[j]))
            .sum::<f64>()
            / nf;
        // Jansen: E_i ≈ (1/2N) Σ (f_A − f_AB_i)²
        let e_i = (0..n_eff)
            .map(|j| (f_a[j] - f_ab[i][j]).powi(2))
            .sum::<f64>()
            / (2.0 * nf);

        let first_order = clip_index(name, "S", v_i / variance);
        let total_order = clip_index(name, "ST", e_i / variance);

        indices.push(SensitivityIndex {
            parameter: name.clone(),
            first_order,
            total_order,
            rank: 0,
        });
    }

    // Rank descending by total-order contribution
    indices.sort_by(|a, b| b.total_order.partial_cmp(&a.total_order).unwrap());
    for (rank, idx) in indices.iter_mut().enumerate() {
        idx.rank = rank + 1;
    }

    Ok(indices)
}

/// Clip a raw estimate into [0, 1], logging when clipping changes it
fn clip_index(parameter: &str, kind: &str, raw: f64) -> f64 {
    let clipped = raw.clamp(0.0, 1.0);
    if clipped != raw {
        tracing::warn!(
            parameter,
            kind,
            raw,
            clipped,
            "Sobol estimate outside [0, 1] clipped"
        );
    }
    clipped
}
