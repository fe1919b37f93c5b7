//! Ensemble statistics - mean, spread, and percentile confidence intervals
//!
//! Operates on the successful outcomes only; failed rows are excluded
//! upstream and reported as a count alongside these statistics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while aggregating outcomes
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("insufficient samples: {available} successful outcome(s), need at least {required}")]
    InsufficientSamples { available: usize, required: usize },

    #[error("confidence level must be in (0, 1), got {level}")]
    InvalidConfidenceLevel { level: f64 },
}

/// Percentile-based interval over an output metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Confidence level in (0, 1), e.g. 0.95
    pub level: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Summary statistics over the successful outcome ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Number of successful outcomes the statistics are based on
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub confidence_interval: ConfidenceInterval,
}

/// Percentile by linear interpolation between closest order statistics
/// (Hyndman-Fan type 7). Robust at small N.
///
/// `sorted` must be ascending and non-empty; `p` in [0, 1].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let p = p.clamp(0.0, 1.0);
    let h = p * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = h - lo as f64;
        sorted[lo] + frac * (sorted[hi] - sorted[lo])
    }
}

/// Compute summary statistics over the successful outcomes
///
/// `confidence` is the two-sided interval level; 0.95 yields the 2.5/97.5
/// percentile band. Fails with `InsufficientSamples` when fewer than 2
/// outcomes remain.
pub fn summarize(values: &[f64], confidence: f64) -> Result<OutcomeSummary, StatsError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(StatsError::InvalidConfidenceLevel { level: confidence });
    }
    if values.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            available: values.len(),
            required: 2,
        });
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let alpha = (1.0 - confidence) / 2.0;
    let confidence_interval = ConfidenceInterval {
        lower: percentile(&sorted, alpha),
        upper: percentile(&sorted, 1.0 - alpha),
        level: confidence,
    };

    Ok(OutcomeSummary {
        count: values.len(),
        mean,
        std_dev,
        min: sorted[0],
        max: *sorted.last().unwrap(),
        confidence_interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 1.0), 5.0);
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        // h = 0.25 * 4 = 1.0 → exactly the second order statistic
        assert_eq!(percentile(&sorted, 0.25), 2.0);
        // h = 0.1 * 4 = 0.4 → interpolate between 1 and 2
        assert!((percentile(&sorted, 0.1) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_small_n() {
        let sorted = [10.0, 20.0];
        assert!((percentile(&sorted, 0.5) - 15.0).abs() < 1e-12);
        assert_eq!(percentile(&[7.0], 0.5), 7.0);
    }

    #[test]
    fn test_summarize_basic() {
        let values: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let summary = summarize(&values, 0.95).unwrap();

        assert_eq!(summary.count, 100);
        assert!((summary.mean - 50.5).abs() < 1e-9);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
        assert!(summary.confidence_interval.lower < summary.mean);
        assert!(summary.confidence_interval.upper > summary.mean);
    }

    #[test]
    fn test_insufficient_samples() {
        assert!(matches!(
            summarize(&[], 0.95),
            Err(StatsError::InsufficientSamples { available: 0, .. })
        ));
        assert!(matches!(
            summarize(&[42.0], 0.95),
            Err(StatsError::InsufficientSamples { available: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_confidence_level() {
        let values = [1.0, 2.0, 3.0];
        assert!(summarize(&values, 0.0).is_err());
        assert!(summarize(&values, 1.0).is_err());
        assert!(summarize(&values, 1.5).is_err());
    }

    #[test]
    fn test_wider_confidence_never_narrows_interval() {
        let values: Vec<f64> = (0..500).map(|i| (i as f64 * 0.37).sin() * 10.0).collect();
        let ci90 = summarize(&values, 0.90).unwrap().confidence_interval;
        let ci95 = summarize(&values, 0.95).unwrap().confidence_interval;
        let ci99 = summarize(&values, 0.99).unwrap().confidence_interval;

        assert!(ci95.width() >= ci90.width());
        assert!(ci99.width() >= ci95.width());
        assert!(ci99.lower <= ci95.lower && ci95.upper <= ci99.upper);
    }

    #[test]
    fn test_constant_ensemble_has_zero_variance() {
        let values = vec![42.0; 50];
        let summary = summarize(&values, 0.95).unwrap();
        assert!(summary.std_dev.abs() < 1e-12);
        assert_eq!(summary.confidence_interval.lower, 42.0);
        assert_eq!(summary.confidence_interval.upper, 42.0);
    }
}
