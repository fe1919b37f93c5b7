//! Parameter distributions - probability models for uncertain historical inputs
//!
//! Each uncertain parameter of an invention model (material density, member
//! thickness, spring preload, ...) is described by one of three distribution
//! families. Distributions are immutable once constructed and are created from
//! provenance records in the study configuration.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower bound applied to quantile arguments so that tail evaluation stays
/// finite. Corresponds to roughly ±7σ for the normal family.
pub const QUANTILE_CLAMP: f64 = 1e-12;

/// Inverse of the standard normal CDF (probit function)
/// Uses Acklam's rational approximation (relative error < 1.15e-9)
fn normal_quantile(p: f64) -> f64 {
    debug_assert!(p > 0.0 && p < 1.0);

    // Acklam approximation constants
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if p < P_LOW {
        // Lower tail
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= P_HIGH {
        // Central region
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        // Upper tail, by symmetry
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -((((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0))
    }
}

/// Errors raised while validating distribution shape parameters
#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("invalid distribution parameters: {reason}")]
    InvalidDistributionParameters { reason: String },
}

/// Probability distribution for a single uncertain parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParameterDistribution {
    /// Normal (Gaussian) distribution
    Normal { mean: f64, std_dev: f64 },
    /// Triangular distribution over [min, max] with peak at mode
    Triangular { min: f64, mode: f64, max: f64 },
    /// Bounded uniform distribution over [min, max]
    Uniform { min: f64, max: f64 },
}

impl ParameterDistribution {
    /// Check shape parameters for consistency
    ///
    /// Fails fast with `InvalidDistributionParameters` so that a malformed
    /// configuration never reaches the sampling stage.
    pub fn validate(&self) -> Result<(), DistributionError> {
        let fail = |reason: String| {
            Err(DistributionError::InvalidDistributionParameters { reason })
        };

        match *self {
            ParameterDistribution::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() {
                    return fail(format!(
                        "normal parameters must be finite (mean={mean}, std_dev={std_dev})"
                    ));
                }
                if std_dev <= 0.0 {
                    return fail(format!("normal std_dev must be > 0 (got {std_dev})"));
                }
            }
            ParameterDistribution::Triangular { min, mode, max } => {
                if !min.is_finite() || !mode.is_finite() || !max.is_finite() {
                    return fail(format!(
                        "triangular parameters must be finite (min={min}, mode={mode}, max={max})"
                    ));
                }
                if min >= max {
                    return fail(format!("triangular requires min < max (got [{min}, {max}])"));
                }
                if mode < min || mode > max {
                    return fail(format!(
                        "triangular mode {mode} outside [{min}, {max}]"
                    ));
                }
            }
            ParameterDistribution::Uniform { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return fail(format!(
                        "uniform parameters must be finite (min={min}, max={max})"
                    ));
                }
                if min >= max {
                    return fail(format!("uniform requires min < max (got [{min}, {max}])"));
                }
            }
        }

        Ok(())
    }

    /// Distribution mean
    pub fn mean(&self) -> f64 {
        match *self {
            ParameterDistribution::Normal { mean, .. } => mean,
            ParameterDistribution::Triangular { min, mode, max } => (min + mode + max) / 3.0,
            ParameterDistribution::Uniform { min, max } => (min + max) / 2.0,
        }
    }

    /// Distribution standard deviation
    pub fn std_dev(&self) -> f64 {
        match *self {
            ParameterDistribution::Normal { std_dev, .. } => std_dev,
            ParameterDistribution::Triangular { min, mode, max } => {
                let var = (min * min + mode * mode + max * max
                    - min * mode
                    - min * max
                    - mode * max)
                    / 18.0;
                var.sqrt()
            }
            ParameterDistribution::Uniform { min, max } => (max - min) / 12.0_f64.sqrt(),
        }
    }

    /// Coefficient of variation (std_dev / |mean|), infinite for zero mean
    pub fn coefficient_of_variation(&self) -> f64 {
        let mean = self.mean();
        if mean == 0.0 {
            f64::INFINITY
        } else {
            self.std_dev() / mean.abs()
        }
    }

    /// Inverse CDF: map a uniform point in (0, 1) onto the parameter scale
    ///
    /// Used to push quasi-random design points through the distribution. The
    /// argument is clamped away from {0, 1} so the normal tails stay finite.
    pub fn quantile(&self, p: f64) -> f64 {
        let p = p.clamp(QUANTILE_CLAMP, 1.0 - QUANTILE_CLAMP);

        match *self {
            ParameterDistribution::Normal { mean, std_dev } => {
                mean + std_dev * normal_quantile(p)
            }
            ParameterDistribution::Triangular { min, mode, max } => {
                // Inverse transform for the triangular CDF
                let fc = (mode - min) / (max - min);
                if p < fc {
                    min + (p * (max - min) * (mode - min)).sqrt()
                } else {
                    max - ((1.0 - p) * (max - min) * (max - mode)).sqrt()
                }
            }
            ParameterDistribution::Uniform { min, max } => min + p * (max - min),
        }
    }

    /// Draw one pseudo-random value
    ///
    /// Normal draws use the Box-Muller transform; triangular and uniform use
    /// inverse-transform sampling. Same seed, same distribution, same draw
    /// order reproduce identical output.
    pub fn sample(&self, rng: &mut StdRng) -> f64 {
        match *self {
            ParameterDistribution::Normal { mean, std_dev } => {
                let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
                let u2: f64 = rng.random();
                let z =
                    (-2.0_f64 * u1.ln()).sqrt() * (2.0_f64 * std::f64::consts::PI * u2).cos();
                mean + std_dev * z
            }
            _ => {
                let u: f64 = rng.random();
                self.quantile(u)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_normal_quantile_known_values() {
        // Φ⁻¹(0.5) = 0
        assert!(normal_quantile(0.5).abs() < 1e-9);
        // Φ⁻¹(0.975) ≈ 1.95996
        assert!((normal_quantile(0.975) - 1.95996).abs() < 1e-3);
        // Φ⁻¹(0.8413) ≈ 1.0
        assert!((normal_quantile(0.8413) - 1.0).abs() < 1e-2);
        // Symmetry
        assert!((normal_quantile(0.025) + normal_quantile(0.975)).abs() < 1e-9);
        // Tails stay finite
        assert!(normal_quantile(1e-10).is_finite());
        assert!(normal_quantile(1.0 - 1e-10).is_finite());
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let bad_normal = ParameterDistribution::Normal {
            mean: 1.0,
            std_dev: 0.0,
        };
        assert!(bad_normal.validate().is_err());

        // Triangular mode outside [min, max]
        let bad_tri = ParameterDistribution::Triangular {
            min: 0.0,
            mode: 2.0,
            max: 1.0,
        };
        assert!(matches!(
            bad_tri.validate(),
            Err(DistributionError::InvalidDistributionParameters { .. })
        ));

        let bad_uniform = ParameterDistribution::Uniform { min: 1.0, max: 1.0 };
        assert!(bad_uniform.validate().is_err());

        let nan_normal = ParameterDistribution::Normal {
            mean: f64::NAN,
            std_dev: 1.0,
        };
        assert!(nan_normal.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_good_parameters() {
        assert!(ParameterDistribution::Normal {
            mean: 650.0,
            std_dev: 30.0
        }
        .validate()
        .is_ok());
        assert!(ParameterDistribution::Triangular {
            min: 0.01,
            mode: 0.02,
            max: 0.03
        }
        .validate()
        .is_ok());
        assert!(ParameterDistribution::Uniform { min: 0.0, max: 1.0 }
            .validate()
            .is_ok());
    }

    #[test]
    fn test_quantile_endpoints_and_center() {
        let uniform = ParameterDistribution::Uniform { min: 2.0, max: 4.0 };
        assert!((uniform.quantile(0.5) - 3.0).abs() < 1e-9);

        let tri = ParameterDistribution::Triangular {
            min: 0.0,
            mode: 1.0,
            max: 2.0,
        };
        // At p = F(mode) the quantile recovers the mode
        let fc = 0.5;
        assert!((tri.quantile(fc) - 1.0).abs() < 1e-9);
        // Quantile is monotone
        assert!(tri.quantile(0.2) < tri.quantile(0.8));

        let normal = ParameterDistribution::Normal {
            mean: 10.0,
            std_dev: 2.0,
        };
        assert!((normal.quantile(0.5) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_moments() {
        let tri = ParameterDistribution::Triangular {
            min: 0.01,
            mode: 0.02,
            max: 0.03,
        };
        assert!((tri.mean() - 0.02).abs() < 1e-12);
        // Var = (a² + b² + c² - ab - ac - bc) / 18
        assert!((tri.std_dev() - 0.0040825).abs() < 1e-5);

        let normal = ParameterDistribution::Normal {
            mean: 650.0,
            std_dev: 30.0,
        };
        assert!((normal.coefficient_of_variation() - 30.0 / 650.0).abs() < 1e-12);
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let dist = ParameterDistribution::Normal {
            mean: 5.0,
            std_dev: 1.0,
        };
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        let a: Vec<f64> = (0..100).map(|_| dist.sample(&mut rng_a)).collect();
        let b: Vec<f64> = (0..100).map(|_| dist.sample(&mut rng_b)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_respects_bounds() {
        let dist = ParameterDistribution::Triangular {
            min: 1.0,
            mode: 2.0,
            max: 3.0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = dist.sample(&mut rng);
            assert!((1.0..=3.0).contains(&v));
        }
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dist = ParameterDistribution::Triangular {
            min: 0.01,
            mode: 0.02,
            max: 0.03,
        };
        let yaml = serde_yml::to_string(&dist).unwrap();
        assert!(yaml.contains("kind: triangular"));
        let parsed: ParameterDistribution = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, dist);
    }
}
