//! Quasi-random sampling - Sobol sequences and the Saltelli design
//!
//! Variance-based sensitivity analysis needs a structured sample: two base
//! matrices A and B drawn from a low-discrepancy sequence, plus one matrix
//! AB_i per parameter formed by swapping column i of A with B. The block
//! layout here (A, B, AB_1 .. AB_k) is what the estimators in the
//! sensitivity module expect.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::ParameterSpec;

/// Bits of precision in generated Sobol points
const SOBOL_BITS: u32 = 32;

/// Direction-number rows from the Joe-Kuo "new-joe-kuo-6" table:
/// (polynomial degree s, coefficient a, initial m values).
/// Dimension 1 is the van der Corput sequence and is handled separately.
const DIRECTION_TABLE: &[(u32, u32, &[u32])] = &[
    (1, 0, &[1]),
    (2, 1, &[1, 3]),
    (3, 1, &[1, 3, 1]),
    (3, 2, &[1, 1, 1]),
    (4, 1, &[1, 1, 3, 3]),
    (4, 4, &[1, 3, 5, 13]),
    (5, 2, &[1, 1, 5, 5, 17]),
    (5, 4, &[1, 1, 5, 5, 5]),
    (5, 7, &[1, 1, 7, 11, 19]),
    (5, 11, &[1, 1, 5, 1, 1]),
    (5, 13, &[1, 1, 1, 3, 11]),
    (5, 14, &[1, 3, 5, 5, 31]),
    (6, 1, &[1, 3, 3, 9, 7, 49]),
    (6, 13, &[1, 1, 1, 15, 21, 21]),
    (6, 16, &[1, 3, 1, 13, 27, 49]),
];

/// Highest supported Sobol dimension (table above plus van der Corput)
pub const MAX_DIMENSION: usize = DIRECTION_TABLE.len() + 1;

/// Errors from design construction
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("design needs {requested} Sobol dimensions but only {max} are tabulated")]
    DimensionTooLarge { requested: usize, max: usize },

    #[error("base sample count must be > 0")]
    EmptyDesign,
}

/// Sobol low-discrepancy sequence generator
///
/// Gray-code construction over tabulated direction numbers. The initial
/// all-zeros point is skipped so design points never sit on the boundary of
/// the unit hypercube (the inverse normal CDF is unbounded there).
pub struct SobolSequence {
    directions: Vec<[u32; SOBOL_BITS as usize]>,
    state: Vec<u32>,
    index: u64,
}

impl SobolSequence {
    /// Create a generator for `dimension` coordinates per point
    pub fn new(dimension: usize) -> Result<Self, SamplingError> {
        if dimension > MAX_DIMENSION {
            return Err(SamplingError::DimensionTooLarge {
                requested: dimension,
                max: MAX_DIMENSION,
            });
        }

        let bits = SOBOL_BITS as usize;
        let mut directions = Vec::with_capacity(dimension);

        for d in 0..dimension {
            let mut v = [0u32; SOBOL_BITS as usize];
            if d == 0 {
                // van der Corput: all m_j = 1
                for (j, slot) in v.iter_mut().enumerate() {
                    *slot = 1u32 << (31 - j);
                }
            } else {
                let (s, a, m_init) = DIRECTION_TABLE[d - 1];
                let s = s as usize;
                let mut m = vec![0u32; bits];
                m[..s].copy_from_slice(m_init);
                for j in s..bits {
                    m[j] = m[j - s] ^ (m[j - s] << s);
                    for k in 1..s {
                        if (a >> (s - 1 - k)) & 1 == 1 {
                            m[j] ^= m[j - k] << k;
                        }
                    }
                }
                for j in 0..bits {
                    v[j] = m[j] << (31 - j);
                }
            }
            directions.push(v);
        }

        Ok(Self {
            directions,
            state: vec![0; dimension],
            index: 0,
        })
    }

    /// Next point in [0, 1)^d
    pub fn next_point(&mut self) -> Vec<f64> {
        // Gray-code update: flip the direction for the lowest zero bit of the
        // running index. Skips the implicit zeroth point.
        let bit = self.index.trailing_ones() as usize;
        self.index += 1;
        let scale = 1.0 / (1u64 << SOBOL_BITS) as f64;
        self.state
            .iter_mut()
            .zip(&self.directions)
            .map(|(x, v)| {
                *x ^= v[bit];
                *x as f64 * scale
            })
            .collect()
    }
}

/// An ordered matrix of sampled parameter vectors
///
/// Generated once per analysis run and consumed read-only. When built by
/// [`saltelli_design`] the rows carry block structure; when built by
/// [`monte_carlo`] the rows are independent draws.
#[derive(Debug, Clone)]
pub struct SampleSet {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    base_samples: usize,
    dimension: usize,
    saltelli: bool,
}

impl SampleSet {
    /// Parameter names, in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// All sampled rows
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Total row count
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of parameters (columns)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Base sample size N of the underlying design
    pub fn base_samples(&self) -> usize {
        self.base_samples
    }

    /// Whether rows follow the Saltelli block layout
    pub fn is_saltelli(&self) -> bool {
        self.saltelli
    }

    /// Row index of the j-th point of base matrix A
    pub fn block_a_row(&self, j: usize) -> usize {
        j
    }

    /// Row index of the j-th point of base matrix B
    pub fn block_b_row(&self, j: usize) -> usize {
        self.base_samples + j
    }

    /// Row index of the j-th point of matrix AB_i (column i swapped from B)
    pub fn block_ab_row(&self, i: usize, j: usize) -> usize {
        (2 + i) * self.base_samples + j
    }
}

/// Build the Saltelli extension of a Sobol design
///
/// For k parameters and base size N the result has N·(k+2) rows: the base
/// matrices A and B followed by the k column-swapped matrices AB_i. Columns
/// are mapped through each parameter's inverse CDF. The seed drives a
/// Cranley-Patterson rotation of the raw sequence, so distinct seeds give
/// distinct designs while any single seed reproduces bit-identically.
///
/// k = 0 returns an empty design.
pub fn saltelli_design(
    specs: &[ParameterSpec],
    base_samples: usize,
    seed: u64,
) -> Result<SampleSet, SamplingError> {
    let k = specs.len();
    let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();

    if k == 0 {
        return Ok(SampleSet {
            names,
            rows: Vec::new(),
            base_samples: 0,
            dimension: 0,
            saltelli: true,
        });
    }
    if base_samples == 0 {
        return Err(SamplingError::EmptyDesign);
    }

    // One 2k-dimensional sequence supplies both base matrices: the first k
    // coordinates form A, the last k form B.
    let mut sobol = SobolSequence::new(2 * k)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let shift: Vec<f64> = (0..2 * k).map(|_| rng.random::<f64>()).collect();

    let mut a_unit: Vec<Vec<f64>> = Vec::with_capacity(base_samples);
    let mut b_unit: Vec<Vec<f64>> = Vec::with_capacity(base_samples);
    for _ in 0..base_samples {
        let point = sobol.next_point();
        let rotated: Vec<f64> = point
            .iter()
            .zip(&shift)
            .map(|(x, s)| (x + s).fract())
            .collect();
        a_unit.push(rotated[..k].to_vec());
        b_unit.push(rotated[k..].to_vec());
    }

    let map_row = |unit: &[f64]| -> Vec<f64> {
        unit.iter()
            .zip(specs)
            .map(|(u, spec)| spec.distribution.quantile(*u))
            .collect()
    };

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(base_samples * (k + 2));
    for row in &a_unit {
        rows.push(map_row(row));
    }
    for row in &b_unit {
        rows.push(map_row(row));
    }
    for i in 0..k {
        for j in 0..base_samples {
            let mut swapped = a_unit[j].clone();
            swapped[i] = b_unit[j][i];
            rows.push(map_row(&swapped));
        }
    }

    Ok(SampleSet {
        names,
        rows,
        base_samples,
        dimension: k,
        saltelli: true,
    })
}

/// Draw a plain Monte Carlo sample: N independent parameter vectors
///
/// Used when only ensemble statistics are wanted and no variance
/// decomposition is needed.
pub fn monte_carlo(specs: &[ParameterSpec], samples: usize, seed: u64) -> SampleSet {
    let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
    let mut rng = StdRng::seed_from_u64(seed);

    let rows: Vec<Vec<f64>> = (0..samples)
        .map(|_| specs.iter().map(|s| s.distribution.sample(&mut rng)).collect())
        .collect();

    SampleSet {
        names,
        rows,
        base_samples: samples,
        dimension: specs.len(),
        saltelli: false,
    }
}
