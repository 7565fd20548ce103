//! Integral estimates for densities that are not normalized by construction.
//!
//! The median-of-means aggregate is a median of densities, which need not
//! integrate to one. Two interchangeable estimators of its integral exist:
//!
//! - [`grid_area`]: iterated trapezoidal quadrature over a Cartesian grid,
//!   used when the evaluation points form such a grid.
//! - [`MonteCarlo`]: importance sampling from a proposal distribution, used
//!   when no grid is available.
//!
//! # Monte Carlo configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `n_samples` | 100 000 | Proposal draws |
//! | `proposal` | `Kde { bandwidth: 1.0 }` | Where draws come from |

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::estimator::KernelDensity;
use crate::rng_util;

const DEFAULT_MC_SAMPLES: usize = 100_000;
/// Rows evaluated per batch so large draws never materialize at once.
const MC_BATCH: usize = 8192;
/// Bounding-box padding on each side, as a fraction of the data range.
const BOX_PADDING: f64 = 0.5;

/// Trapezoidal integral of `z` over a Cartesian grid.
///
/// `z` holds the density at the grid points in row-major order (the last
/// axis varies fastest). Integration runs along the first axis, then the
/// next, until a scalar remains.
///
/// Without a grid the area cannot be measured: a warning is emitted and the
/// area is taken to be 1.
///
/// # Errors
///
/// Returns `Error::InvalidGrid` if an axis is empty or not strictly
/// increasing and `Error::GridSizeMismatch` if the grid does not have
/// exactly `z.len()` points.
///
/// # Examples
///
/// ```
/// use nalgebra::DVector;
/// use robust_kde::normalize::grid_area;
///
/// let axis = vec![0.0, 0.5, 1.0];
/// let z = DVector::from_element(9, 2.0);
/// let area = grid_area(&z, Some(&[axis.clone(), axis])).unwrap();
/// assert!((area - 2.0).abs() < 1e-12);
/// ```
pub fn grid_area(z: &DVector<f64>, grid: Option<&[Vec<f64>]>) -> Result<f64> {
    let Some(grid) = grid else {
        trace_warn!("no grid specified, assuming area = 1");
        return Ok(1.0);
    };
    validate_grid(grid, z.len())?;

    let mut values: Vec<f64> = z.iter().copied().collect();
    for axis in grid {
        let stride = values.len() / axis.len();
        let mut reduced = vec![0.0; stride];
        for (i, pair) in axis.windows(2).enumerate() {
            let half_dx = 0.5 * (pair[1] - pair[0]);
            let lower = &values[i * stride..(i + 1) * stride];
            let upper = &values[(i + 1) * stride..(i + 2) * stride];
            for ((acc, lo), hi) in reduced.iter_mut().zip(lower).zip(upper) {
                *acc += half_dx * (lo + hi);
            }
        }
        values = reduced;
    }
    Ok(values[0])
}

/// Checks that `grid` is a list of strictly increasing axes covering `len` points.
///
/// # Errors
///
/// See [`grid_area`].
pub fn validate_grid(grid: &[Vec<f64>], len: usize) -> Result<()> {
    if grid.is_empty() {
        return Err(Error::InvalidGrid("grid has no axes"));
    }
    for axis in grid {
        if axis.is_empty() {
            return Err(Error::InvalidGrid("grid axis is empty"));
        }
        if axis.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::InvalidGrid("grid axis is not strictly increasing"));
        }
    }
    let expected: usize = grid.iter().map(Vec::len).product();
    if expected != len {
        return Err(Error::GridSizeMismatch { expected, got: len });
    }
    Ok(())
}

/// Proposal distribution for Monte Carlo integration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Proposal {
    /// Uniform over the sample's bounding box, padded by half its range on each side.
    Uniform,
    /// Gaussian KDE of the sample with the given bandwidth.
    Kde {
        /// Proposal kernel width.
        bandwidth: f64,
    },
}

impl Default for Proposal {
    fn default() -> Self {
        Self::Kde { bandwidth: 1.0 }
    }
}

/// Importance-sampling estimate of `∫ f(x) dx`.
///
/// Draws `x_1..x_N` from the proposal `p` and returns `(1/N) Σ f(x_k) / p(x_k)`.
#[derive(Clone, Debug)]
pub struct MonteCarlo {
    n_samples: usize,
    proposal: Proposal,
}

impl Default for MonteCarlo {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_MC_SAMPLES,
            proposal: Proposal::default(),
        }
    }
}

impl MonteCarlo {
    /// Creates an integrator with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of proposal draws.
    ///
    /// Default: 100 000.
    #[must_use]
    pub fn n_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    /// Sets the proposal distribution.
    ///
    /// Default: `Proposal::Kde { bandwidth: 1.0 }`.
    #[must_use]
    pub fn proposal(mut self, proposal: Proposal) -> Self {
        self.proposal = proposal;
        self
    }

    /// Estimates the integral of `f` with proposals built from `sample`.
    ///
    /// `f` receives batches of proposal points (one per row) and returns the
    /// un-normalized density at each of them.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySamples`/`Error::ZeroDimensions` for an unusable
    /// sample, `Error::InvalidBandwidth` for a bad KDE proposal, and any
    /// error produced by `f`.
    #[allow(clippy::cast_precision_loss)]
    pub fn area<F>(&self, sample: &DMatrix<f64>, rng: &mut fastrand::Rng, mut f: F) -> Result<f64>
    where
        F: FnMut(&DMatrix<f64>) -> Result<DVector<f64>>,
    {
        crate::estimator::validate_sample(sample)?;
        if self.n_samples == 0 {
            return Err(Error::EmptySamples);
        }
        let sampler = ProposalSampler::new(self.proposal, sample)?;
        let d = sample.ncols();

        let mut total = 0.0;
        let mut remaining = self.n_samples;
        while remaining > 0 {
            let batch = remaining.min(MC_BATCH);
            let mut points = DMatrix::zeros(batch, d);
            for row in 0..batch {
                for (k, v) in sampler.draw(rng).into_iter().enumerate() {
                    points[(row, k)] = v;
                }
            }
            let values = f(&points)?;
            let densities = sampler.density(&points)?;
            total += values
                .iter()
                .zip(densities.iter())
                .filter(|&(_, &p)| p > 0.0)
                .map(|(&v, &p)| v / p)
                .sum::<f64>();
            remaining -= batch;
        }

        let area = total / self.n_samples as f64;
        trace_debug!(area, n_samples = self.n_samples, "monte carlo area");
        Ok(area)
    }
}

enum ProposalSampler {
    Uniform { lows: Vec<f64>, highs: Vec<f64>, density: f64 },
    Kde(KernelDensity),
}

impl ProposalSampler {
    fn new(proposal: Proposal, sample: &DMatrix<f64>) -> Result<Self> {
        match proposal {
            Proposal::Uniform => {
                let mut lows = Vec::with_capacity(sample.ncols());
                let mut highs = Vec::with_capacity(sample.ncols());
                for column in sample.column_iter() {
                    let min = column.min();
                    let max = column.max();
                    // a flat column still needs a box of positive width
                    let offset = if max > min {
                        (max - min) * BOX_PADDING
                    } else {
                        BOX_PADDING
                    };
                    lows.push(min - offset);
                    highs.push(max + offset);
                }
                let volume: f64 = lows.iter().zip(&highs).map(|(l, h)| h - l).product();
                Ok(Self::Uniform {
                    lows,
                    highs,
                    density: 1.0 / volume,
                })
            }
            Proposal::Kde { bandwidth } => Ok(Self::Kde(KernelDensity::gaussian(
                sample.clone(),
                bandwidth,
            )?)),
        }
    }

    fn draw(&self, rng: &mut fastrand::Rng) -> Vec<f64> {
        match self {
            Self::Uniform { lows, highs, .. } => lows
                .iter()
                .zip(highs)
                .map(|(&l, &h)| rng_util::f64_range(rng, l, h))
                .collect(),
            Self::Kde(kde) => kde.sample_gaussian(rng),
        }
    }

    fn density(&self, points: &DMatrix<f64>) -> Result<DVector<f64>> {
        match self {
            Self::Uniform { density, .. } => Ok(DVector::from_element(points.nrows(), *density)),
            Self::Kde(kde) => kde.density(points),
        }
    }
}
