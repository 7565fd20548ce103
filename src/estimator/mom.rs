//! Median-of-means kernel density estimation.
//!
//! The sample is shuffled and cut into `K` equal blocks. Each block gets its
//! own KDE and the `K` block densities are combined with a median, so a
//! minority of blocks polluted by outliers cannot drag the estimate along.
//!
//! Two aggregation rules exist:
//!
//! - **pointwise**: the median over blocks, taken independently at every
//!   evaluation point.
//! - **geometric**: the block density vector with the smallest summed
//!   Euclidean distance to all others (a discrete medoid; this is not the
//!   Weiszfeld geometric median).
//!
//! Neither aggregate integrates to one in general, so the result is divided
//! by an estimate of its integral unless normalization is disabled.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `blocks` | `None` | Number of blocks; `⌊2·n·outlier_fraction⌋ + 1` when unset |
//! | `median` | `Pointwise` | Aggregation rule |
//! | `normalize` | `true` | Divide by the estimated integral |
//! | `h_std` | `false` | Scale each block's bandwidth by its standard deviation |
//! | `kernel` | `Gaussian` | Kernel shape of the block estimators |
//! | `monte_carlo` | [`MonteCarlo::default`] | Integrator used without a grid |
//! | `seed` | `None` | Seed for shuffling and Monte Carlo |

use core::fmt;
use core::str::FromStr;

use nalgebra::{DMatrix, DVector};

use super::{
    Estimate, FittedModel, KernelDensity, validate_outlier_fraction, validate_points,
    validate_sample,
};
use crate::error::{Error, Result};
use crate::kernel::{KernelShape, validate_bandwidth};
use crate::normalize::{MonteCarlo, grid_area};
use crate::{rng_util, stats};

/// How the per-block densities are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MedianRule {
    /// Median over blocks at every evaluation point.
    #[default]
    Pointwise,
    /// Block vector closest, in summed distance, to all others.
    Geometric,
}

impl MedianRule {
    /// Lowercase name of the rule.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pointwise => "pointwise",
            Self::Geometric => "geometric",
        }
    }
}

impl fmt::Display for MedianRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedianRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pointwise" => Ok(Self::Pointwise),
            "geometric" => Ok(Self::Geometric),
            other => Err(Error::UnknownMedianRule(other.to_string())),
        }
    }
}

/// Aggregation stored in a fitted model.
///
/// The geometric rule is resolved once at fit time: later evaluations reuse
/// the block that was selected on the evaluation set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregation {
    /// Pointwise median over all blocks.
    Pointwise,
    /// The block chosen as medoid during fitting.
    Geometric {
        /// Index into [`MomModel::blocks`].
        block: usize,
    },
}

/// Fitted median-of-means model.
#[derive(Clone, Debug)]
pub struct MomModel {
    blocks: Vec<KernelDensity>,
    aggregation: Aggregation,
    area: f64,
}

impl MomModel {
    /// Aggregated density before division by the area.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `points` has the wrong number of columns.
    pub fn unnormalized(&self, points: &DMatrix<f64>) -> Result<DVector<f64>> {
        match self.aggregation {
            Aggregation::Pointwise => {
                let per_block = self
                    .blocks
                    .iter()
                    .map(|kde| kde.density(points))
                    .collect::<Result<Vec<_>>>()?;
                pointwise_median(&per_block)
            }
            Aggregation::Geometric { block } => self.blocks[block].density(points),
        }
    }

    /// Normalized density at every row of `points`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `points` has the wrong number of columns.
    pub fn evaluate(&self, points: &DMatrix<f64>) -> Result<DVector<f64>> {
        Ok(self.unnormalized(points)? / self.area)
    }

    /// Per-block estimators, in block order.
    #[must_use]
    pub fn blocks(&self) -> &[KernelDensity] {
        &self.blocks
    }

    /// Number of blocks.
    #[must_use]
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Aggregation rule with the selected block, if any.
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Integral estimate the aggregate is divided by (1 when not normalized).
    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Number of dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.blocks.first().map_or(0, KernelDensity::n_dims)
    }
}

/// Median-of-means KDE configuration.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use robust_kde::estimator::{MedianRule, MomKde};
///
/// let data: Vec<f64> = (0..40).map(|i| f64::from(i) * 0.1).collect();
/// let sample = DMatrix::from_row_slice(40, 1, &data);
/// let axis: Vec<f64> = (0..200).map(|i| -3.0 + f64::from(i) * 0.05).collect();
/// let eval = DMatrix::from_row_slice(axis.len(), 1, &axis);
///
/// let estimate = MomKde::new()
///     .median(MedianRule::Pointwise)
///     .seed(7)
///     .fit(&sample, &eval, 0.3, 0.05, Some(&[axis]))
///     .unwrap();
///
/// assert_eq!(estimate.density.len(), 200);
/// ```
#[derive(Clone, Debug)]
pub struct MomKde {
    blocks: Option<usize>,
    median: MedianRule,
    normalize: bool,
    h_std: bool,
    kernel: KernelShape,
    monte_carlo: MonteCarlo,
    seed: Option<u64>,
}

impl Default for MomKde {
    fn default() -> Self {
        Self {
            blocks: None,
            median: MedianRule::Pointwise,
            normalize: true,
            h_std: false,
            kernel: KernelShape::Gaussian,
            monte_carlo: MonteCarlo::default(),
            seed: None,
        }
    }
}

impl MomKde {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of blocks explicitly.
    ///
    /// Default: derived from the outlier fraction.
    #[must_use]
    pub fn blocks(mut self, blocks: usize) -> Self {
        self.blocks = Some(blocks);
        self
    }

    /// Sets the aggregation rule.
    #[must_use]
    pub fn median(mut self, median: MedianRule) -> Self {
        self.median = median;
        self
    }

    /// Enables or disables division by the estimated integral.
    #[must_use]
    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Scales each block's bandwidth by the standard deviation of its entries.
    #[must_use]
    pub fn h_std(mut self, h_std: bool) -> Self {
        self.h_std = h_std;
        self
    }

    /// Sets the kernel shape of the block estimators.
    #[must_use]
    pub fn kernel(mut self, kernel: KernelShape) -> Self {
        self.kernel = kernel;
        self
    }

    /// Sets the integrator used when no grid is available.
    #[must_use]
    pub fn monte_carlo(mut self, monte_carlo: MonteCarlo) -> Self {
        self.monte_carlo = monte_carlo;
        self
    }

    /// Sets the seed for shuffling and Monte Carlo integration.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of blocks this configuration uses for `n` samples.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOutlierFraction` for a fraction outside `[0, 1)`
    /// and `Error::InvalidBlockCount` unless `K = 1` or `1 ≤ K ≤ n / 2`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn block_count(&self, n: usize, outlier_fraction: f64) -> Result<usize> {
        validate_outlier_fraction(outlier_fraction)?;
        let blocks = self
            .blocks
            .unwrap_or_else(|| (2.0 * n as f64 * outlier_fraction).floor() as usize + 1);
        if blocks == 1 || (1..=n / 2).contains(&blocks) {
            Ok(blocks)
        } else {
            Err(Error::InvalidBlockCount { blocks, samples: n })
        }
    }

    /// Fits on `sample` and evaluates on `eval`, seeding from the configuration.
    ///
    /// `grid` describes `eval` as a Cartesian grid and enables quadrature
    /// normalization. Without it the integral is estimated by Monte Carlo.
    ///
    /// # Errors
    ///
    /// See [`MomKde::fit_with_rng`].
    pub fn fit(
        &self,
        sample: &DMatrix<f64>,
        eval: &DMatrix<f64>,
        bandwidth: f64,
        outlier_fraction: f64,
        grid: Option<&[Vec<f64>]>,
    ) -> Result<Estimate> {
        let mut rng = rng_util::from_seed(self.seed);
        self.fit_with_rng(sample, eval, bandwidth, outlier_fraction, grid, &mut rng)
    }

    /// Fits with an injected random number generator.
    ///
    /// # Errors
    ///
    /// Returns the input validation errors of the plain KDE,
    /// `Error::InvalidOutlierFraction`, `Error::InvalidBlockCount`, the grid
    /// errors of [`grid_area`] and `Error::DegenerateArea` when the
    /// estimated integral is not positive and finite.
    pub fn fit_with_rng(
        &self,
        sample: &DMatrix<f64>,
        eval: &DMatrix<f64>,
        bandwidth: f64,
        outlier_fraction: f64,
        grid: Option<&[Vec<f64>]>,
        rng: &mut fastrand::Rng,
    ) -> Result<Estimate> {
        validate_sample(sample)?;
        validate_points(sample, eval)?;
        validate_bandwidth(bandwidth)?;
        let n = sample.nrows();
        let n_blocks = self.block_count(n, outlier_fraction)?;

        let mut indices: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut indices);
        let block_size = n / n_blocks;

        let blocks = indices
            .chunks_exact(block_size)
            .take(n_blocks)
            .map(|rows| {
                let block = sample.select_rows(rows);
                let h = if self.h_std {
                    let spread = stats::std_dev(block.as_slice());
                    if spread > 0.0 && spread.is_finite() {
                        bandwidth * spread
                    } else {
                        bandwidth
                    }
                } else {
                    bandwidth
                };
                KernelDensity::new(block, h, self.kernel)
            })
            .collect::<Result<Vec<_>>>()?;

        let per_block = blocks
            .iter()
            .map(|kde| kde.density(eval))
            .collect::<Result<Vec<_>>>()?;

        let (aggregation, unnormalized) = match self.median {
            MedianRule::Pointwise => (Aggregation::Pointwise, pointwise_median(&per_block)?),
            MedianRule::Geometric => {
                let block = medoid_index(&per_block)?;
                (Aggregation::Geometric { block }, per_block[block].clone())
            }
        };

        let mut model = MomModel {
            blocks,
            aggregation,
            area: 1.0,
        };

        if self.normalize {
            let area = if grid.is_some() {
                grid_area(&unnormalized, grid)?
            } else {
                trace_warn!("no grid specified, computing area with monte carlo");
                self.monte_carlo
                    .area(sample, rng, |points| model.unnormalized(points))?
            };
            if !(area > 0.0 && area.is_finite()) {
                return Err(Error::DegenerateArea(area));
            }
            model.area = area;
        }

        trace_debug!(
            blocks = n_blocks,
            block_size,
            rule = %self.median,
            area = model.area,
            "median-of-means fitted"
        );

        Ok(Estimate {
            density: unnormalized / model.area,
            model: FittedModel::MedianOfMeans(model),
        })
    }
}

/// Median over vectors at every coordinate.
///
/// An even number of vectors averages the two middle values.
///
/// # Errors
///
/// Returns `Error::EmptySamples` when `vectors` is empty and
/// `Error::LengthMismatch` when the vectors differ in length.
pub fn pointwise_median(vectors: &[DVector<f64>]) -> Result<DVector<f64>> {
    let len = check_same_length(vectors)?;
    let mut column = vec![0.0; vectors.len()];
    Ok(DVector::from_fn(len, |i, _| {
        for (slot, v) in column.iter_mut().zip(vectors) {
            *slot = v[i];
        }
        stats::median(&mut column)
    }))
}

/// Index of the vector minimizing the summed Euclidean distance to all others.
///
/// Ties go to the lowest index.
///
/// # Errors
///
/// Returns `Error::EmptySamples` when `vectors` is empty and
/// `Error::LengthMismatch` when the vectors differ in length.
pub fn medoid_index(vectors: &[DVector<f64>]) -> Result<usize> {
    check_same_length(vectors)?;
    let k = vectors.len();
    let mut totals = vec![0.0; k];
    for i in 0..k {
        for j in (i + 1)..k {
            let dist = (&vectors[i] - &vectors[j]).norm();
            totals[i] += dist;
            totals[j] += dist;
        }
    }
    let mut best = 0;
    for (i, &total) in totals.iter().enumerate().skip(1) {
        if total < totals[best] {
            best = i;
        }
    }
    Ok(best)
}

fn check_same_length(vectors: &[DVector<f64>]) -> Result<usize> {
    let first = vectors.first().ok_or(Error::EmptySamples)?;
    let len = first.len();
    match vectors.iter().find(|v| v.len() != len) {
        Some(v) => Err(Error::LengthMismatch {
            expected: len,
            got: v.len(),
        }),
        None => Ok(len),
    }
}
