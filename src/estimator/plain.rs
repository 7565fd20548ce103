//! Plain kernel density estimation on the full sample.
//!
//! `f(x) = (1/n) Σ_i K_h(x - x_i)`, evaluated in log space with the
//! log-sum-exp trick so that far-away query points underflow gracefully.

use nalgebra::{DMatrix, DVector};

use super::{Estimate, FittedModel, validate_points, validate_sample};
use crate::error::Result;
use crate::kernel::{KernelShape, validate_bandwidth};
use crate::rng_util;

/// A fitted kernel density estimator with an isotropic bandwidth.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use robust_kde::KernelShape;
/// use robust_kde::estimator::KernelDensity;
///
/// let sample = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
/// let kde = KernelDensity::new(sample, 0.5, KernelShape::Gaussian).unwrap();
///
/// let points = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 10.0, 10.0]);
/// let density = kde.density(&points).unwrap();
/// assert!(density[0] > density[1]);
/// ```
#[derive(Clone, Debug)]
pub struct KernelDensity {
    /// Training points, one per row.
    samples: DMatrix<f64>,
    /// Kernel width shared by every dimension.
    bandwidth: f64,
    kernel: KernelShape,
}

impl KernelDensity {
    /// Creates a KDE over the rows of `samples`.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySamples` if `samples` has no rows,
    /// `Error::ZeroDimensions` if it has no columns and
    /// `Error::InvalidBandwidth` if `bandwidth` is not positive.
    pub fn new(samples: DMatrix<f64>, bandwidth: f64, kernel: KernelShape) -> Result<Self> {
        validate_sample(&samples)?;
        validate_bandwidth(bandwidth)?;
        Ok(Self {
            samples,
            bandwidth,
            kernel,
        })
    }

    /// Creates a Gaussian KDE.
    ///
    /// # Errors
    ///
    /// See [`KernelDensity::new`].
    pub fn gaussian(samples: DMatrix<f64>, bandwidth: f64) -> Result<Self> {
        Self::new(samples, bandwidth, KernelShape::Gaussian)
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.samples.ncols()
    }

    /// Returns the number of training points.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    /// Returns the bandwidth.
    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Returns the kernel shape.
    #[must_use]
    pub fn kernel(&self) -> KernelShape {
        self.kernel
    }

    /// Returns the training points.
    #[must_use]
    pub fn samples(&self) -> &DMatrix<f64> {
        &self.samples
    }

    /// Log density at row `row` of `points`. `points` must have `n_dims` columns.
    #[allow(clippy::cast_precision_loss)]
    fn log_pdf_row(&self, points: &DMatrix<f64>, row: usize) -> f64 {
        let n = self.samples.nrows() as f64;
        let d = self.samples.ncols();
        let log_norm = self.kernel.log_norm(self.bandwidth, d);

        let log_kernels: Vec<f64> = (0..self.samples.nrows())
            .map(|i| {
                let sq: f64 = (0..d)
                    .map(|k| (points[(row, k)] - self.samples[(i, k)]).powi(2))
                    .sum();
                self.kernel.log_profile(sq.sqrt(), self.bandwidth)
            })
            .collect();

        let max_log_kernel = log_kernels
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        // Outside every kernel's support, or too far for any term to register
        if max_log_kernel == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }

        let sum_exp: f64 = log_kernels
            .iter()
            .map(|&lk| (lk - max_log_kernel).exp())
            .sum();

        max_log_kernel + sum_exp.ln() - n.ln() - log_norm
    }

    /// Log density at every row of `points`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `points` does not have `n_dims` columns.
    pub fn log_density(&self, points: &DMatrix<f64>) -> Result<DVector<f64>> {
        validate_points(&self.samples, points)?;
        Ok(DVector::from_fn(points.nrows(), |row, _| {
            self.log_pdf_row(points, row)
        }))
    }

    /// Density at every row of `points`, computed as `exp(log_density)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `points` does not have `n_dims` columns.
    pub fn density(&self, points: &DMatrix<f64>) -> Result<DVector<f64>> {
        Ok(self.log_density(points)?.map(f64::exp))
    }

    /// Total log-likelihood of `points` under the estimate.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `points` does not have `n_dims` columns.
    pub fn score(&self, points: &DMatrix<f64>) -> Result<f64> {
        Ok(self.log_density(points)?.sum())
    }

    /// Draws one point from the Gaussian mixture centred on the samples.
    ///
    /// Picks a training point uniformly and adds isotropic Gaussian noise
    /// with the bandwidth as standard deviation.
    pub(crate) fn sample_gaussian(&self, rng: &mut fastrand::Rng) -> Vec<f64> {
        let idx = rng.usize(0..self.samples.nrows());
        (0..self.samples.ncols())
            .map(|k| self.samples[(idx, k)] + rng_util::standard_normal(rng) * self.bandwidth)
            .collect()
    }
}

/// Fits a plain KDE on `sample` and evaluates it on `eval`.
///
/// # Errors
///
/// Returns `Error::InvalidBandwidth`, `Error::EmptySamples`,
/// `Error::ZeroDimensions` or `Error::DimensionMismatch` on invalid input.
pub fn fit(
    sample: &DMatrix<f64>,
    eval: &DMatrix<f64>,
    bandwidth: f64,
    kernel: KernelShape,
) -> Result<Estimate> {
    let kde = KernelDensity::new(sample.clone(), bandwidth, kernel)?;
    let density = kde.density(eval)?;
    Ok(Estimate {
        density,
        model: FittedModel::Plain(kde),
    })
}
