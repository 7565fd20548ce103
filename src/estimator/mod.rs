//! Density estimators and the models they produce.
//!
//! Every estimator's `fit` returns an [`Estimate`]: the density over the
//! requested evaluation points plus a [`FittedModel`] that evaluates the same
//! density at new points without refitting.
//!
//! | Estimator | Entry point | Model variant |
//! |-----------|-------------|---------------|
//! | Plain KDE | [`plain::fit`] | [`FittedModel::Plain`] |
//! | Median-of-means KDE | [`MomKde::fit`] | [`FittedModel::MedianOfMeans`] |
//! | Robust KDE (IRLS) | [`RobustKde::fit`] | [`FittedModel::Robust`] |
//! | Scaled-and-projected KDE (QP) | [`Spkde::fit`] | [`FittedModel::Qp`] |

pub mod mom;
pub mod plain;
pub mod robust;
pub mod spkde;

use nalgebra::{DMatrix, DVector};

pub use mom::{Aggregation, MedianRule, MomKde, MomModel};
pub use plain::KernelDensity;
pub use robust::RobustKde;
pub use spkde::Spkde;

use crate::error::{Error, Result};
use crate::kernel::gaussian_gram;

/// Density over the evaluation points together with the fitted model.
#[derive(Clone, Debug)]
pub struct Estimate {
    /// One density value per evaluation row.
    pub density: DVector<f64>,
    /// State needed to evaluate the estimate elsewhere.
    pub model: FittedModel,
}

/// A fitted density estimate.
///
/// Immutable once built and only valid for points with the dimensionality of
/// the sample it was fitted on.
#[derive(Clone, Debug)]
pub enum FittedModel {
    /// Plain KDE over the full sample.
    Plain(KernelDensity),
    /// Per-block KDEs, their aggregation rule and normalization constant.
    MedianOfMeans(MomModel),
    /// IRLS weights over the sample.
    Robust(WeightedKde),
    /// Quadratic-program weights over the sample.
    Qp(WeightedKde),
}

impl FittedModel {
    /// Evaluates the density at every row of `points`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `points` has the wrong number of columns.
    pub fn evaluate(&self, points: &DMatrix<f64>) -> Result<DVector<f64>> {
        match self {
            Self::Plain(kde) => kde.density(points),
            Self::MedianOfMeans(model) => model.evaluate(points),
            Self::Robust(model) | Self::Qp(model) => model.evaluate(points),
        }
    }

    /// Dimensionality the model was fitted in.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        match self {
            Self::Plain(kde) => kde.n_dims(),
            Self::MedianOfMeans(model) => model.n_dims(),
            Self::Robust(model) | Self::Qp(model) => model.n_dims(),
        }
    }
}

/// Gaussian mixture `Σ_i w_i K_h(x, x_i)` over the training sample.
///
/// The weights live on the simplex, so the mixture integrates to one
/// without further normalization.
#[derive(Clone, Debug)]
pub struct WeightedKde {
    samples: DMatrix<f64>,
    weights: DVector<f64>,
    bandwidth: f64,
}

impl WeightedKde {
    pub(crate) fn new(samples: DMatrix<f64>, weights: DVector<f64>, bandwidth: f64) -> Self {
        Self {
            samples,
            weights,
            bandwidth,
        }
    }

    /// Evaluates the weighted mixture at every row of `points`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `points` has the wrong number of columns.
    pub fn evaluate(&self, points: &DMatrix<f64>) -> Result<DVector<f64>> {
        validate_points(&self.samples, points)?;
        Ok(gaussian_gram(points, &self.samples, self.bandwidth)? * &self.weights)
    }

    /// Weight of each training point.
    #[must_use]
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Training points the weights refer to.
    #[must_use]
    pub fn samples(&self) -> &DMatrix<f64> {
        &self.samples
    }

    /// Kernel bandwidth.
    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Number of dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.samples.ncols()
    }
}

pub(crate) fn validate_sample(sample: &DMatrix<f64>) -> Result<()> {
    if sample.nrows() == 0 {
        return Err(Error::EmptySamples);
    }
    if sample.ncols() == 0 {
        return Err(Error::ZeroDimensions);
    }
    Ok(())
}

pub(crate) fn validate_points(sample: &DMatrix<f64>, points: &DMatrix<f64>) -> Result<()> {
    if points.ncols() == sample.ncols() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected: sample.ncols(),
            got: points.ncols(),
        })
    }
}

pub(crate) fn validate_outlier_fraction(outlier_fraction: f64) -> Result<()> {
    if (0.0..1.0).contains(&outlier_fraction) {
        Ok(())
    } else {
        Err(Error::InvalidOutlierFraction(outlier_fraction))
    }
}
