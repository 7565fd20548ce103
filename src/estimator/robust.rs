//! Robust kernel density estimation by M-estimation in feature space.
//!
//! The KDE is the mean of the feature maps `Φ(x_i)`. Replacing that mean by
//! a robust M-estimate gives a weighted KDE whose weights shrink for points
//! far from the bulk. Fitting runs IRLS twice:
//!
//! 1. with the absolute loss, to measure how far each point sits from a
//!    robust center;
//! 2. with the chosen loss, its thresholds set from the median, 75th and
//!    95th percentiles of those distances.

use nalgebra::DMatrix;

use super::{Estimate, FittedModel, WeightedKde, validate_points, validate_sample};
use crate::error::{Error, Result};
use crate::irls::{IrlsSolver, LossShape, RobustLoss};
use crate::kernel::{gaussian_gram, validate_bandwidth};
use crate::stats;

/// Robust KDE configuration.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use robust_kde::estimator::RobustKde;
/// use robust_kde::irls::LossShape;
///
/// let sample = DMatrix::from_row_slice(6, 1, &[0.0, 0.1, -0.1, 0.2, -0.2, 8.0]);
/// let eval = DMatrix::from_row_slice(2, 1, &[0.0, 8.0]);
/// let estimate = RobustKde::new(LossShape::Hampel)
///     .unwrap()
///     .fit(&sample, &eval, 0.3)
///     .unwrap();
///
/// assert!(estimate.density[0] > estimate.density[1]);
/// ```
#[derive(Clone, Debug)]
pub struct RobustKde {
    loss: LossShape,
    solver: IrlsSolver,
}

impl RobustKde {
    /// Creates a robust KDE with the given loss and a default solver.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedLoss` for `Abs` and `Square`: only the
    /// thresholded losses make sense in the second stage.
    pub fn new(loss: LossShape) -> Result<Self> {
        match loss {
            LossShape::Huber | LossShape::Hampel => Ok(Self {
                loss,
                solver: IrlsSolver::default(),
            }),
            LossShape::Abs | LossShape::Square => Err(Error::UnsupportedLoss(loss)),
        }
    }

    /// Huber-loss robust KDE.
    #[must_use]
    pub fn huber() -> Self {
        Self {
            loss: LossShape::Huber,
            solver: IrlsSolver::default(),
        }
    }

    /// Hampel-loss robust KDE.
    #[must_use]
    pub fn hampel() -> Self {
        Self {
            loss: LossShape::Hampel,
            solver: IrlsSolver::default(),
        }
    }

    /// Sets the IRLS solver used by both stages.
    #[must_use]
    pub fn solver(mut self, solver: IrlsSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Loss of the second stage.
    #[must_use]
    pub fn loss(&self) -> LossShape {
        self.loss
    }

    /// Fits weights on `sample` and evaluates the weighted KDE on `eval`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBandwidth`, `Error::EmptySamples`,
    /// `Error::ZeroDimensions` or `Error::DimensionMismatch` on invalid input.
    pub fn fit(&self, sample: &DMatrix<f64>, eval: &DMatrix<f64>, bandwidth: f64) -> Result<Estimate> {
        validate_sample(sample)?;
        validate_points(sample, eval)?;
        validate_bandwidth(bandwidth)?;

        let gram = gaussian_gram(sample, sample, bandwidth)?;

        let pilot = self.solver.solve(&gram, &RobustLoss::Abs)?;
        let mut norms: Vec<f64> = pilot.norms.iter().copied().collect();
        let a = stats::median(&mut norms);
        let b = stats::percentile(&mut norms, 75.0);
        let c = stats::percentile(&mut norms, 95.0);
        trace_debug!(a, b, c, pilot_iterations = pilot.iterations, "robust kde thresholds");

        let loss = self.loss.with_thresholds(a, b, c);
        let result = self.solver.solve(&gram, &loss)?;
        trace_debug!(
            loss = %self.loss,
            iterations = result.iterations,
            trajectory = result.losses.len(),
            converged = result.converged,
            "robust kde weights"
        );

        let model = WeightedKde::new(sample.clone(), result.weights, bandwidth);
        let density = model.evaluate(eval)?;
        Ok(Estimate {
            density,
            model: FittedModel::Robust(model),
        })
    }
}
