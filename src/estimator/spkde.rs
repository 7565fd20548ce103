//! Scaled-and-projected KDE.
//!
//! The plain KDE is scaled by `β = 1 / (1 - outlier_fraction)` and projected
//! in the kernel's feature space onto the convex hull of the sample's
//! feature maps. Scaling pushes the projection to drop the mass of
//! low-density points first. With `G` the Gram matrix the projection is
//!
//! `minimize ½ aᵀ G a - (β/n) 1ᵀ G a   subject to   a ≥ 0,  1ᵀ a = 1`
//!
//! and the estimate is `f(x) = Σ_i a_i K_h(x, x_i)`.

use nalgebra::{DMatrix, DVector};

use super::{
    Estimate, FittedModel, WeightedKde, validate_outlier_fraction, validate_points,
    validate_sample,
};
use crate::error::Result;
use crate::kernel::{gaussian_gram, validate_bandwidth};
use crate::qp::{SimplexQp, SmoSolver};

/// SPKDE configuration, generic over the simplex QP backend.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use robust_kde::estimator::Spkde;
///
/// let sample = DMatrix::from_row_slice(6, 1, &[0.0, 0.1, -0.1, 0.2, -0.2, 8.0]);
/// let eval = DMatrix::from_row_slice(2, 1, &[0.0, 8.0]);
/// let estimate = Spkde::new().fit(&sample, &eval, 0.3, 0.2).unwrap();
///
/// assert!(estimate.density[0] > estimate.density[1]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Spkde<S = SmoSolver> {
    solver: S,
}

impl Spkde {
    /// SPKDE with the bundled SMO solver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SimplexQp> Spkde<S> {
    /// SPKDE with a custom QP backend.
    #[must_use]
    pub fn with_solver(solver: S) -> Self {
        Self { solver }
    }

    /// Solves for the weights on `sample` and evaluates the result on `eval`.
    ///
    /// # Errors
    ///
    /// Returns the input validation errors of the plain KDE,
    /// `Error::InvalidOutlierFraction` for a fraction outside `[0, 1)`, and
    /// whatever the QP backend returns, typically `Error::QpNotConverged`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(
        &self,
        sample: &DMatrix<f64>,
        eval: &DMatrix<f64>,
        bandwidth: f64,
        outlier_fraction: f64,
    ) -> Result<Estimate> {
        validate_sample(sample)?;
        validate_points(sample, eval)?;
        validate_bandwidth(bandwidth)?;
        validate_outlier_fraction(outlier_fraction)?;

        let n = sample.nrows();
        let beta = 1.0 / (1.0 - outlier_fraction);
        let gram = gaussian_gram(sample, sample, bandwidth)?;
        let q = -(&gram * DVector::from_element(n, 1.0)) * (beta / n as f64);

        let solution = self.solver.solve(&gram, &q)?;
        trace_debug!(
            beta,
            iterations = solution.iterations,
            gap = solution.gap,
            "spkde weights"
        );

        let model = WeightedKde::new(sample.clone(), solution.x, bandwidth);
        let density = model.evaluate(eval)?;
        Ok(Estimate {
            density,
            model: FittedModel::Qp(model),
        })
    }
}
