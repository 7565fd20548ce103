//! Experiment-level density model.
//!
//! [`DensityModel`] picks an estimator by [`EstimatorKind`], keeps the
//! settings of one experimental run, and records how the resulting density
//! scores against a reference density and against anomaly labels.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `blocks` | `None` | Median-of-means block count; derived from the outlier fraction when unset |
//! | `normalize_mom` | `true` | Normalize median-of-means densities |
//! | `h_std_mom` | `false` | Scale median-of-means block bandwidths by their spread |
//! | `monte_carlo` | [`MonteCarlo::default`] | Integrator for median-of-means without a grid |
//! | `seed` | `None` | Seed for every stochastic step |
//!
//! # Examples
//!
//! ```
//! use nalgebra::DMatrix;
//! use robust_kde::{DensityModel, EstimatorKind, KernelShape};
//!
//! let data: Vec<f64> = (0..20).map(|i| f64::from(i) * 0.1).collect();
//! let sample = DMatrix::from_row_slice(20, 1, &data);
//! let eval = DMatrix::from_row_slice(3, 1, &[0.5, 1.0, 5.0]);
//!
//! let kind: EstimatorKind = "rkde-huber".parse().unwrap();
//! let mut model = DensityModel::new(kind, 0.1, KernelShape::Gaussian, 0.3);
//! model.fit(&sample, &eval, None).unwrap();
//!
//! let density = model.density().unwrap();
//! assert!(density[1] > density[2]);
//! ```

use core::fmt;
use core::str::FromStr;

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::estimator::{FittedModel, MedianRule, MomKde, RobustKde, Spkde, plain};
use crate::kernel::KernelShape;
use crate::metrics;
use crate::normalize::MonteCarlo;

/// Estimator families known to [`DensityModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum EstimatorKind {
    /// Plain KDE.
    Kde,
    /// Median-of-means KDE with pointwise median.
    MomKde,
    /// Median-of-means KDE with medoid aggregation.
    MomGeomKde,
    /// Robust KDE with Hampel loss.
    RkdeHampel,
    /// Robust KDE with Huber loss.
    RkdeHuber,
    /// Scaled-and-projected KDE.
    Spkde,
}

impl EstimatorKind {
    /// Every kind, in a fixed order.
    pub const ALL: [Self; 6] = [
        Self::Kde,
        Self::MomKde,
        Self::MomGeomKde,
        Self::RkdeHampel,
        Self::RkdeHuber,
        Self::Spkde,
    ];

    /// Name used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kde => "kde",
            Self::MomKde => "mom-kde",
            Self::MomGeomKde => "mom-geom-kde",
            Self::RkdeHampel => "rkde-hampel",
            Self::RkdeHuber => "rkde-huber",
            Self::Spkde => "spkde",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimatorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownEstimator(s.to_string()))
    }
}

/// Divergences between a reference density `f0` and the estimate `f`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Divergences {
    /// `KL(f0 ‖ f)`.
    pub kl_true_estimate: f64,
    /// `KL(f ‖ f0)`.
    pub kl_estimate_true: f64,
    /// Jensen-Shannon divergence.
    pub jensen_shannon: f64,
}

/// One row of an experiment report.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreRecord {
    /// Estimator used.
    pub algo: EstimatorKind,
    /// Kernel bandwidth.
    pub bandwidth: f64,
    /// Assumed outlier fraction.
    pub outlier_fraction: f64,
    /// Number of median-of-means blocks, if applicable.
    pub n_block: Option<usize>,
    /// ROC AUC of the density as anomaly score, if computed.
    pub auc_anomaly: Option<f64>,
}

/// A density estimator together with the results of one run.
#[derive(Clone, Debug)]
pub struct DensityModel {
    kind: EstimatorKind,
    outlier_fraction: f64,
    kernel: KernelShape,
    bandwidth: f64,
    blocks: Option<usize>,
    normalize_mom: bool,
    h_std_mom: bool,
    monte_carlo: MonteCarlo,
    seed: Option<u64>,
    fitted: Option<FittedModel>,
    density: Option<DVector<f64>>,
    n_block: Option<usize>,
    divergences: Option<Divergences>,
    auc_anomaly: Option<f64>,
}

impl DensityModel {
    /// Creates an unfitted model.
    ///
    /// `kernel` applies to the plain and median-of-means estimators; the
    /// robust and projected estimators are Gaussian.
    #[must_use]
    pub fn new(
        kind: EstimatorKind,
        outlier_fraction: f64,
        kernel: KernelShape,
        bandwidth: f64,
    ) -> Self {
        Self {
            kind,
            outlier_fraction,
            kernel,
            bandwidth,
            blocks: None,
            normalize_mom: true,
            h_std_mom: false,
            monte_carlo: MonteCarlo::default(),
            seed: None,
            fitted: None,
            density: None,
            n_block: None,
            divergences: None,
            auc_anomaly: None,
        }
    }

    /// Sets the median-of-means block count.
    #[must_use]
    pub fn blocks(mut self, blocks: usize) -> Self {
        self.blocks = Some(blocks);
        self
    }

    /// Enables or disables median-of-means normalization.
    #[must_use]
    pub fn normalize_mom(mut self, normalize: bool) -> Self {
        self.normalize_mom = normalize;
        self
    }

    /// Enables or disables spread-scaled median-of-means bandwidths.
    #[must_use]
    pub fn h_std_mom(mut self, h_std: bool) -> Self {
        self.h_std_mom = h_std;
        self
    }

    /// Sets the Monte Carlo integrator for median-of-means.
    #[must_use]
    pub fn monte_carlo(mut self, monte_carlo: MonteCarlo) -> Self {
        self.monte_carlo = monte_carlo;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Estimator family.
    #[must_use]
    pub fn kind(&self) -> EstimatorKind {
        self.kind
    }

    /// The fitted model, if any.
    #[must_use]
    pub fn fitted(&self) -> Option<&FittedModel> {
        self.fitted.as_ref()
    }

    /// Density from the last fit or evaluation, if any.
    #[must_use]
    pub fn density(&self) -> Option<&DVector<f64>> {
        self.density.as_ref()
    }

    /// Divergences from the last [`DensityModel::compute_score`], if any.
    #[must_use]
    pub fn divergences(&self) -> Option<Divergences> {
        self.divergences
    }

    /// ROC AUC from the last [`DensityModel::compute_anomaly_roc`], if any.
    #[must_use]
    pub fn auc_anomaly(&self) -> Option<f64> {
        self.auc_anomaly
    }

    fn mom(&self, median: MedianRule) -> MomKde {
        let mut mom = MomKde::new()
            .median(median)
            .normalize(self.normalize_mom)
            .h_std(self.h_std_mom)
            .kernel(self.kernel)
            .monte_carlo(self.monte_carlo.clone());
        if let Some(blocks) = self.blocks {
            mom = mom.blocks(blocks);
        }
        if let Some(seed) = self.seed {
            mom = mom.seed(seed);
        }
        mom
    }

    /// Fits on `sample` and evaluates on `eval`, replacing any previous fit.
    ///
    /// `grid` describes `eval` as a Cartesian grid and is only used to
    /// normalize the median-of-means estimators.
    ///
    /// # Errors
    ///
    /// Returns the errors of the selected estimator.
    pub fn fit(
        &mut self,
        sample: &DMatrix<f64>,
        eval: &DMatrix<f64>,
        grid: Option<&[Vec<f64>]>,
    ) -> Result<()> {
        let h = self.bandwidth;
        let estimate = match self.kind {
            EstimatorKind::Kde => plain::fit(sample, eval, h, self.kernel)?,
            EstimatorKind::MomKde => {
                self.mom(MedianRule::Pointwise)
                    .fit(sample, eval, h, self.outlier_fraction, grid)?
            }
            EstimatorKind::MomGeomKde => {
                self.mom(MedianRule::Geometric)
                    .fit(sample, eval, h, self.outlier_fraction, grid)?
            }
            EstimatorKind::RkdeHampel => RobustKde::hampel().fit(sample, eval, h)?,
            EstimatorKind::RkdeHuber => RobustKde::huber().fit(sample, eval, h)?,
            EstimatorKind::Spkde => Spkde::new().fit(sample, eval, h, self.outlier_fraction)?,
        };

        self.n_block = match &estimate.model {
            FittedModel::MedianOfMeans(model) => Some(model.n_blocks()),
            _ => None,
        };
        trace_info!(algo = %self.kind, bandwidth = h, "density model fitted");
        self.density = Some(estimate.density);
        self.fitted = Some(estimate.model);
        Ok(())
    }

    /// Evaluates the fitted model at `points` and stores the result as the
    /// current density.
    ///
    /// # Errors
    ///
    /// Returns `Error::ModelNotFitted` before [`DensityModel::fit`] and
    /// `Error::DimensionMismatch` for points of the wrong dimensionality.
    pub fn estimate_density(&mut self, points: &DMatrix<f64>) -> Result<&DVector<f64>> {
        let model = self.fitted.as_ref().ok_or(Error::ModelNotFitted)?;
        let density = model.evaluate(points)?;
        Ok(&*self.density.insert(density))
    }

    /// Compares the current density with `true_density` at the same points.
    ///
    /// # Errors
    ///
    /// Returns `Error::DensityNotEstimated` when no density exists yet and
    /// `Error::LengthMismatch` when the arrays differ in length.
    pub fn compute_score(&mut self, true_density: &[f64]) -> Result<Divergences> {
        let density = self.density.as_ref().ok_or(Error::DensityNotEstimated)?;
        let estimate = density.as_slice();
        let divergences = Divergences {
            kl_true_estimate: metrics::kl_divergence(true_density, estimate)?,
            kl_estimate_true: metrics::kl_divergence(estimate, true_density)?,
            jensen_shannon: metrics::js_divergence(estimate, true_density)?,
        };
        self.divergences = Some(divergences);
        Ok(divergences)
    }

    /// ROC AUC of the current density against `labels`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DensityNotEstimated` when no density exists yet,
    /// `Error::LengthMismatch` when `labels` does not match the density and
    /// `Error::SingleClass` when only one class is present.
    pub fn compute_anomaly_roc(&mut self, labels: &[bool]) -> Result<f64> {
        let density = self.density.as_ref().ok_or(Error::DensityNotEstimated)?;
        let auc = metrics::roc_auc(labels, density.as_slice())?;
        self.auc_anomaly = Some(auc);
        Ok(auc)
    }

    /// Report row for this run.
    #[must_use]
    pub fn score_record(&self) -> ScoreRecord {
        ScoreRecord {
            algo: self.kind,
            bandwidth: self.bandwidth,
            outlier_fraction: self.outlier_fraction,
            n_block: self.n_block,
            auc_anomaly: self.auc_anomaly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u32) -> DMatrix<f64> {
        let data: Vec<f64> = (0..n).map(|i| f64::from(i) * 0.1).collect();
        DMatrix::from_row_slice(data.len(), 1, &data)
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in EstimatorKind::ALL {
            assert_eq!(kind.to_string().parse::<EstimatorKind>().unwrap(), kind);
        }
        assert!(matches!(
            "rkde".parse::<EstimatorKind>(),
            Err(Error::UnknownEstimator(s)) if s == "rkde"
        ));
    }

    #[test]
    fn estimate_before_fit_fails() {
        let mut model = DensityModel::new(EstimatorKind::Kde, 0.1, KernelShape::Gaussian, 0.5);
        assert!(matches!(
            model.estimate_density(&line(3)),
            Err(Error::ModelNotFitted)
        ));
    }

    #[test]
    fn scores_before_density_fail() {
        let mut model = DensityModel::new(EstimatorKind::Spkde, 0.1, KernelShape::Gaussian, 0.5);
        assert!(matches!(
            model.compute_score(&[1.0]),
            Err(Error::DensityNotEstimated)
        ));
        assert!(matches!(
            model.compute_anomaly_roc(&[true]),
            Err(Error::DensityNotEstimated)
        ));
    }

    #[test]
    fn every_kind_fits_and_reevaluates() {
        let sample = line(30);
        let eval = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        for kind in EstimatorKind::ALL {
            let mut model = DensityModel::new(kind, 0.1, KernelShape::Gaussian, 0.3)
                .normalize_mom(false)
                .seed(1);
            model.fit(&sample, &eval, None).unwrap();
            let fitted = model.density().unwrap().clone();
            let again = model.estimate_density(&eval).unwrap();
            assert!((again - &fitted).norm() < 1e-12, "{kind}");
        }
    }

    #[test]
    fn record_carries_block_count() {
        let sample = line(40);
        let eval = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let mut model = DensityModel::new(EstimatorKind::MomKde, 0.1, KernelShape::Gaussian, 0.3)
            .normalize_mom(false)
            .seed(2);
        model.fit(&sample, &eval, None).unwrap();
        let record = model.score_record();
        assert_eq!(record.algo, EstimatorKind::MomKde);
        assert_eq!(record.n_block, Some(9));
        assert!(record.auc_anomaly.is_none());

        let mut plain = DensityModel::new(EstimatorKind::Kde, 0.1, KernelShape::Gaussian, 0.3);
        plain.fit(&sample, &eval, None).unwrap();
        assert_eq!(plain.score_record().n_block, None);
    }

    #[test]
    fn anomaly_auc_is_stored() {
        let sample = line(20);
        let eval = DMatrix::from_row_slice(4, 1, &[0.5, 1.0, 8.0, 9.0]);
        let mut model = DensityModel::new(EstimatorKind::Kde, 0.0, KernelShape::Gaussian, 0.3);
        model.fit(&sample, &eval, None).unwrap();
        // inliers are the positive class and get the higher density
        let auc = model.compute_anomaly_roc(&[true, true, false, false]).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
        assert_eq!(model.score_record().auc_anomaly, Some(auc));
    }
}
