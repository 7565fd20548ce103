//! Kernel evaluation shared by every estimator.
//!
//! The robust and QP estimators work with the isotropic Gaussian kernel
//!
//! `K_h(x, y) = exp(-|x - y|² / (2h²)) / (2πh²)^(d/2)`
//!
//! through [`gaussian_kernel`] and the Gram helpers below. The plain KDE can
//! also use the compactly supported shapes of [`KernelShape`].

use core::fmt;
use core::str::FromStr;

use nalgebra::DMatrix;

use crate::error::{Error, Result};

const LOG_2PI: f64 = 1.837_877_066_409_345_5;

/// Gaussian kernel value for a squared distance.
///
/// Callers must pass `bandwidth > 0`; the estimators validate it before
/// reaching this function.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gaussian_kernel(sq_dist: f64, bandwidth: f64, dim: usize) -> f64 {
    let h2 = bandwidth * bandwidth;
    (-sq_dist / (2.0 * h2)).exp() / (2.0 * core::f64::consts::PI * h2).powf(dim as f64 / 2.0)
}

/// Squared Euclidean distances between the rows of `x` and the rows of `y`.
///
/// The result has `x.nrows()` rows and `y.nrows()` columns.
///
/// # Errors
///
/// Returns `Error::DimensionMismatch` if `x` and `y` have different column counts.
pub fn squared_distances(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_columns(x, y)?;
    let d = x.ncols();
    Ok(DMatrix::from_fn(x.nrows(), y.nrows(), |i, j| {
        (0..d).map(|k| (x[(i, k)] - y[(j, k)]).powi(2)).sum()
    }))
}

/// Gaussian kernel matrix between the rows of `x` and the rows of `y`.
///
/// With `x == y` this is the n×n Gram matrix used by the robust and QP
/// estimators.
///
/// # Errors
///
/// Returns `Error::InvalidBandwidth` if `bandwidth` is not positive and
/// `Error::DimensionMismatch` if the column counts differ.
pub fn gaussian_gram(x: &DMatrix<f64>, y: &DMatrix<f64>, bandwidth: f64) -> Result<DMatrix<f64>> {
    validate_bandwidth(bandwidth)?;
    let dim = x.ncols();
    let mut gram = squared_distances(x, y)?;
    gram.apply(|v| *v = gaussian_kernel(*v, bandwidth, dim));
    Ok(gram)
}

pub(crate) fn validate_bandwidth(bandwidth: f64) -> Result<()> {
    if bandwidth > 0.0 && bandwidth.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidBandwidth(bandwidth))
    }
}

pub(crate) fn check_columns(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<()> {
    if x.ncols() == y.ncols() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected: x.ncols(),
            got: y.ncols(),
        })
    }
}

/// Kernel profile used by the plain KDE.
///
/// Every shape is normalized so that it integrates to one over ℝᵈ for any
/// bandwidth. The compact shapes (`Tophat`, `Epanechnikov`, `Linear`) vanish
/// at distance ≥ h.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum KernelShape {
    /// `exp(-r² / 2h²)`
    #[default]
    Gaussian,
    /// `1` for `r < h`
    Tophat,
    /// `1 - r² / h²` for `r < h`
    Epanechnikov,
    /// `exp(-r / h)`
    Exponential,
    /// `1 - r / h` for `r < h`
    Linear,
}

impl KernelShape {
    /// Log of the un-normalized kernel profile at distance `dist`.
    ///
    /// Returns `f64::NEG_INFINITY` outside the support of compact kernels.
    #[must_use]
    pub fn log_profile(self, dist: f64, bandwidth: f64) -> f64 {
        let z = dist / bandwidth;
        match self {
            Self::Gaussian => -0.5 * z * z,
            Self::Exponential => -z,
            Self::Tophat if z < 1.0 => 0.0,
            Self::Epanechnikov if z < 1.0 => (1.0 - z * z).ln(),
            Self::Linear if z < 1.0 => (1.0 - z).ln(),
            Self::Tophat | Self::Epanechnikov | Self::Linear => f64::NEG_INFINITY,
        }
    }

    /// Log of the normalizing constant `∫ profile(|x|) dx` in `dim` dimensions.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn log_norm(self, bandwidth: f64, dim: usize) -> f64 {
        let d = dim as f64;
        let scale = d * bandwidth.ln();
        let shape = match self {
            Self::Gaussian => 0.5 * d * LOG_2PI,
            Self::Tophat => log_unit_ball_volume(dim),
            Self::Epanechnikov => log_unit_ball_volume(dim) + (2.0 / (d + 2.0)).ln(),
            // S_{d-1} Γ(d) = d V_d (d-1)! = V_d d!
            Self::Exponential => log_unit_ball_volume(dim) + log_factorial(dim),
            Self::Linear => log_unit_ball_volume(dim) - (d + 1.0).ln(),
        };
        shape + scale
    }

    /// Returns the kernel's name as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Tophat => "tophat",
            Self::Epanechnikov => "epanechnikov",
            Self::Exponential => "exponential",
            Self::Linear => "linear",
        }
    }
}

impl fmt::Display for KernelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gaussian" => Ok(Self::Gaussian),
            "tophat" => Ok(Self::Tophat),
            "epanechnikov" => Ok(Self::Epanechnikov),
            "exponential" => Ok(Self::Exponential),
            "linear" => Ok(Self::Linear),
            other => Err(Error::UnknownKernel(other.to_owned())),
        }
    }
}

/// `ln V_d` for the unit ball in ℝᵈ via `V_d = V_{d-2} · 2π / d`.
#[allow(clippy::cast_precision_loss)]
fn log_unit_ball_volume(dim: usize) -> f64 {
    let (mut log_v, start) = if dim % 2 == 0 {
        (0.0, 2)
    } else {
        (core::f64::consts::LN_2, 3)
    };
    let mut k = start;
    while k <= dim {
        log_v += LOG_2PI - (k as f64).ln();
        k += 2;
    }
    log_v
}

#[allow(clippy::cast_precision_loss)]
fn log_factorial(n: usize) -> f64 {
    (2..=n).map(|k| (k as f64).ln()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_kernel_peak_1d() {
        let k = gaussian_kernel(0.0, 1.0, 1);
        assert!((k - 1.0 / (2.0 * core::f64::consts::PI).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn gaussian_kernel_matches_formula_2d() {
        let h: f64 = 0.7;
        let sq = 1.3;
        let expected = (-sq / (2.0 * h * h)).exp() / (2.0 * core::f64::consts::PI * h * h);
        assert!((gaussian_kernel(sq, h, 2) - expected).abs() < 1e-12);
    }

    #[test]
    fn squared_distances_shape_and_values() {
        let x = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        let y = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 3.0, 4.0, 1.0, 0.0]);
        let d = squared_distances(&x, &y).unwrap();
        assert_eq!(d.shape(), (2, 3));
        assert!((d[(0, 1)] - 25.0).abs() < 1e-12);
        assert!((d[(1, 2)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn squared_distances_dimension_mismatch() {
        let x = DMatrix::<f64>::zeros(2, 2);
        let y = DMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            squared_distances(&x, &y),
            Err(Error::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn gram_is_symmetric_with_constant_diagonal() {
        let x = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 0.5, -1.0, 2.0]);
        let g = gaussian_gram(&x, &x, 0.5).unwrap();
        let peak = gaussian_kernel(0.0, 0.5, 2);
        for i in 0..3 {
            assert!((g[(i, i)] - peak).abs() < 1e-12);
            for j in 0..3 {
                assert!((g[(i, j)] - g[(j, i)]).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn gram_rejects_bad_bandwidth() {
        let x = DMatrix::<f64>::zeros(2, 1);
        assert!(matches!(
            gaussian_gram(&x, &x, 0.0),
            Err(Error::InvalidBandwidth(_))
        ));
        assert!(matches!(
            gaussian_gram(&x, &x, f64::NAN),
            Err(Error::InvalidBandwidth(_))
        ));
    }

    #[test]
    fn unit_ball_volumes() {
        let pi = core::f64::consts::PI;
        assert!((log_unit_ball_volume(1).exp() - 2.0).abs() < 1e-12);
        assert!((log_unit_ball_volume(2).exp() - pi).abs() < 1e-12);
        assert!((log_unit_ball_volume(3).exp() - 4.0 / 3.0 * pi).abs() < 1e-12);
        assert!((log_unit_ball_volume(4).exp() - pi * pi / 2.0).abs() < 1e-12);
    }

    #[test]
    fn every_shape_integrates_to_one_1d() {
        let h = 0.8;
        let n = 20_000;
        let (low, high) = (-20.0, 20.0);
        let dx = (high - low) / f64::from(n);
        for shape in [
            KernelShape::Gaussian,
            KernelShape::Tophat,
            KernelShape::Epanechnikov,
            KernelShape::Exponential,
            KernelShape::Linear,
        ] {
            let log_norm = shape.log_norm(h, 1);
            let integral: f64 = (0..n)
                .map(|i| {
                    let x: f64 = low + (f64::from(i) + 0.5) * dx;
                    (shape.log_profile(x.abs(), h) - log_norm).exp() * dx
                })
                .sum();
            assert!(
                (integral - 1.0).abs() < 1e-3,
                "{shape} integrates to {integral}"
            );
        }
    }

    #[test]
    fn kernel_names_round_trip() {
        for name in ["gaussian", "tophat", "epanechnikov", "exponential", "linear"] {
            let shape: KernelShape = name.parse().unwrap();
            assert_eq!(shape.to_string(), name);
        }
        assert!(matches!(
            "cosine".parse::<KernelShape>(),
            Err(Error::UnknownKernel(name)) if name == "cosine"
        ));
    }
}
