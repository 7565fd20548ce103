#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Kernel density estimation that stays accurate when the sample is
//! contaminated by outliers. Alongside the plain KDE the crate ships three
//! robust families, a cross-validated bandwidth selector, and the integral
//! estimators needed to normalize densities that are not normalized by
//! construction.
//!
//! # Getting Started
//!
//! ```
//! use nalgebra::DMatrix;
//! use robust_kde::prelude::*;
//!
//! // 19 points near the origin and one far outlier
//! let mut data: Vec<f64> = (0..19).map(|i| f64::from(i) * 0.05 - 0.45).collect();
//! data.push(9.0);
//! let sample = DMatrix::from_row_slice(20, 1, &data);
//! let eval = DMatrix::from_row_slice(2, 1, &[0.0, 9.0]);
//!
//! let plain = plain::fit(&sample, &eval, 0.3, KernelShape::Gaussian).unwrap();
//! let robust = RobustKde::hampel().fit(&sample, &eval, 0.3).unwrap();
//!
//! assert!(robust.density[1] < plain.density[1]);
//! ```
//!
//! # Estimators
//!
//! | Estimator | Entry point | Robustness mechanism |
//! |-----------|-------------|----------------------|
//! | Plain KDE | [`estimator::plain::fit`] | none |
//! | Median-of-means KDE | [`MomKde`](estimator::MomKde) | median over KDEs of disjoint blocks |
//! | Robust KDE | [`RobustKde`](estimator::RobustKde) | IRLS with Huber or Hampel loss in feature space |
//! | SPKDE | [`Spkde`](estimator::Spkde) | scaled KDE projected onto the sample's convex hull |
//!
//! Each `fit` returns an [`Estimate`]: the density on the evaluation points
//! and a [`FittedModel`] that evaluates it anywhere else.
//!
//! # Supporting pieces
//!
//! | Module | Role |
//! |--------|------|
//! | [`kernel`] | Gaussian kernel, Gram matrices, kernel shapes |
//! | [`irls`] | Robust losses and the reweighting solver |
//! | [`qp`] | Simplex-constrained QP trait and SMO solver |
//! | [`normalize`] | Grid quadrature and Monte Carlo integrals |
//! | [`bandwidth`] | Cross-validated bandwidth search |
//! | [`metrics`] | KL and Jensen-Shannon divergences, ROC AUC |
//! | [`model`] | Estimator dispatch by name and per-run scoring |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on names, kernel shapes and [`ScoreRecord`] | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) from the solvers and estimators | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub mod bandwidth;
mod error;
pub mod estimator;
pub mod irls;
pub mod kernel;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod qp;
mod rng_util;
mod stats;

pub use error::{Error, Result};
pub use estimator::{Estimate, FittedModel};
pub use kernel::KernelShape;
pub use model::{DensityModel, Divergences, EstimatorKind, ScoreRecord};

/// Convenient wildcard import.
///
/// ```
/// use robust_kde::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bandwidth::{BandwidthSearch, BandwidthSelector, CrossValidation, logspace};
    pub use crate::error::{Error, Result};
    pub use crate::estimator::{
        Aggregation, Estimate, FittedModel, KernelDensity, MedianRule, MomKde, MomModel,
        RobustKde, Spkde, WeightedKde, plain,
    };
    pub use crate::irls::{IrlsResult, IrlsSolver, LossShape, RobustLoss};
    pub use crate::kernel::{KernelShape, gaussian_gram, gaussian_kernel};
    pub use crate::metrics::{js_divergence, kl_divergence, roc_auc};
    pub use crate::model::{DensityModel, Divergences, EstimatorKind, ScoreRecord};
    pub use crate::normalize::{MonteCarlo, Proposal, grid_area};
    pub use crate::qp::{QpSolution, SimplexQp, SmoSolver};
}
