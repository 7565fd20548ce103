//! Iteratively reweighted least squares over a kernel Gram matrix.
//!
//! The solver looks for simplex weights `w` such that the weighted kernel
//! mean `f_w = Σ_i w_i Φ(x_i)` minimizes `Σ_i ρ(‖Φ(x_i) - f_w‖)` for a robust
//! loss `ρ`. Distances in feature space only need the Gram matrix:
//!
//! `‖Φ(x_i) - f_w‖² = K_ii - 2 (K w)_i + wᵀ K w`
//!
//! Each iteration sets `w_i ∝ φ(‖Φ(x_i) - f_w‖)` with `φ(x) = ψ(x) / x`,
//! so points far from the current estimate lose weight.
//!
//! # Loss shapes
//!
//! | Shape | ρ | ψ |
//! |-------|---|---|
//! | `abs` | `x` | `1` |
//! | `square` | `x²` | `2x` |
//! | `huber` | `x²/2` below `a`, linear above | `min(x, a)` |
//! | `hampel` | quadratic, linear, decaying, flat at `a`, `b`, `c` | `x`, `a`, `a(c-x)/(c-b)`, `0` |
//!
//! `abs` only bootstraps the thresholds of the robust KDE; `square` is the
//! non-robust baseline.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `tolerance` | 1e-7 | Stop when the relative loss improvement drops below this |
//! | `max_iter` | 100 | Iteration cap; reaching it is a normal stop |

use core::fmt;
use core::str::FromStr;

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Replacement for a zero norm in `φ(x) = ψ(x) / x`.
const ZERO_NORM: f64 = 1e-5;

const DEFAULT_TOLERANCE: f64 = 1e-7;
const DEFAULT_MAX_ITER: usize = 100;

/// Name of a robust loss, without thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LossShape {
    /// Absolute value.
    Abs,
    /// Squared value.
    Square,
    /// Huber loss.
    Huber,
    /// Hampel's three-part redescending loss.
    Hampel,
}

impl LossShape {
    /// Attach thresholds to the shape. `b` and `c` are only used by `Hampel`,
    /// `a` by `Huber` and `Hampel`.
    #[must_use]
    pub fn with_thresholds(self, a: f64, b: f64, c: f64) -> RobustLoss {
        match self {
            Self::Abs => RobustLoss::Abs,
            Self::Square => RobustLoss::Square,
            Self::Huber => RobustLoss::Huber { a },
            Self::Hampel => RobustLoss::Hampel { a, b, c },
        }
    }

    /// Returns the shape's name as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Square => "square",
            Self::Huber => "huber",
            Self::Hampel => "hampel",
        }
    }
}

impl fmt::Display for LossShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LossShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abs" => Ok(Self::Abs),
            "square" => Ok(Self::Square),
            "huber" => Ok(Self::Huber),
            "hampel" => Ok(Self::Hampel),
            other => Err(Error::UnknownLoss(other.to_owned())),
        }
    }
}

/// A robust loss with its thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RobustLoss {
    /// `ρ(x) = |x|`.
    Abs,
    /// `ρ(x) = x²`.
    Square,
    /// Quadratic below `a`, linear above.
    Huber {
        /// Transition point.
        a: f64,
    },
    /// Quadratic below `a`, linear on `[a, b)`, decaying on `[b, c)`, flat above `c`.
    Hampel {
        /// End of the quadratic part.
        a: f64,
        /// End of the linear part.
        b: f64,
        /// Rejection point; points beyond it get zero weight.
        c: f64,
    },
}

impl RobustLoss {
    /// The shape of this loss.
    #[must_use]
    pub fn shape(&self) -> LossShape {
        match self {
            Self::Abs => LossShape::Abs,
            Self::Square => LossShape::Square,
            Self::Huber { .. } => LossShape::Huber,
            Self::Hampel { .. } => LossShape::Hampel,
        }
    }

    /// Loss value `ρ(x)` for a non-negative norm `x`.
    #[must_use]
    pub fn rho(&self, x: f64) -> f64 {
        match *self {
            Self::Abs => x.abs(),
            Self::Square => x * x,
            Self::Huber { a } => {
                if x <= a {
                    x * x / 2.0
                } else {
                    a * x - a * a / 2.0
                }
            }
            Self::Hampel { a, b, c } => {
                if x < a {
                    x * x / 2.0
                } else if x < b {
                    a * x - a * a / 2.0
                } else if x < c {
                    a * (x - c).powi(2) / (2.0 * (b - c)) + a * (b + c - a) / 2.0
                } else {
                    a * (b + c - a) / 2.0
                }
            }
        }
    }

    /// Influence function `ψ(x)`.
    #[must_use]
    pub fn psi(&self, x: f64) -> f64 {
        match *self {
            Self::Abs => 1.0,
            Self::Square => 2.0 * x,
            Self::Huber { a } => x.min(a),
            Self::Hampel { a, b, c } => {
                if x < a {
                    x
                } else if x < b {
                    a
                } else if x < c {
                    a * (c - x) / (c - b)
                } else {
                    0.0
                }
            }
        }
    }

    /// Weight function `φ(x) = ψ(x) / x`, with `x == 0` replaced by a small epsilon.
    #[must_use]
    pub fn phi(&self, x: f64) -> f64 {
        let x = if x == 0.0 { ZERO_NORM } else { x };
        self.psi(x) / x
    }

    /// IRLS objective `Σ ρ(norm_i) / n²`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn objective(&self, norms: &DVector<f64>) -> f64 {
        let n = norms.len() as f64;
        norms.iter().map(|&x| self.rho(x)).sum::<f64>() / (n * n)
    }
}

/// Output of an IRLS run.
#[derive(Clone, Debug)]
pub struct IrlsResult {
    /// Final simplex weights, one per training point.
    pub weights: DVector<f64>,
    /// Final feature-space distance of each point to the weighted estimate.
    pub norms: DVector<f64>,
    /// Objective value after initialization and after every iteration.
    pub losses: Vec<f64>,
    /// Number of reweighting iterations performed.
    pub iterations: usize,
    /// Whether the relative-improvement criterion was met before the cap.
    pub converged: bool,
}

/// Fixed-point IRLS solver.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use robust_kde::irls::{IrlsSolver, RobustLoss};
/// use robust_kde::kernel::gaussian_gram;
///
/// let sample = DMatrix::from_row_slice(4, 1, &[0.0, 0.1, 0.2, 5.0]);
/// let gram = gaussian_gram(&sample, &sample, 0.5).unwrap();
/// let result = IrlsSolver::new()
///     .max_iter(50)
///     .solve(&gram, &RobustLoss::Huber { a: 0.1 })
///     .unwrap();
///
/// assert!((result.weights.sum() - 1.0).abs() < 1e-12);
/// // The isolated point gets the smallest weight
/// assert!(result.weights[3] < result.weights[0]);
/// ```
#[derive(Clone, Debug)]
pub struct IrlsSolver {
    tolerance: f64,
    max_iter: usize,
}

impl Default for IrlsSolver {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

impl IrlsSolver {
    /// Creates a solver with the default tolerance and iteration cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relative-improvement tolerance.
    ///
    /// Default: 1e-7.
    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of reweighting iterations.
    ///
    /// Default: 100.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Runs IRLS on the Gram matrix `gram` under `loss`.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySamples` if `gram` is empty and
    /// `Error::DimensionMismatch` if it is not square.
    #[allow(clippy::cast_precision_loss)]
    pub fn solve(&self, gram: &DMatrix<f64>, loss: &RobustLoss) -> Result<IrlsResult> {
        let n = gram.nrows();
        if n == 0 {
            return Err(Error::EmptySamples);
        }
        if gram.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: gram.ncols(),
            });
        }

        let mut weights = DVector::from_element(n, 1.0 / n as f64);
        let mut norms = feature_norms(gram, &weights);
        let mut loss_value = loss.objective(&norms);
        let mut losses = vec![loss_value];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iter {
            iterations += 1;
            let previous = loss_value;

            let phi = norms.map(|x| loss.phi(x));
            let total = phi.sum();
            if !(total > 0.0 && total.is_finite()) {
                // every point rejected, keep the last usable weights
                trace_debug!(iterations, "irls stopped: no point carries weight");
                break;
            }
            weights = phi / total;
            norms = feature_norms(gram, &weights);
            loss_value = loss.objective(&norms);
            losses.push(loss_value);

            if (loss_value - previous).abs() < previous * self.tolerance {
                converged = true;
                break;
            }
        }

        trace_debug!(
            loss = %loss.shape(),
            iterations,
            converged,
            final_loss = loss_value,
            "irls finished"
        );

        Ok(IrlsResult {
            weights,
            norms,
            losses,
            iterations,
            converged,
        })
    }
}

/// `‖Φ(x_i) - Σ_j w_j Φ(x_j)‖` for every `i`.
fn feature_norms(gram: &DMatrix<f64>, weights: &DVector<f64>) -> DVector<f64> {
    let kw = gram * weights;
    let quad = weights.dot(&kw);
    DVector::from_fn(gram.nrows(), |i, _| {
        (gram[(i, i)] - 2.0 * kw[i] + quad).max(0.0).sqrt()
    })
}
