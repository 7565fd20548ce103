//! Convex quadratic programs over the probability simplex.
//!
//! Solves
//!
//! `minimize ½ xᵀ P x + qᵀ x   subject to   x ≥ 0,  1ᵀ x = 1`
//!
//! for a symmetric positive semi-definite `P`. The solver sits behind the
//! [`SimplexQp`] trait so the projected KDE can run on any backend; the
//! bundled [`SmoSolver`] is a sequential minimal optimization method of the
//! kind used for one-class SVM duals, which share this constraint set.
//!
//! # Algorithm overview
//!
//! Starting from the uniform point, each iteration moves mass between one
//! pair of coordinates: away from the coordinate with the largest gradient
//! among those still carrying mass, towards the coordinate with the best
//! second-order decrease. The step along `e_i - e_j` is solved exactly and
//! clipped so the donor stays non-negative, so every iterate is feasible.
//!
//! Optimality is measured by the maximal KKT violation
//! `max_{x_j > 0} g_j - min_i g_i` (with `g = P x + q`), which upper-bounds
//! the Frank-Wolfe duality gap and hence `f(x) - f*`.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `tolerance` | 1e-6 | KKT violation allowed, relative to `max_i P_ii` |
//! | `max_iter` | 1 000 000 | Pair updates before giving up |

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

const DEFAULT_TOLERANCE: f64 = 1e-6;
const DEFAULT_MAX_ITER: usize = 1_000_000;
/// Curvature floor for pairs with (numerically) identical columns.
const TAU: f64 = 1e-12;

/// Solution of a simplex-constrained QP.
#[derive(Clone, Debug)]
pub struct QpSolution {
    /// Optimal point on the simplex.
    pub x: DVector<f64>,
    /// Objective value `½ xᵀ P x + qᵀ x` at `x`.
    pub objective: f64,
    /// Frank-Wolfe duality gap `xᵀ g - min_i g_i` at `x`.
    pub gap: f64,
    /// Iterations used.
    pub iterations: usize,
}

/// A solver for `min ½ xᵀPx + qᵀx` over the probability simplex.
pub trait SimplexQp {
    /// Solves the program.
    ///
    /// # Errors
    ///
    /// Implementations return `Error::DimensionMismatch` for inconsistent
    /// shapes and `Error::QpNotConverged` when no optimal point is found.
    fn solve(&self, p: &DMatrix<f64>, q: &DVector<f64>) -> Result<QpSolution>;
}

/// Sequential minimal optimization over the simplex.
///
/// # Examples
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use robust_kde::qp::{SimplexQp, SmoSolver};
///
/// // min ½|x|² - x_0 on the 2-simplex: x = (1, 0)
/// let p = DMatrix::identity(2, 2);
/// let q = DVector::from_vec(vec![-1.0, 0.0]);
/// let solution = SmoSolver::new().solve(&p, &q).unwrap();
///
/// assert!((solution.x[0] - 1.0).abs() < 1e-9);
/// assert!(solution.x[1].abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct SmoSolver {
    tolerance: f64,
    max_iter: usize,
}

impl Default for SmoSolver {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

impl SmoSolver {
    /// Creates a solver with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the KKT tolerance, relative to the largest diagonal entry of `P`.
    ///
    /// Default: 1e-6.
    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of pair updates.
    ///
    /// Default: 1 000 000.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Picks the donor `j` (largest gradient among positive coordinates) and
    /// the receiver `i` (best second-order gain among coordinates with a
    /// smaller gradient). Returns `None` when `x` is empty.
    fn select_pair(p: &DMatrix<f64>, x: &DVector<f64>, g: &DVector<f64>) -> Option<(usize, usize)> {
        let j = (0..x.len())
            .filter(|&t| x[t] > 0.0)
            .max_by(|&a, &b| g[a].total_cmp(&g[b]))?;

        let mut best = None;
        let mut best_gain = 0.0;
        for t in 0..x.len() {
            let diff = g[j] - g[t];
            if diff <= 0.0 {
                continue;
            }
            let eta = (p[(t, t)] + p[(j, j)] - 2.0 * p[(t, j)]).max(TAU);
            let gain = diff * diff / eta;
            if gain > best_gain {
                best_gain = gain;
                best = Some(t);
            }
        }
        best.map(|i| (i, j))
    }
}

impl SimplexQp for SmoSolver {
    #[allow(clippy::cast_precision_loss)]
    fn solve(&self, p: &DMatrix<f64>, q: &DVector<f64>) -> Result<QpSolution> {
        let n = p.nrows();
        if n == 0 {
            return Err(Error::EmptySamples);
        }
        if p.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: p.ncols(),
            });
        }
        if q.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: q.len(),
            });
        }

        let scale = (0..n).map(|i| p[(i, i)].abs()).fold(0.0, f64::max).max(1e-300);
        let threshold = self.tolerance * scale;

        let mut x = DVector::from_element(n, 1.0 / n as f64);
        let mut g = p * &x + q;
        let mut iterations = 0;

        loop {
            let violation = kkt_violation(&x, &g);
            if !violation.is_finite() {
                return Err(Error::QpNotConverged {
                    iterations,
                    gap: violation,
                });
            }
            if violation <= threshold {
                break;
            }
            if iterations >= self.max_iter {
                trace_debug!(iterations, violation, "qp iteration cap reached");
                return Err(Error::QpNotConverged {
                    iterations,
                    gap: violation,
                });
            }

            let Some((i, j)) = Self::select_pair(p, &x, &g) else {
                break;
            };
            let eta = (p[(i, i)] + p[(j, j)] - 2.0 * p[(i, j)]).max(TAU);
            let delta = ((g[j] - g[i]) / eta).min(x[j]);

            x[i] += delta;
            x[j] -= delta;
            if x[j] < 0.0 {
                x[j] = 0.0;
            }
            for t in 0..n {
                g[t] += delta * (p[(t, i)] - p[(t, j)]);
            }
            iterations += 1;
        }

        // the incremental gradient drifts; report from a fresh product
        let g = p * &x + q;
        let objective = 0.5 * x.dot(&(&g + q));
        let min_g = g.iter().copied().fold(f64::INFINITY, f64::min);
        let gap = (x.dot(&g) - min_g).max(0.0);

        trace_debug!(iterations, objective, gap, "qp solved");

        Ok(QpSolution {
            x,
            objective,
            gap,
            iterations,
        })
    }
}

/// `max_{x_j > 0} g_j - min_i g_i`, zero at a KKT point.
fn kkt_violation(x: &DVector<f64>, g: &DVector<f64>) -> f64 {
    let min_g = g.iter().copied().fold(f64::INFINITY, f64::min);
    let max_active = x
        .iter()
        .zip(g.iter())
        .filter(|&(&xi, _)| xi > 0.0)
        .map(|(_, &gi)| gi)
        .fold(f64::NEG_INFINITY, f64::max);
    if g.iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }
    (max_active - min_g).max(0.0)
}
