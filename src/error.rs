use crate::irls::LossShape;

/// Errors returned by density estimators, solvers and the experiment model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when bandwidth is not positive and finite.
    #[error("invalid bandwidth: {0} must be positive")]
    InvalidBandwidth(f64),

    /// Returned when an estimator is given a sample with no rows.
    #[error("density estimation requires at least one sample")]
    EmptySamples,

    /// Returned when a sample has no columns.
    #[error("samples must have at least one dimension")]
    ZeroDimensions,

    /// Returned when two matrices disagree on the number of columns.
    #[error("dimension mismatch: expected {expected} dimensions, got {got}")]
    DimensionMismatch {
        /// The dimensionality the estimator was built with.
        expected: usize,
        /// The dimensionality that was supplied.
        got: usize,
    },

    /// Returned when the outlier fraction is outside `[0, 1)`.
    #[error("invalid outlier fraction: {0} must be in [0.0, 1.0)")]
    InvalidOutlierFraction(f64),

    /// Returned when the median-of-means block count cannot partition the sample.
    #[error("invalid block count: {blocks} blocks cannot partition {samples} samples")]
    InvalidBlockCount {
        /// The requested or derived number of blocks.
        blocks: usize,
        /// The number of training samples.
        samples: usize,
    },

    /// Returned when an estimator name does not match any known estimator.
    #[error("unknown estimator: '{0}'")]
    UnknownEstimator(String),

    /// Returned when a median rule name is neither `pointwise` nor `geometric`.
    #[error("wrong value for median rule: '{0}'")]
    UnknownMedianRule(String),

    /// Returned when a loss name does not match any robust loss.
    #[error("unknown loss shape: '{0}'")]
    UnknownLoss(String),

    /// Returned when a loss shape cannot drive the robust KDE.
    #[error("loss shape {0} cannot drive the robust KDE, use huber or hampel")]
    UnsupportedLoss(LossShape),

    /// Returned when a kernel name does not match any kernel shape.
    #[error("unknown kernel: '{0}'")]
    UnknownKernel(String),

    /// Returned when a quadrature grid axis is empty or not strictly increasing.
    #[error("invalid grid: {0}")]
    InvalidGrid(&'static str),

    /// Returned when the grid shape does not cover the density vector.
    #[error("grid size mismatch: grid has {expected} points but density has {got}")]
    GridSizeMismatch {
        /// Product of the grid axis lengths.
        expected: usize,
        /// Length of the density vector.
        got: usize,
    },

    /// Returned when the estimated integral cannot be used to normalize a density.
    #[error("degenerate density area: {0}")]
    DegenerateArea(f64),

    /// Returned when cross-validation folds cannot be formed.
    #[error("invalid folds: cannot split {samples} samples into {folds} folds")]
    InvalidFolds {
        /// The requested number of folds.
        folds: usize,
        /// The number of samples.
        samples: usize,
    },

    /// Returned when the quadratic program does not reach an optimal point.
    #[error("quadratic program did not converge after {iterations} iterations (gap {gap:e})")]
    QpNotConverged {
        /// Iterations performed before giving up.
        iterations: usize,
        /// Optimality gap at the last iterate.
        gap: f64,
    },

    /// Returned when evaluating a model before it was fitted.
    #[error("model not fitted: call fit before estimating densities")]
    ModelNotFitted,

    /// Returned when scoring before any density has been estimated.
    #[error("cannot compute score, density not estimated")]
    DensityNotEstimated,

    /// Returned when two arrays that must align have different lengths.
    #[error("length mismatch: expected {expected} values, got {got}")]
    LengthMismatch {
        /// The expected length.
        expected: usize,
        /// The supplied length.
        got: usize,
    },

    /// Returned when ROC analysis is given labels of a single class.
    #[error("ROC AUC requires both positive and negative labels")]
    SingleClass,
}

/// Shorthand for `Result<T, robust_kde::Error>`.
pub type Result<T> = core::result::Result<T, Error>;
