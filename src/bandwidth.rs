//! Cross-validated bandwidth selection.
//!
//! Every candidate bandwidth is scored by the held-out log-likelihood of a
//! plain KDE, averaged over folds, and the best-scoring candidate wins.
//!
//! # Configuration
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `candidates` | `logspace(-1.5, 0.5, 80)` | Bandwidths to try |
//! | `cv` | `KFold(5)` | Fold scheme |
//! | `kernel` | `Gaussian` | Kernel shape of the scored KDEs |

use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::estimator::KernelDensity;
use crate::estimator::validate_sample;
use crate::kernel::{KernelShape, validate_bandwidth};

/// Fold scheme for cross-validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrossValidation {
    /// `k` contiguous folds without shuffling. The first `n % k` folds hold
    /// one extra row.
    KFold(usize),
    /// One fold per row.
    LeaveOneOut,
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self::KFold(5)
    }
}

impl CrossValidation {
    /// Half-open row ranges of the test folds for `n` rows.
    fn folds(self, n: usize) -> Result<Vec<(usize, usize)>> {
        let k = match self {
            Self::KFold(k) => k,
            Self::LeaveOneOut => n,
        };
        if k < 2 || k > n {
            return Err(Error::InvalidFolds { folds: k, samples: n });
        }
        let base = n / k;
        let extra = n % k;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for i in 0..k {
            let len = base + usize::from(i < extra);
            folds.push((start, start + len));
            start += len;
        }
        Ok(folds)
    }
}

/// Outcome of a bandwidth search.
#[derive(Clone, Debug)]
pub struct BandwidthSearch {
    /// Candidate with the highest mean held-out log-likelihood.
    pub best: f64,
    /// Candidates in the order they were scored.
    pub candidates: Vec<f64>,
    /// Mean held-out log-likelihood per candidate.
    pub scores: Vec<f64>,
}

/// Grid search over bandwidths with cross-validated likelihood.
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use robust_kde::bandwidth::{BandwidthSelector, CrossValidation, logspace};
///
/// let data: Vec<f64> = (0..30).map(|i| (f64::from(i) * 0.7).sin()).collect();
/// let sample = DMatrix::from_row_slice(30, 1, &data);
///
/// let search = BandwidthSelector::new()
///     .candidates(logspace(-2.0, 0.0, 10))
///     .cv(CrossValidation::KFold(3))
///     .select(&sample)
///     .unwrap();
///
/// assert!(search.candidates.contains(&search.best));
/// ```
#[derive(Clone, Debug)]
pub struct BandwidthSelector {
    candidates: Vec<f64>,
    cv: CrossValidation,
    kernel: KernelShape,
}

impl Default for BandwidthSelector {
    fn default() -> Self {
        Self {
            candidates: logspace(-1.5, 0.5, 80),
            cv: CrossValidation::default(),
            kernel: KernelShape::Gaussian,
        }
    }
}

impl BandwidthSelector {
    /// Creates a selector with the default candidate grid and 5-fold CV.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the candidate bandwidths.
    #[must_use]
    pub fn candidates(mut self, candidates: Vec<f64>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Sets the fold scheme.
    #[must_use]
    pub fn cv(mut self, cv: CrossValidation) -> Self {
        self.cv = cv;
        self
    }

    /// Sets the kernel shape.
    #[must_use]
    pub fn kernel(mut self, kernel: KernelShape) -> Self {
        self.kernel = kernel;
        self
    }

    /// Scores every candidate on `sample` and returns the best one.
    ///
    /// Ties go to the earliest candidate.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySamples`/`Error::ZeroDimensions` for an unusable
    /// sample, `Error::InvalidFolds` when the folds cannot be formed and
    /// `Error::InvalidBandwidth` for an empty or non-positive candidate list.
    #[allow(clippy::cast_precision_loss)]
    pub fn select(&self, sample: &DMatrix<f64>) -> Result<BandwidthSearch> {
        validate_sample(sample)?;
        if self.candidates.is_empty() {
            return Err(Error::InvalidBandwidth(f64::NAN));
        }
        for &h in &self.candidates {
            validate_bandwidth(h)?;
        }

        let n = sample.nrows();
        let folds = self.cv.folds(n)?;
        let splits: Vec<(DMatrix<f64>, DMatrix<f64>)> = folds
            .iter()
            .map(|&(start, end)| {
                let train: Vec<usize> = (0..start).chain(end..n).collect();
                let test: Vec<usize> = (start..end).collect();
                (sample.select_rows(&train), sample.select_rows(&test))
            })
            .collect();

        let mut scores = Vec::with_capacity(self.candidates.len());
        for &h in &self.candidates {
            let mut total = 0.0;
            for (train, test) in &splits {
                let kde = KernelDensity::new(train.clone(), h, self.kernel)?;
                total += kde.score(test)?;
            }
            scores.push(total / splits.len() as f64);
        }

        let mut best_idx = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best_idx] {
                best_idx = i;
            }
        }
        let best = self.candidates[best_idx];
        trace_debug!(best, score = scores[best_idx], "bandwidth selected");

        Ok(BandwidthSearch {
            best,
            candidates: self.candidates.clone(),
            scores,
        })
    }
}

/// `num` values spaced evenly on a log scale from `10^start` to `10^stop`, inclusive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn logspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![10f64.powf(start)],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| 10f64.powf(start + step * i as f64))
                .collect()
        }
    }
}
