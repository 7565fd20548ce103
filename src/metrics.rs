//! Scores comparing an estimated density against a reference.
//!
//! The divergences treat both density arrays as discrete distributions over
//! the evaluation points: values are clipped away from zero and rescaled to
//! sum to one before comparison.

use crate::error::{Error, Result};

/// Floor applied to density values before taking logarithms.
const CLIP: f64 = 1e-10;

fn check_lengths(p: &[f64], q: &[f64]) -> Result<()> {
    if p.len() == q.len() {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            expected: p.len(),
            got: q.len(),
        })
    }
}

fn to_distribution(values: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = values.iter().map(|&v| v.max(CLIP)).collect();
    let total: f64 = clipped.iter().sum();
    clipped.into_iter().map(|v| v / total).collect()
}

fn kl(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .map(|(&pi, &qi)| pi * (pi / qi).ln())
        .sum::<f64>()
        .max(0.0)
}

/// Kullback-Leibler divergence `KL(p ‖ q)` between two density arrays.
///
/// # Errors
///
/// Returns `Error::LengthMismatch` if the arrays differ in length and
/// `Error::EmptySamples` if they are empty.
///
/// # Examples
///
/// ```
/// use robust_kde::metrics::kl_divergence;
///
/// let p = [0.2, 0.5, 0.3];
/// assert!(kl_divergence(&p, &p).unwrap().abs() < 1e-12);
/// assert!(kl_divergence(&p, &[0.6, 0.2, 0.2]).unwrap() > 0.0);
/// ```
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    check_lengths(p, q)?;
    if p.is_empty() {
        return Err(Error::EmptySamples);
    }
    Ok(kl(&to_distribution(p), &to_distribution(q)))
}

/// Jensen-Shannon divergence, `½ KL(p ‖ m) + ½ KL(q ‖ m)` with `m = (p + q) / 2`.
///
/// Symmetric and bounded by `ln 2`.
///
/// # Errors
///
/// Same as [`kl_divergence`].
pub fn js_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    check_lengths(p, q)?;
    if p.is_empty() {
        return Err(Error::EmptySamples);
    }
    let p = to_distribution(p);
    let q = to_distribution(q);
    let m: Vec<f64> = p.iter().zip(&q).map(|(a, b)| 0.5 * (a + b)).collect();
    Ok(0.5 * kl(&p, &m) + 0.5 * kl(&q, &m))
}

/// Area under the ROC curve of `scores` for the binary `labels`.
///
/// Higher scores are taken to indicate the positive class (`true`). Computed
/// from the Mann-Whitney U statistic, with tied scores sharing their average
/// rank, which equals the trapezoidal area under the empirical ROC curve.
///
/// # Errors
///
/// Returns `Error::LengthMismatch` if the inputs differ in length and
/// `Error::SingleClass` unless both classes are present.
///
/// # Examples
///
/// ```
/// use robust_kde::metrics::roc_auc;
///
/// let labels = [true, true, false, false];
/// let auc = roc_auc(&labels, &[0.9, 0.8, 0.3, 0.1]).unwrap();
/// assert!((auc - 1.0).abs() < 1e-12);
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Result<f64> {
    if labels.len() != scores.len() {
        return Err(Error::LengthMismatch {
            expected: labels.len(),
            got: scores.len(),
        });
    }
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(Error::SingleClass);
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_unstable_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, ties averaged
    let mut rank_sum_pos = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]].total_cmp(&scores[order[start]]).is_eq() {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        rank_sum_pos += rank * order[start..end].iter().filter(|&&i| labels[i]).count() as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_neg))
}
