//! Small order statistics shared by the estimators.

/// Compute the given percentile of a non-empty slice. Sorts the slice in place.
///
/// Uses linear interpolation between the two nearest ranks, which matches
/// numpy's default `percentile`.
///
/// # Panics
///
/// Panics if `values` is empty.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn percentile(values: &mut [f64], percentile: f64) -> f64 {
    assert!(!values.is_empty(), "percentile: empty input");
    values.sort_unstable_by(f64::total_cmp);
    let len = values.len();
    if len == 1 {
        return values[0];
    }
    // Rank in [0, len-1] range
    let rank = percentile / 100.0 * (len - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        values[lower]
    } else {
        let frac = rank - lower as f64;
        values[lower] * (1.0 - frac) + values[upper] * frac
    }
}

/// Median of a non-empty slice; even lengths average the two middle values.
pub(crate) fn median(values: &mut [f64]) -> f64 {
    percentile(values, 50.0)
}

/// Population standard deviation (`ddof = 0`).
#[allow(clippy::cast_precision_loss)]
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
