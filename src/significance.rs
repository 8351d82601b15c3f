//! Candidate significance estimation
//!
//! Converts the ranking-statistic distribution of the surviving candidates
//! into a false-alarm rate and false-alarm probability. The comparison
//! population here is the foreground itself with unit weights; this is a
//! deliberate placeholder model carried over from the original search, not an
//! independent background estimate.

/// Seconds in a Julian year
pub const SECONDS_PER_YEAR: f64 = 31_557_600.0;

/// Weighted counts of background entries at least as loud as each value
///
/// For every entry of `background` and of `foreground`, counts the total
/// weight of background entries with statistic greater than or equal to it
/// (ties count as louder). `weights` parallels `background`; `None` means
/// unit weight (no decimation). Returns the background's own counts and the
/// foreground counts, in input order.
///
/// Sorts the background once and binary-searches per query, so the cost is
/// O((m + n) log n) rather than quadratic.
pub fn count_louder(
    foreground: &[f64],
    background: &[f64],
    weights: Option<&[f64]>,
) -> (Vec<f64>, Vec<f64>) {
    let n = background.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        background[a]
            .partial_cmp(&background[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let sorted: Vec<f64> = order.iter().map(|&i| background[i]).collect();
    // suffix[k] = total weight of sorted[k..]
    let mut suffix = vec![0.0; n + 1];
    for k in (0..n).rev() {
        let w = weights.map_or(1.0, |ws| ws[order[k]]);
        suffix[k] = suffix[k + 1] + w;
    }

    let louder = |s: f64| -> f64 {
        let first_at_least = sorted.partition_point(|&v| v < s);
        suffix[first_at_least]
    };

    let background_counts = background.iter().map(|&s| louder(s)).collect();
    let foreground_counts = foreground.iter().map(|&s| louder(s)).collect();
    (background_counts, foreground_counts)
}

/// Inverse false-alarm rate in seconds
///
/// `observed_time / (n_louder + 1)`: the `+1` keeps the loudest event finite
/// and is the unbiased convention for "expected time to one louder event".
pub fn inverse_false_alarm_rate(n_louder: f64, observed_time: f64) -> f64 {
    observed_time / (n_louder + 1.0)
}

/// Poisson probability of at least one event this loud in `observed_time`
pub fn false_alarm_probability(observed_time: f64, ifar: f64) -> f64 {
    1.0 - (-observed_time / ifar).exp()
}

/// Convert seconds to Julian years
pub fn seconds_to_years(seconds: f64) -> f64 {
    seconds / SECONDS_PER_YEAR
}
