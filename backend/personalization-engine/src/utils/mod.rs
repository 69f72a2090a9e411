// Vector math shared by the initializer, the feedback learner and the ranker.
// Pure functions, no state.

/// Sum every category vector is rescaled to
pub const TARGET_SUM: f64 = 5.0;

/// Stand-in for zero divisors in the median-ratio rule
pub const RATIO_EPSILON: f64 = 1e-10;

/// Shift a vector so its minimum is non-negative, then scale it so that
/// `sum(|v|) == target_sum`. An all-zero vector is left untouched.
pub fn rescale_and_normalize(values: &mut [f64], target_sum: f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if min < 0.0 {
        let shift = min.abs();
        values.iter_mut().for_each(|v| *v += shift);
    }

    let sum: f64 = values.iter().map(|v| v.abs()).sum();
    if sum == 0.0 || !sum.is_finite() {
        return;
    }

    let scale = target_sum / sum;
    values.iter_mut().for_each(|v| *v *= scale);
}

/// Median with the mean-of-middle-pair convention for even lengths
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Per-dimension deviation of `item` from a reference median:
/// `1 - item/median` when `item <= median`, else `1 - median/item`.
pub fn median_ratio_from(median: f64, item: &[f64]) -> Vec<f64> {
    let m = if median == 0.0 { RATIO_EPSILON } else { median };

    item.iter()
        .map(|&value| {
            let a = if value == 0.0 { RATIO_EPSILON } else { value };
            if a <= m {
                1.0 - a / m
            } else {
                1.0 - m / a
            }
        })
        .collect()
}

/// Median-ratio vector of `item` against the median of `user`
pub fn median_ratio(user: &[f64], item: &[f64]) -> Vec<f64> {
    median_ratio_from(median(user), item)
}

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
