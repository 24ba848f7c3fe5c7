// Batch normalization of a day's scores.

/// Rescale a batch so the largest score is exactly 1.0, but only when some
/// score exceeds 1.0. Entries keep their input order; only values change.
///
/// Non-finite scores are ignored when finding the maximum and are passed
/// through untouched.
pub fn normalize<I>(scores: Vec<(I, f64)>) -> Vec<(I, f64)> {
    let max = scores
        .iter()
        .map(|(_, s)| *s)
        .filter(|s| s.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    if max <= 1.0 {
        return scores;
    }

    // Divide rather than multiply by 1/max so the top entry is exactly 1.0.
    scores
        .into_iter()
        .map(|(id, s)| if s.is_finite() { (id, s / max) } else { (id, s) })
        .collect()
}
