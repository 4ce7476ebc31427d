/// A probability vector of length `n` with `peak` at index `peak_idx`.
///
/// The remaining mass is split evenly across the other entries.
pub fn peaked_scores(n: usize, peak_idx: usize, peak: f32) -> Vec<f32> {
    assert!(peak_idx < n, "peak index out of range");
    if n == 1 {
        return vec![1.0];
    }
    #[allow(clippy::cast_precision_loss)]
    let rest = (1.0 - peak) / (n - 1) as f32;
    (0..n)
        .map(|i| if i == peak_idx { peak } else { rest })
        .collect()
}

/// A uniform probability vector of length `n`.
pub fn uniform_scores(n: usize) -> Vec<f32> {
    #[allow(clippy::cast_precision_loss)]
    let p = 1.0 / n as f32;
    vec![p; n]
}
