//! Smoothing and reference curves.

use crate::error::AppError;

/// Trailing moving average with a window that grows from 1 up to `window`.
///
/// `out[k]` is the mean of `values[max(0, k + 1 - window)..=k]`, so the first
/// element is always defined. Each window is summed directly rather than with
/// a running sum, which keeps long series free of accumulated drift.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<f64>, AppError> {
    if window == 0 {
        return Err(AppError::config("Moving-average window must be >= 1."));
    }

    let out = (0..values.len())
        .map(|k| {
            let start = (k + 1).saturating_sub(window);
            let slice = &values[start..=k];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect();
    Ok(out)
}

/// Theoretical convergence value of difficulty for a given Δ/T: `exp(-Δ/T)`.
pub fn convergence_reference(delta_t: f64) -> f64 {
    (-delta_t).exp()
}
