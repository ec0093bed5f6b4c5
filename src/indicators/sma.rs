// =============================================================================
// Simple Moving Average and rolling standard deviation
// =============================================================================
//
// Both are trailing-window statistics: position `i` covers `values[i-w+1..=i]`.
// The first `window - 1` positions have an incomplete window and are `None`.

use crate::indicators::DerivedSeries;

/// Trailing arithmetic mean over `window` points, aligned 1:1 with the
/// input.
///
/// # Edge cases
/// - `window == 0` => all `None` (a zero-width window is meaningless)
/// - `values.len() < window` => all `None`
pub fn moving_average(values: &[f64], window: usize) -> DerivedSeries {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    // Running sum over the trailing window.
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = Some(sum / window as f64);

    for i in window..values.len() {
        sum += values[i] - values[i - window];
        out[i] = Some(sum / window as f64);
    }

    out
}

/// Trailing sample standard deviation (ddof = 1) over `window` points,
/// aligned 1:1 with the input.
///
/// Uses the two-pass formula per window rather than a running-sum variance
/// update; the windows here are small (20 by default) and the two-pass
/// form is immune to catastrophic cancellation.
///
/// # Edge cases
/// - `window < 2` => all `None` (sample std needs at least two points)
/// - `values.len() < window` => all `None`
pub fn rolling_std(values: &[f64], window: usize) -> DerivedSeries {
    let mut out = vec![None; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var =
            slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window as f64 - 1.0);
        out[i] = Some(var.sqrt());
    }

    out
}
