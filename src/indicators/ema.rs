// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Span-parameterised EMA:
//   alpha = 2 / (span + 1)
//   ema_0 = x_0
//   ema_t = x_t * alpha + ema_{t-1} * (1 - alpha)
//
// Seeded with the first value, so the series is defined from index 0 —
// MACD and its signal line are built on this and carry no warm-up gap.

/// Compute the EMA of `values` with smoothing span `span`.
///
/// Output has the same length as the input, defined from index 0.
///
/// # Edge cases
/// - `span == 0` => empty vec (division guard)
/// - empty input => empty vec
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);

    let mut out = Vec::with_capacity(values.len());
    let mut prev = values[0];
    out.push(prev);

    for &x in &values[1..] {
        prev = x * alpha + prev * (1.0 - alpha);
        out.push(prev);
    }

    out
}
