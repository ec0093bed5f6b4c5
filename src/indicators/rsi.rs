// =============================================================================
// Relative Strength Index (RSI) — trailing-mean averages
// =============================================================================
//
// Step 1 — per-step gain = max(Δ, 0), loss = max(−Δ, 0) where Δ is the
//          close-to-close change (undefined at index 0).
// Step 2 — average gain / average loss = simple trailing mean over the
//          last `window` deltas.
// Step 3 — RS = avg_gain / avg_loss, RSI = 100 − 100 / (1 + RS).
//
// When avg_loss is zero the RSI saturates at exactly 100 (covers the
// all-gains case and the no-movement case; avoids division by zero).
//
// The first defined output is at index `window`: index 0 has no delta, and
// a full window of deltas needs indices 1..=window.

use crate::indicators::DerivedSeries;

/// Compute the RSI series for `values` and look-back `window`, aligned 1:1
/// with the input. Every defined output lies within [0, 100].
///
/// # Edge cases
/// - `window == 0` => all `None`
/// - `values.len() <= window` => all `None` (not enough deltas)
/// - zero average loss => exactly 100.0
pub fn rsi(values: &[f64], window: usize) -> DerivedSeries {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() <= window {
        return out;
    }

    // gains[i] / losses[i] describe the move into values[i + 1].
    let gains: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).max(0.0)).collect();
    let losses: Vec<f64> = values.windows(2).map(|w| (w[0] - w[1]).max(0.0)).collect();

    let mut gain_sum: f64 = gains[..window].iter().sum();
    let mut loss_sum: f64 = losses[..window].iter().sum();

    for i in window..values.len() {
        let avg_gain = gain_sum / window as f64;
        let avg_loss = loss_sum / window as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        out[i] = Some(value);

        // Slide the window one delta forward.
        if i < values.len() - 1 {
            gain_sum += gains[i] - gains[i - window];
            loss_sum += losses[i] - losses[i - window];
        }
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_window_zero() {
        assert_eq!(rsi(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn rsi_insufficient_data_is_all_none() {
        // 14 values => 13 deltas < 14.
        let values: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(rsi(&values, 14).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_warmup_is_exactly_window() {
        let values: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let out = rsi(&values, 14);
        assert_eq!(out.len(), 30);
        assert_eq!(out.iter().take_while(|v| v.is_none()).count(), 14);
        assert!(out[14..].iter().all(Option::is_some));
    }

    #[test]
    fn rsi_all_gains_saturates_at_100() {
        let values: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        for v in rsi(&values, 14).into_iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let values: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        for v in rsi(&values, 14).into_iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_saturates_at_100() {
        // No movement: avg_loss == 0, defined saturation per the zero-loss
        // rule.
        let values = vec![100.0; 30];
        for v in rsi(&values, 14).into_iter().flatten() {
            assert!((v - 100.0).abs() < 1e-10);
        }
    }

    #[test]
    fn rsi_always_within_range() {
        let values = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89,
            46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13, 44.01, 43.50, 42.80, 44.90,
        ];
        for v in rsi(&values, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_matches_hand_computation() {
        // window 2 over [1, 2, 4, 3]:
        // deltas = [+1, +2, -1]
        // i=2: avg_gain = (1+2)/2 = 1.5, avg_loss = 0   => 100
        // i=3: avg_gain = (2+0)/2 = 1.0, avg_loss = 0.5 => 100 - 100/3
        let out = rsi(&[1.0, 2.0, 4.0, 3.0], 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 100.0).abs() < 1e-12);
        assert!((out[3].unwrap() - (100.0 - 100.0 / 3.0)).abs() < 1e-12);
    }
}
