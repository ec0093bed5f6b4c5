// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd_line   = EMA(close, fast) − EMA(close, slow)
//   signal_line = EMA(macd_line, signal)
//   histogram   = macd_line − signal_line
//
// Built on the span-EMA seeded from the first value, so all three series
// are defined from index 0 (no warm-up gap). They are still returned in the
// aligned `Option` shape every derived series uses.

use crate::indicators::ema::ema;
use crate::indicators::DerivedSeries;

/// The MACD line, its signal line, and their difference, each aligned 1:1
/// with the input.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub macd: DerivedSeries,
    pub signal: DerivedSeries,
    pub histogram: DerivedSeries,
}

/// Compute MACD over `values` with the given EMA spans.
///
/// # Edge cases
/// - empty input or any zero span => all three series empty
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    if values.is_empty() || fast == 0 || slow == 0 || signal == 0 {
        return MacdSeries {
            macd: Vec::new(),
            signal: Vec::new(),
            histogram: Vec::new(),
        };
    }

    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal);

    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some(m - s))
        .collect();

    MacdSeries {
        macd: macd_line.into_iter().map(Some).collect(),
        signal: signal_line.into_iter().map(Some).collect(),
        histogram,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_empty_input() {
        let m = macd(&[], 12, 26, 9);
        assert!(m.macd.is_empty() && m.signal.is_empty() && m.histogram.is_empty());
    }

    #[test]
    fn macd_zero_span_guard() {
        let m = macd(&[1.0, 2.0], 0, 26, 9);
        assert!(m.macd.is_empty());
    }

    #[test]
    fn macd_aligned_and_fully_defined() {
        let values: Vec<f64> = (1..=60).map(|x| x as f64).collect();
        let m = macd(&values, 12, 26, 9);
        assert_eq!(m.macd.len(), 60);
        assert_eq!(m.signal.len(), 60);
        assert_eq!(m.histogram.len(), 60);
        assert!(m.macd.iter().all(Option::is_some));
        assert!(m.signal.iter().all(Option::is_some));
    }

    #[test]
    fn macd_starts_at_zero() {
        // Both EMAs seed with the first value, so the MACD line starts at 0.
        let values: Vec<f64> = (1..=40).map(|x| x as f64 * 1.7).collect();
        let m = macd(&values, 12, 26, 9);
        assert!(m.macd[0].unwrap().abs() < 1e-12);
        assert!(m.signal[0].unwrap().abs() < 1e-12);
    }

    #[test]
    fn macd_positive_in_sustained_uptrend() {
        // Fast EMA sits above slow EMA once an uptrend establishes.
        let values: Vec<f64> = (1..=120).map(|x| x as f64).collect();
        let m = macd(&values, 12, 26, 9);
        assert!(m.macd.last().unwrap().unwrap() > 0.0);
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let values: Vec<f64> = (1..=50).map(|x| (x as f64 * 0.3).sin() * 10.0 + 100.0).collect();
        let m = macd(&values, 12, 26, 9);
        for i in 0..values.len() {
            let expected = m.macd[i].unwrap() - m.signal[i].unwrap();
            assert!((m.histogram[i].unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn macd_flat_series_is_zero_everywhere() {
        let values = vec![55.5; 40];
        let m = macd(&values, 12, 26, 9);
        for i in 0..values.len() {
            assert!(m.macd[i].unwrap().abs() < 1e-12);
            assert!(m.histogram[i].unwrap().abs() < 1e-12);
        }
    }
}
