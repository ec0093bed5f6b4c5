// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle band = SMA(window), upper/lower = middle ± k·rolling_std(window).
// All three bands share the SMA's warm-up: the first `window - 1` positions
// are `None`.

use crate::indicators::sma::{moving_average, rolling_std};
use crate::indicators::DerivedSeries;

/// The three Bollinger band series, each aligned 1:1 with the input.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub middle: DerivedSeries,
    pub upper: DerivedSeries,
    pub lower: DerivedSeries,
}

/// Compute Bollinger Bands over `values` with the given `window` and band
/// width `k` (in standard deviations).
///
/// # Edge cases
/// - `window < 2` or too little data => all positions `None` in every band
/// - a flat window collapses upper and lower onto the middle band
pub fn bollinger_bands(values: &[f64], window: usize, k: f64) -> BollingerBands {
    let middle = moving_average(values, window);
    let std = rolling_std(values, window);

    let upper = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m + k * s),
            _ => None,
        })
        .collect();
    let lower = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - k * s),
            _ => None,
        })
        .collect();

    BollingerBands { middle, upper, lower }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_share_warmup_with_sma() {
        let values: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let bb = bollinger_bands(&values, 20, 2.0);
        for band in [&bb.middle, &bb.upper, &bb.lower] {
            assert_eq!(band.len(), 30);
            assert_eq!(band.iter().take_while(|v| v.is_none()).count(), 19);
        }
    }

    #[test]
    fn bands_order_upper_middle_lower() {
        let values = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89,
            46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13, 44.01, 43.50, 42.80, 44.90,
        ];
        let bb = bollinger_bands(&values, 20, 2.0);
        for i in 0..values.len() {
            if let (Some(u), Some(m), Some(l)) = (bb.upper[i], bb.middle[i], bb.lower[i]) {
                assert!(u > m && m > l, "band order violated at {i}");
            }
        }
    }

    #[test]
    fn flat_series_collapses_bands() {
        let values = vec![100.0; 25];
        let bb = bollinger_bands(&values, 20, 2.0);
        let last = values.len() - 1;
        assert!((bb.upper[last].unwrap() - 100.0).abs() < 1e-10);
        assert!((bb.lower[last].unwrap() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn band_width_scales_with_k() {
        let values: Vec<f64> = (1..=25).map(|x| (x as f64).sin() * 5.0 + 50.0).collect();
        let narrow = bollinger_bands(&values, 20, 1.0);
        let wide = bollinger_bands(&values, 20, 2.0);
        let last = values.len() - 1;
        let narrow_span = narrow.upper[last].unwrap() - narrow.lower[last].unwrap();
        let wide_span = wide.upper[last].unwrap() - wide.lower[last].unwrap();
        assert!((wide_span - 2.0 * narrow_span).abs() < 1e-10);
    }

    #[test]
    fn insufficient_data_is_all_none() {
        let bb = bollinger_bands(&[1.0, 2.0, 3.0], 20, 2.0);
        assert!(bb.middle.iter().all(Option::is_none));
        assert!(bb.upper.iter().all(Option::is_none));
        assert!(bb.lower.iter().all(Option::is_none));
    }
}
