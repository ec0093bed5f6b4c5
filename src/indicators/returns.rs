// =============================================================================
// Return series — daily and cumulative
// =============================================================================
//
//   daily[i]      = price[i] / price[i-1] − 1          (undefined at i = 0)
//   cumulative[i] = Π_{j<=i} (1 + daily[j]) − 1        (undefined at i = 0)
//
// The cumulative product telescopes, so with no missing points
// (1 + cumulative[n-1]) · price[0] == price[n-1] up to floating error.

use crate::indicators::DerivedSeries;

/// Daily and cumulative return series, each aligned 1:1 with the input.
#[derive(Debug, Clone)]
pub struct ReturnSeries {
    pub daily: DerivedSeries,
    pub cumulative: DerivedSeries,
}

/// Compute daily and cumulative returns over `values`.
///
/// # Edge cases
/// - empty input => both series empty
/// - single point => both series `[None]` (no prior price to compare)
pub fn returns(values: &[f64]) -> ReturnSeries {
    let mut daily: DerivedSeries = vec![None; values.len()];
    let mut cumulative: DerivedSeries = vec![None; values.len()];

    let mut running = 1.0;
    for i in 1..values.len() {
        let r = values[i] / values[i - 1] - 1.0;
        daily[i] = Some(r);
        running *= 1.0 + r;
        cumulative[i] = Some(running - 1.0);
    }

    ReturnSeries { daily, cumulative }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_empty_input() {
        let r = returns(&[]);
        assert!(r.daily.is_empty() && r.cumulative.is_empty());
    }

    #[test]
    fn returns_single_point_is_undefined() {
        let r = returns(&[100.0]);
        assert_eq!(r.daily, vec![None]);
        assert_eq!(r.cumulative, vec![None]);
    }

    #[test]
    fn daily_returns_known_values() {
        let r = returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.daily[0], None);
        assert!((r.daily[1].unwrap() - 0.10).abs() < 1e-12);
        assert!((r.daily[2].unwrap() - (-0.10)).abs() < 1e-12);
    }

    #[test]
    fn cumulative_is_product_of_daily() {
        let values = vec![100.0, 103.0, 101.5, 108.2, 95.0];
        let r = returns(&values);
        let mut product = 1.0;
        for i in 1..values.len() {
            product *= 1.0 + r.daily[i].unwrap();
            assert!((r.cumulative[i].unwrap() - (product - 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn cumulative_roundtrips_to_raw_prices() {
        // (1 + cumulative[n-1]) * values[0] ≈ values[n-1]
        let values = vec![50.0, 51.3, 49.8, 52.6, 53.1, 50.2, 55.7];
        let r = returns(&values);
        let reconstructed = (1.0 + r.cumulative.last().unwrap().unwrap()) * values[0];
        assert!((reconstructed - values.last().unwrap()).abs() < 1e-9);
    }
}
