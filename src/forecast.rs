// =============================================================================
// Forecast Engine — AR(5) on a once-differenced close series
// =============================================================================
//
// Equivalent of an ARIMA(5, 1, 0) fit with no trend term:
//
//   Step 1 — difference the closes once: y[t] = x[t+1] − x[t].
//   Step 2 — fit y[t] = Σ_{i=1..5} φ_i · y[t−i] by conditional least
//            squares: build the 5×5 normal equations AᵀA·φ = Aᵀb and solve
//            by Gaussian elimination with partial pivoting.
//   Step 3 — project `horizon` steps by running the recursion on a lag
//            buffer, then integrate the predicted differences back onto
//            the last close.
//
// Forecast dates are consecutive calendar days after the last historical
// date — deliberately no trading-calendar awareness.
//
// Every failure mode (short series, singular system, non-finite numerics)
// is a value, never a panic; the caller degrades to a historical-only
// render.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Autoregressive order of the fit.
pub const AR_ORDER: usize = 5;

/// A fitted projection: `dates.len() == values.len() == horizon`, dates
/// immediately following the last historical date.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

/// Why a fit or projection failed. Data-dependent and non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ForecastError {
    /// The series is too short to estimate `AR_ORDER` coefficients.
    #[error("too few observations: need at least {needed}, got {got}")]
    TooFewObservations { needed: usize, got: usize },

    /// The normal equations are singular (e.g. a constant or perfectly
    /// linear price series leaves the lag matrix rank-deficient).
    #[error("normal equations are singular")]
    Singular,

    /// The input or an intermediate value is not finite.
    #[error("non-finite value encountered")]
    NonFinite,
}

/// Fit AR(5) on the once-differenced `closes` and project `horizon` steps.
///
/// `last_date` is the date of the final close; forecast dates run from
/// `last_date + 1 day` onward.
pub fn forecast(
    closes: &[f64],
    last_date: NaiveDate,
    horizon: usize,
) -> Result<Forecast, ForecastError> {
    // Need the system overdetermined: 2·AR_ORDER + 1 differences, hence
    // one more close.
    let needed = 2 * AR_ORDER + 2;
    if closes.len() < needed {
        return Err(ForecastError::TooFewObservations {
            needed,
            got: closes.len(),
        });
    }
    if closes.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::NonFinite);
    }

    // Step 1 — first difference.
    let diffs: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let m = diffs.len();

    // Step 2 — normal equations over rows t = AR_ORDER..m, predictors
    // diffs[t-1], ..., diffs[t-AR_ORDER].
    let mut gram = [[0.0_f64; AR_ORDER]; AR_ORDER];
    let mut rhs = [0.0_f64; AR_ORDER];
    for t in AR_ORDER..m {
        for i in 0..AR_ORDER {
            let xi = diffs[t - 1 - i];
            rhs[i] += xi * diffs[t];
            for j in 0..AR_ORDER {
                gram[i][j] += xi * diffs[t - 1 - j];
            }
        }
    }

    let phi = solve(gram, rhs)?;
    debug!(?phi, observations = m, "AR coefficients fitted");

    // Step 3 — recursive projection on the lag buffer (most recent first).
    let mut lags = [0.0_f64; AR_ORDER];
    for i in 0..AR_ORDER {
        lags[i] = diffs[m - 1 - i];
    }

    let mut values = Vec::with_capacity(horizon);
    let mut level = *closes.last().expect("length checked above");
    for _ in 0..horizon {
        let step: f64 = (0..AR_ORDER).map(|i| phi[i] * lags[i]).sum();
        if !step.is_finite() {
            return Err(ForecastError::NonFinite);
        }
        level += step;
        values.push(level);

        lags.rotate_right(1);
        lags[0] = step;
    }

    let dates = (1..=horizon as i64)
        .map(|k| last_date + chrono::Duration::days(k))
        .collect();

    Ok(Forecast { dates, values })
}

/// Solve the dense `AR_ORDER`-sized linear system by Gaussian elimination
/// with partial pivoting.
fn solve(
    mut a: [[f64; AR_ORDER]; AR_ORDER],
    mut b: [f64; AR_ORDER],
) -> Result<[f64; AR_ORDER], ForecastError> {
    const N: usize = AR_ORDER;

    // Relative pivot tolerance scaled by the largest matrix entry.
    let scale = a
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if !scale.is_finite() {
        return Err(ForecastError::NonFinite);
    }
    let tol = scale.max(1.0) * 1e-12;

    for col in 0..N {
        // Partial pivot: largest magnitude in the remaining column.
        let mut pivot_row = col;
        for row in (col + 1)..N {
            if a[row][col].abs() > a[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        if a[pivot_row][col].abs() < tol {
            return Err(ForecastError::Singular);
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution.
    let mut x = [0.0_f64; N];
    for col in (0..N).rev() {
        let mut acc = b[col];
        for k in (col + 1)..N {
            acc -= a[col][k] * x[k];
        }
        x[col] = acc / a[col][col];
        if !x[col].is_finite() {
            return Err(ForecastError::NonFinite);
        }
    }

    Ok(x)
}
