// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free transforms of a price/volume series into derived
// series. Every function returns a series aligned 1:1 with its input date
// index; warm-up positions (insufficient trailing history) are `None`, so
// downstream consumers can tell "no signal yet" from "signal is zero".

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod returns;
pub mod rsi;
pub mod sma;

/// A named, date-aligned numeric sequence. `None` marks warm-up positions.
pub type DerivedSeries = Vec<Option<f64>>;
