pub mod fetch;
pub mod series;
pub mod store;

// Re-export the core shapes for convenient access (e.g. `use crate::market_data::OhlcvSeries`).
pub use fetch::{DataSource, FetchCoordinator, FetchOutcome};
pub use series::{OhlcvRow, OhlcvSeries};
pub use store::{TickerRecord, TimeSeriesStore};
