// =============================================================================
// FetchCoordinator — deduplicated background retrieval
// =============================================================================
//
// Retrieval runs in spawned tasks that never touch shared state: each task
// computes a `FetchOutcome` and sends it over an mpsc channel. The control
// task drains the channel and applies outcomes through `apply`, so every
// store mutation happens on one task.
//
// Coalescing: a `request` for a symbol already in `Fetching` returns
// immediately. At most one retrieval per symbol is in flight, which also
// guarantees per-symbol completion ordering.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::market_data::series::OhlcvSeries;
use crate::market_data::store::TimeSeriesStore;
use crate::types::FetchError;

/// Contract for a historical market-data provider.
///
/// Implementations fetch daily OHLCV bars for `[start, end]`. An unknown
/// symbol is signalled either as `Err(FetchError::NoData)` or as an empty
/// series — the coordinator treats both the same way.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<OhlcvSeries, FetchError>;
}

/// Result of one background retrieval, delivered over the completion
/// channel to the control task.
#[derive(Debug)]
pub struct FetchOutcome {
    pub symbol: String,
    /// Generation assigned when the fetch was launched; mismatches against
    /// the record mean this outcome was superseded.
    pub generation: u64,
    pub range: (NaiveDate, NaiveDate),
    pub result: Result<OhlcvSeries, FetchError>,
}

/// Schedules background retrievals and applies their completions.
#[derive(Clone)]
pub struct FetchCoordinator {
    store: Arc<TimeSeriesStore>,
    source: Arc<dyn DataSource>,
    completions: mpsc::UnboundedSender<FetchOutcome>,
}

impl FetchCoordinator {
    /// Build a coordinator. The returned receiver is the completion
    /// channel; the control task owns it and feeds each outcome back into
    /// [`FetchCoordinator::apply`].
    pub fn new(
        store: Arc<TimeSeriesStore>,
        source: Arc<dyn DataSource>,
    ) -> (Self, mpsc::UnboundedReceiver<FetchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                source,
                completions: tx,
            },
            rx,
        )
    }

    /// Launch a background fetch for `symbol` unless one is already in
    /// flight (in which case the call coalesces and returns immediately).
    ///
    /// Never fails synchronously; failures land on the record and are
    /// observed by polling `TimeSeriesStore::get`.
    pub fn request(&self, symbol: &str, start: NaiveDate, end: NaiveDate) {
        let generation = match self.store.mark_fetching(symbol) {
            Some(g) => g,
            None => {
                debug!(symbol, "fetch already in flight — request coalesced");
                return;
            }
        };

        info!(symbol, %start, %end, generation, "fetch scheduled");

        let source = self.source.clone();
        let completions = self.completions.clone();
        let symbol = symbol.to_string();
        tokio::spawn(async move {
            let result = source.fetch(&symbol, start, end).await;
            let outcome = FetchOutcome {
                symbol,
                generation,
                range: (start, end),
                result,
            };
            // The receiver only drops at shutdown; a send error then is
            // harmless.
            let _ = completions.send(outcome);
        });
    }

    /// Fire one `request` per symbol. Failures stay independent and
    /// per-symbol; partial success is the expected outcome.
    pub fn request_batch(&self, symbols: &[String], start: NaiveDate, end: NaiveDate) {
        for symbol in symbols {
            self.request(symbol, start, end);
        }
    }

    /// Apply one completed fetch to the store. Control task only.
    pub fn apply(&self, outcome: FetchOutcome) {
        let symbol = outcome.symbol.as_str();

        // Superseded result: a newer fetch owns the record now.
        if let Some(record) = self.store.get(symbol) {
            if record.generation != outcome.generation {
                debug!(
                    symbol,
                    stale = outcome.generation,
                    current = record.generation,
                    "stale fetch result discarded"
                );
                return;
            }
        }

        match outcome.result {
            Ok(series) if series.is_empty() => {
                warn!(symbol, "data source returned an empty table");
                self.store.mark_failed(symbol, FetchError::NoData);
            }
            Ok(series) => {
                info!(symbol, rows = series.len(), "fetch complete");
                self.store.upsert(symbol, series, outcome.range);
                self.store.mark_ready(symbol);
            }
            Err(err) => {
                warn!(symbol, error = %err, "fetch failed");
                self.store.mark_failed(symbol, err);
            }
        }
    }
}
