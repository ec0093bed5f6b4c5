// =============================================================================
// TimeSeriesStore — per-symbol cache of historical data and fetch status
// =============================================================================
//
// The single shared mutable resource of the engine. Records are handed out
// as `Arc` snapshots; every mutation builds a fresh record and swaps the
// whole `Arc`, so readers observe either the old or the new record in full,
// never a partially written one.
//
// Mutation discipline: only the control task (the coordinator's completion
// application) writes to a given symbol's record. The `RwLock` guards the
// map itself; the `Arc` swap guards the record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use crate::market_data::series::OhlcvSeries;
use crate::types::{FetchError, FetchStatus};

/// Cached state for one ticker symbol.
///
/// Created on first fetch request and kept for the process lifetime.
#[derive(Debug, Clone)]
pub struct TickerRecord {
    pub symbol: String,
    /// Historical data, absent until the first successful fetch.
    pub series: Option<OhlcvSeries>,
    /// The `(start, end)` range the series was fetched for.
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub status: FetchStatus,
    /// The most recent failure, cleared on the next successful fetch.
    pub last_error: Option<FetchError>,
    /// Bumped by `mark_fetching`; completions carrying an older generation
    /// are stale and get discarded by the coordinator.
    pub generation: u64,
}

impl TickerRecord {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            series: None,
            range: None,
            status: FetchStatus::Idle,
            last_error: None,
            generation: 0,
        }
    }
}

/// Symbol → record map behind snapshot-swap semantics.
#[derive(Default)]
pub struct TimeSeriesStore {
    records: RwLock<HashMap<String, Arc<TickerRecord>>>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking snapshot of a symbol's record.
    pub fn get(&self, symbol: &str) -> Option<Arc<TickerRecord>> {
        self.records.read().get(symbol).cloned()
    }

    /// Replace a record's series and range in one atomic swap.
    ///
    /// Creates the record if the symbol is unknown (a completion can race
    /// process startup in tests). Status is untouched — callers pair this
    /// with `mark_ready`.
    pub fn upsert(&self, symbol: &str, series: OhlcvSeries, range: (NaiveDate, NaiveDate)) {
        let mut map = self.records.write();
        let current = map
            .get(symbol)
            .map(|r| r.as_ref().clone())
            .unwrap_or_else(|| TickerRecord::new(symbol));

        let rows = series.len();
        let mut next = current;
        next.series = Some(series);
        next.range = Some(range);
        map.insert(symbol.to_string(), Arc::new(next));

        debug!(symbol, rows, "series upserted");
    }

    /// Transition a symbol to `Fetching` and bump its generation.
    ///
    /// Returns the new generation, or `None` when a fetch is already in
    /// flight — the caller must coalesce instead of launching a duplicate.
    pub fn mark_fetching(&self, symbol: &str) -> Option<u64> {
        let mut map = self.records.write();
        let current = map
            .get(symbol)
            .map(|r| r.as_ref().clone())
            .unwrap_or_else(|| TickerRecord::new(symbol));

        if current.status == FetchStatus::Fetching {
            return None;
        }

        let mut next = current;
        next.status = FetchStatus::Fetching;
        next.generation += 1;
        let generation = next.generation;
        map.insert(symbol.to_string(), Arc::new(next));
        Some(generation)
    }

    /// Transition a symbol to `Ready` and clear any recorded error.
    pub fn mark_ready(&self, symbol: &str) {
        self.transition(symbol, |rec| {
            rec.status = FetchStatus::Ready;
            rec.last_error = None;
        });
    }

    /// Transition a symbol to `Failed`, recording the error for display.
    pub fn mark_failed(&self, symbol: &str, error: FetchError) {
        self.transition(symbol, |rec| {
            rec.status = FetchStatus::Failed;
            rec.last_error = Some(error);
        });
    }

    /// Symbols that have (or once had) data, sorted ascending. Populates
    /// selection controls; symbols that never loaded successfully are
    /// excluded.
    pub fn known_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .records
            .read()
            .values()
            .filter(|r| r.series.is_some())
            .map(|r| r.symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    fn transition(&self, symbol: &str, apply: impl FnOnce(&mut TickerRecord)) {
        let mut map = self.records.write();
        let current = map
            .get(symbol)
            .map(|r| r.as_ref().clone())
            .unwrap_or_else(|| TickerRecord::new(symbol));

        let mut next = current;
        apply(&mut next);
        debug!(symbol = %next.symbol, status = %next.status, "record transition");
        map.insert(symbol.to_string(), Arc::new(next));
    }
}
