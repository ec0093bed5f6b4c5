// =============================================================================
// Analytics Orchestrator — intents in, render bundles out
// =============================================================================
//
// Holds the UI-facing state triple `(active_symbol, chart_mode, period)`.
// Intents mutate that state and, where data is missing or stale, schedule
// fetches through the coordinator. Once a record is `Ready`,
// `build_bundle` dispatches on the chart mode, runs the indicator and
// forecast engines, and returns a render-ready bundle.
//
// This type lives on the control task: it owns the completion receiver and
// is the only caller of `FetchCoordinator::apply`, so all store mutation
// funnels through one place.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::forecast::{self, Forecast};
use crate::indicators::bollinger::bollinger_bands;
use crate::indicators::macd::macd;
use crate::indicators::returns::returns;
use crate::indicators::rsi::rsi;
use crate::indicators::sma::moving_average;
use crate::indicators::DerivedSeries;
use crate::market_data::fetch::{FetchCoordinator, FetchOutcome};
use crate::market_data::store::TimeSeriesStore;
use crate::types::{ChartMode, FetchError, FetchStatus, Period};

/// Everything the presentation layer needs to draw one chart.
///
/// When `status` is `Failed`, `error` carries the reason and the series
/// map is empty. A forecast failure leaves the mode as `Forecast` with
/// `forecast: None` and a user-visible `notice`.
#[derive(Debug, Clone, Serialize)]
pub struct RenderBundle {
    pub symbol: String,
    pub chart_mode: ChartMode,
    pub status: FetchStatus,
    /// Date index every series in `series` aligns to, oldest first.
    pub dates: Vec<NaiveDate>,
    pub series: BTreeMap<String, DerivedSeries>,
    pub forecast: Option<Forecast>,
    pub notice: Option<String>,
    pub error: Option<FetchError>,
}

impl RenderBundle {
    fn shell(symbol: &str, chart_mode: ChartMode, status: FetchStatus) -> Self {
        Self {
            symbol: symbol.to_string(),
            chart_mode,
            status,
            dates: Vec::new(),
            series: BTreeMap::new(),
            forecast: None,
            notice: None,
            error: None,
        }
    }
}

/// The control-task hub tying store, coordinator, and engines together.
pub struct AnalyticsOrchestrator {
    store: Arc<TimeSeriesStore>,
    coordinator: FetchCoordinator,
    completions: mpsc::UnboundedReceiver<FetchOutcome>,
    config: RuntimeConfig,
    active_symbol: Option<String>,
    chart_mode: ChartMode,
    period: Period,
    range: (NaiveDate, NaiveDate),
}

impl AnalyticsOrchestrator {
    pub fn new(
        store: Arc<TimeSeriesStore>,
        coordinator: FetchCoordinator,
        completions: mpsc::UnboundedReceiver<FetchOutcome>,
        config: RuntimeConfig,
    ) -> Self {
        let period = config.default_period;
        let range = period.date_range(Utc::now().date_naive());
        Self {
            store,
            coordinator,
            completions,
            config,
            active_symbol: None,
            chart_mode: ChartMode::default(),
            period,
            range,
        }
    }

    pub fn active_symbol(&self) -> Option<&str> {
        self.active_symbol.as_deref()
    }

    pub fn chart_mode(&self) -> ChartMode {
        self.chart_mode
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        self.range
    }

    /// Symbols available for the selection control, sorted. Only symbols
    /// with loaded data appear; failed ones are retried via `add_symbol`.
    pub fn known_symbols(&self) -> Vec<String> {
        self.store.known_symbols()
    }

    /// Fetch the configured watchlist for the current range.
    pub fn fetch_watchlist(&mut self) {
        let symbols = self.config.symbols.clone();
        info!(count = symbols.len(), "fetching watchlist");
        let (start, end) = self.range;
        self.coordinator.request_batch(&symbols, start, end);
        if self.active_symbol.is_none() {
            self.active_symbol = symbols.first().cloned();
        }
    }

    /// Activate an already-known symbol. Returns false when the store has
    /// never seen it (the selection control only offers known symbols).
    pub fn select_symbol(&mut self, symbol: &str) -> bool {
        if self.store.get(symbol).is_none() {
            return false;
        }
        debug!(symbol, "symbol selected");
        self.active_symbol = Some(symbol.to_string());
        true
    }

    /// Add a user-entered symbol: trim, uppercase, reject empty or
    /// malformed input.
    ///
    /// An already-cached symbol is just activated; a new or previously
    /// failed one becomes active and gets a fetch for the current range,
    /// so a transient failure can be retried by re-adding the ticker.
    pub fn add_symbol(&mut self, raw: &str) -> Result<String> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("ticker symbol must not be empty");
        }
        // The symbol lands in a URL path segment; restrict it to the
        // characters real tickers use (BRK-B, ^GSPC, EURUSD=X, BF.B).
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
        {
            bail!("ticker symbol contains invalid characters: {symbol}");
        }

        self.active_symbol = Some(symbol.clone());
        let needs_fetch = match self.store.get(&symbol) {
            None => true,
            Some(record) => record.status == FetchStatus::Failed,
        };
        if needs_fetch {
            let (start, end) = self.range;
            self.coordinator.request(&symbol, start, end);
        }
        Ok(symbol)
    }

    pub fn select_chart_mode(&mut self, mode: ChartMode) {
        debug!(mode = %mode, "chart mode selected");
        self.chart_mode = mode;
    }

    /// Change the look-back period: recompute the date range and refresh
    /// the active symbol for it.
    pub fn select_period(&mut self, period: Period) {
        self.period = period;
        self.range = period.date_range(Utc::now().date_naive());
        info!(period = %period, start = %self.range.0, end = %self.range.1, "period selected");

        if let Some(symbol) = self.active_symbol.clone() {
            let (start, end) = self.range;
            self.coordinator.request(&symbol, start, end);
        }
    }

    /// Apply every completion already queued, without blocking.
    pub fn drain_completions(&mut self) {
        while let Ok(outcome) = self.completions.try_recv() {
            self.coordinator.apply(outcome);
        }
    }

    /// Wait for one completion and apply it. Returns false once the
    /// channel is closed (shutdown).
    pub async fn next_completion(&mut self) -> bool {
        match self.completions.recv().await {
            Some(outcome) => {
                self.coordinator.apply(outcome);
                true
            }
            None => false,
        }
    }

    /// Assemble the render bundle for the current `(symbol, mode)` state.
    ///
    /// `None` only when no symbol has ever been selected. A `Fetching` or
    /// `Idle` record yields a shell bundle whose status the UI can show.
    pub fn build_bundle(&self) -> Option<RenderBundle> {
        let symbol = self.active_symbol.as_deref()?;
        let record = match self.store.get(symbol) {
            Some(r) => r,
            None => return Some(RenderBundle::shell(symbol, self.chart_mode, FetchStatus::Idle)),
        };

        let mut bundle = RenderBundle::shell(symbol, self.chart_mode, record.status);

        if record.status == FetchStatus::Failed {
            bundle.error = record.last_error.clone();
            return Some(bundle);
        }

        let series = match (&record.status, &record.series) {
            (FetchStatus::Ready, Some(series)) if !series.is_empty() => series,
            _ => return Some(bundle),
        };

        bundle.dates = series.dates();
        let closes = series.closes();
        let defined = |v: &[f64]| -> DerivedSeries { v.iter().map(|&x| Some(x)).collect() };

        match self.chart_mode {
            ChartMode::Price => {
                bundle.series.insert("close".into(), defined(&closes));
            }
            ChartMode::PriceWithMa => {
                bundle.series.insert("close".into(), defined(&closes));
                for &window in &self.config.ma_windows {
                    bundle
                        .series
                        .insert(format!("ma{window}"), moving_average(&closes, window));
                }
            }
            ChartMode::Volume => {
                bundle.series.insert("volume".into(), defined(&series.volumes()));
            }
            ChartMode::Returns => {
                let r = returns(&closes);
                bundle.series.insert("daily_return".into(), r.daily);
                bundle.series.insert("cumulative_return".into(), r.cumulative);
            }
            ChartMode::Technical => {
                bundle.series.insert("close".into(), defined(&closes));
                bundle.series.insert("volume".into(), defined(&series.volumes()));

                let bb = bollinger_bands(&closes, self.config.bollinger_window, self.config.bollinger_k);
                bundle.series.insert("bb_middle".into(), bb.middle);
                bundle.series.insert("bb_upper".into(), bb.upper);
                bundle.series.insert("bb_lower".into(), bb.lower);

                bundle
                    .series
                    .insert("rsi".into(), rsi(&closes, self.config.rsi_window));

                let m = macd(
                    &closes,
                    self.config.macd_fast,
                    self.config.macd_slow,
                    self.config.macd_signal,
                );
                bundle.series.insert("macd".into(), m.macd);
                bundle.series.insert("macd_signal".into(), m.signal);
                bundle.series.insert("macd_histogram".into(), m.histogram);
            }
            ChartMode::Forecast => {
                bundle.series.insert("close".into(), defined(&closes));
                let last_date = series.last_date().expect("non-empty series has a last date");
                match forecast::forecast(&closes, last_date, self.config.forecast_horizon) {
                    Ok(fc) => bundle.forecast = Some(fc),
                    Err(err) => {
                        // Degrade to historical-only with an inline notice.
                        info!(symbol, error = %err, "forecast unavailable");
                        bundle.notice = Some(format!("Could not generate forecast: {err}"));
                    }
                }
            }
        }

        Some(bundle)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::fetch::DataSource;
    use crate::market_data::series::{OhlcvRow, OhlcvSeries};
    use async_trait::async_trait;

    /// Deterministic pseudo-random walk of daily bars ending in mid-2024.
    fn walk(symbol_seed: u64, n: usize) -> OhlcvSeries {
        let mut state = symbol_seed | 1;
        let mut level = 150.0;
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let rows = (0..n)
            .map(|i| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let unit = (state >> 33) as f64 / (1u64 << 31) as f64;
                level += unit - 0.48;
                OhlcvRow {
                    date: start + chrono::Duration::days(i as i64),
                    open: level - 0.5,
                    high: level + 1.0,
                    low: level - 1.0,
                    close: level,
                    volume: 1_000_000.0 + (state >> 40) as f64,
                }
            })
            .collect();
        OhlcvSeries::from_rows(rows)
    }

    /// 400 bars for AAPL, 3 bars for TINY, empty table for ZZZZ.
    struct FixtureSource;

    #[async_trait]
    impl DataSource for FixtureSource {
        async fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<OhlcvSeries, FetchError> {
            match symbol {
                "ZZZZ" => Ok(OhlcvSeries::from_rows(Vec::new())),
                "TINY" => Ok(walk(7, 3)),
                _ => Ok(walk(42, 400)),
            }
        }
    }

    fn orchestrator() -> AnalyticsOrchestrator {
        let store = Arc::new(TimeSeriesStore::new());
        let (coordinator, completions) = FetchCoordinator::new(store.clone(), Arc::new(FixtureSource));
        AnalyticsOrchestrator::new(store, coordinator, completions, RuntimeConfig::default())
    }

    /// Fetch one symbol and settle its completion.
    async fn load(orch: &mut AnalyticsOrchestrator, symbol: &str) {
        orch.add_symbol(symbol).unwrap();
        assert!(orch.next_completion().await);
    }

    #[tokio::test]
    async fn price_bundle_for_ready_symbol() {
        let mut orch = orchestrator();
        load(&mut orch, "AAPL").await;

        let bundle = orch.build_bundle().unwrap();
        assert_eq!(bundle.symbol, "AAPL");
        assert_eq!(bundle.status, FetchStatus::Ready);
        assert_eq!(bundle.dates.len(), 400);
        let close = &bundle.series["close"];
        assert_eq!(close.len(), 400);
        assert!(close.iter().all(Option::is_some));
        assert!(bundle.error.is_none());
    }

    #[tokio::test]
    async fn price_with_ma_warmups_match_windows() {
        let mut orch = orchestrator();
        load(&mut orch, "AAPL").await;
        orch.select_chart_mode(ChartMode::PriceWithMa);
        assert_eq!(orch.chart_mode(), ChartMode::PriceWithMa);

        let bundle = orch.build_bundle().unwrap();
        // 400 bars => MA(20) has 381 defined points.
        let ma20 = &bundle.series["ma20"];
        assert_eq!(ma20.iter().filter(|v| v.is_some()).count(), 381);
        let ma200 = &bundle.series["ma200"];
        assert_eq!(ma200.iter().filter(|v| v.is_some()).count(), 201);
    }

    #[tokio::test]
    async fn technical_bundle_rsi_within_range() {
        let mut orch = orchestrator();
        load(&mut orch, "AAPL").await;
        orch.select_chart_mode(ChartMode::Technical);

        let bundle = orch.build_bundle().unwrap();
        for key in [
            "close",
            "volume",
            "bb_middle",
            "bb_upper",
            "bb_lower",
            "rsi",
            "macd",
            "macd_signal",
            "macd_histogram",
        ] {
            assert!(bundle.series.contains_key(key), "missing series {key}");
            assert_eq!(bundle.series[key].len(), 400, "misaligned series {key}");
        }
        for v in bundle.series["rsi"].iter().flatten() {
            assert!((0.0..=100.0).contains(v), "RSI {v} out of range");
        }
    }

    #[tokio::test]
    async fn returns_bundle_roundtrips_prices() {
        let mut orch = orchestrator();
        load(&mut orch, "AAPL").await;
        orch.select_chart_mode(ChartMode::Returns);

        let bundle = orch.build_bundle().unwrap();
        let cumulative = bundle.series["cumulative_return"]
            .last()
            .unwrap()
            .unwrap();
        let closes = orch
            .store
            .get("AAPL")
            .unwrap()
            .series
            .as_ref()
            .unwrap()
            .closes();
        let reconstructed = (1.0 + cumulative) * closes[0];
        assert!((reconstructed - closes.last().unwrap()).abs() < 1e-6);
    }

    #[tokio::test]
    async fn forecast_bundle_has_horizon_dates_after_history() {
        let mut orch = orchestrator();
        load(&mut orch, "AAPL").await;
        orch.select_chart_mode(ChartMode::Forecast);

        let bundle = orch.build_bundle().unwrap();
        let fc = bundle.forecast.expect("forecast should fit on 400 bars");
        assert_eq!(fc.dates.len(), 30);
        let last_history = *bundle.dates.last().unwrap();
        assert_eq!(fc.dates[0], last_history + chrono::Duration::days(1));
        assert!(bundle.notice.is_none());
    }

    #[tokio::test]
    async fn forecast_failure_degrades_to_historical_only() {
        let mut orch = orchestrator();
        load(&mut orch, "TINY").await;
        orch.select_chart_mode(ChartMode::Forecast);

        let bundle = orch.build_bundle().unwrap();
        // Mode stays Forecast; forecast absent; close series still there.
        assert_eq!(bundle.chart_mode, ChartMode::Forecast);
        assert!(bundle.forecast.is_none());
        assert!(bundle.notice.as_ref().unwrap().contains("forecast"));
        assert_eq!(bundle.series["close"].len(), 3);
    }

    #[tokio::test]
    async fn failed_fetch_bundle_carries_error_and_no_series() {
        let mut orch = orchestrator();
        load(&mut orch, "ZZZZ").await;

        let bundle = orch.build_bundle().unwrap();
        assert_eq!(bundle.status, FetchStatus::Failed);
        assert_eq!(bundle.error, Some(FetchError::NoData));
        assert!(bundle.series.is_empty());
        assert!(bundle.dates.is_empty());
    }

    #[tokio::test]
    async fn bundle_while_fetching_is_a_status_shell() {
        let mut orch = orchestrator();
        orch.add_symbol("AAPL").unwrap();
        // Completion not yet applied.
        let bundle = orch.build_bundle().unwrap();
        assert_eq!(bundle.status, FetchStatus::Fetching);
        assert!(bundle.series.is_empty());

        assert!(orch.next_completion().await);
        assert_eq!(orch.build_bundle().unwrap().status, FetchStatus::Ready);
    }

    #[tokio::test]
    async fn add_symbol_normalises_input() {
        let mut orch = orchestrator();
        assert_eq!(orch.add_symbol("  aapl ").unwrap(), "AAPL");
        assert_eq!(orch.active_symbol(), Some("AAPL"));
        assert!(orch.add_symbol("   ").is_err());
    }

    #[tokio::test]
    async fn add_symbol_rejects_malformed_input() {
        let mut orch = orchestrator();
        assert!(orch.add_symbol("AAPL?range=5d").is_err());
        assert!(orch.add_symbol("A/B").is_err());
        assert!(orch.add_symbol("GOOG#").is_err());
        // Real ticker punctuation passes through.
        assert_eq!(orch.add_symbol("brk-b").unwrap(), "BRK-B");
        assert_eq!(orch.add_symbol("^gspc").unwrap(), "^GSPC");
    }

    #[tokio::test]
    async fn add_symbol_retries_after_failed_fetch() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        /// Fails the first call with a network error, serves data after.
        struct FlakySource {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl DataSource for FlakySource {
            async fn fetch(
                &self,
                _symbol: &str,
                _start: NaiveDate,
                _end: NaiveDate,
            ) -> Result<OhlcvSeries, FetchError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(FetchError::Network("connection reset".into()))
                } else {
                    Ok(walk(42, 400))
                }
            }
        }

        let store = Arc::new(TimeSeriesStore::new());
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let (coordinator, completions) = FetchCoordinator::new(store.clone(), source.clone());
        let mut orch =
            AnalyticsOrchestrator::new(store, coordinator, completions, RuntimeConfig::default());

        orch.add_symbol("AAPL").unwrap();
        assert!(orch.next_completion().await);
        assert_eq!(orch.store.get("AAPL").unwrap().status, FetchStatus::Failed);

        // Re-adding the failed symbol must launch a fresh fetch.
        orch.add_symbol("AAPL").unwrap();
        assert!(orch.next_completion().await);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(orch.store.get("AAPL").unwrap().status, FetchStatus::Ready);
        assert!(orch.store.get("AAPL").unwrap().last_error.is_none());
    }

    #[tokio::test]
    async fn add_known_symbol_activates_without_refetch() {
        let mut orch = orchestrator();
        load(&mut orch, "AAPL").await;
        load(&mut orch, "MSFT").await;

        orch.add_symbol("AAPL").unwrap();
        assert_eq!(orch.active_symbol(), Some("AAPL"));
        // No new fetch was scheduled for the cached symbol.
        orch.drain_completions();
        assert_eq!(orch.store.get("AAPL").unwrap().status, FetchStatus::Ready);
    }

    #[tokio::test]
    async fn select_symbol_requires_known_record() {
        let mut orch = orchestrator();
        assert!(!orch.select_symbol("AAPL"));
        load(&mut orch, "AAPL").await;
        assert!(orch.select_symbol("AAPL"));
    }

    #[tokio::test]
    async fn select_period_recomputes_range_and_refetches() {
        let mut orch = orchestrator();
        load(&mut orch, "AAPL").await;

        orch.select_period(Period::M6);
        assert_eq!(orch.period(), Period::M6);
        let (start, end) = orch.range();
        assert_eq!(end - start, chrono::Duration::days(180));
        // Refresh scheduled for the active symbol.
        assert_eq!(orch.store.get("AAPL").unwrap().status, FetchStatus::Fetching);

        assert!(orch.next_completion().await);
        assert_eq!(orch.store.get("AAPL").unwrap().status, FetchStatus::Ready);
    }

    #[tokio::test]
    async fn watchlist_fetch_defaults_active_to_first_symbol() {
        let mut orch = orchestrator();
        orch.fetch_watchlist();
        assert_eq!(orch.active_symbol(), Some("AAPL"));

        for _ in 0..orch.config.symbols.len() {
            assert!(orch.next_completion().await);
        }
        assert_eq!(orch.known_symbols().len(), 7);
    }
}
