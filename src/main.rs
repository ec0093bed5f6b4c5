// =============================================================================
// TickerScope — Main Entry Point
// =============================================================================
//
// Headless bootstrap of the analytics core: load config, fetch the
// watchlist, wait for completions, then log a render-bundle summary for
// each chart mode of the active symbol. A chart front-end consumes the
// same orchestrator API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod config;
mod forecast;
mod indicators;
mod market_data;
mod orchestrator;
mod sources;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::RuntimeConfig;
use crate::market_data::{FetchCoordinator, TimeSeriesStore};
use crate::orchestrator::AnalyticsOrchestrator;
use crate::sources::YahooChartSource;
use crate::types::ChartMode;

/// How long to wait for the watchlist to settle before summarising.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║              TickerScope — Starting Up                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load("tickerscope.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Extra watchlist symbols from env, persisted for next run.
    if let Ok(syms) = std::env::var("TICKERSCOPE_SYMBOLS") {
        let mut changed = false;
        for sym in syms.split(',') {
            let sym = sym.trim().to_uppercase();
            if !sym.is_empty() && !config.symbols.contains(&sym) {
                config.symbols.push(sym);
                changed = true;
            }
        }
        if changed {
            if let Err(e) = config.save("tickerscope.json") {
                warn!(error = %e, "Failed to persist updated watchlist");
            }
        }
    }

    info!(symbols = ?config.symbols, period = %config.default_period, "Configured watchlist");

    // ── 2. Build store, data source, coordinator ─────────────────────────
    let store = Arc::new(TimeSeriesStore::new());
    let source = Arc::new(YahooChartSource::new());
    let (coordinator, completions) = FetchCoordinator::new(store.clone(), source);

    let mut orchestrator =
        AnalyticsOrchestrator::new(store.clone(), coordinator, completions, config.clone());

    // ── 3. Fetch the watchlist and wait for it to settle ─────────────────
    orchestrator.fetch_watchlist();

    let mut pending = config.symbols.len();
    while pending > 0 {
        match tokio::time::timeout(SETTLE_TIMEOUT, orchestrator.next_completion()).await {
            Ok(true) => pending -= 1,
            Ok(false) => break,
            Err(_) => {
                warn!(pending, "Timed out waiting for watchlist fetches");
                break;
            }
        }
    }

    for symbol in &config.symbols {
        if let Some(record) = store.get(symbol) {
            info!(
                symbol = %symbol,
                status = %record.status,
                rows = record.series.as_ref().map(|s| s.len()).unwrap_or(0),
                "watchlist entry"
            );
        }
    }

    // ── 4. Summarise every chart mode for the active symbol ──────────────
    let modes = [
        ChartMode::Price,
        ChartMode::PriceWithMa,
        ChartMode::Volume,
        ChartMode::Returns,
        ChartMode::Technical,
        ChartMode::Forecast,
    ];

    for mode in modes {
        orchestrator.select_chart_mode(mode);
        orchestrator.drain_completions();

        let Some(bundle) = orchestrator.build_bundle() else {
            warn!("no active symbol — nothing to render");
            break;
        };

        if let Some(err) = &bundle.error {
            warn!(symbol = %bundle.symbol, mode = %mode, error = %err, "bundle carries error");
            continue;
        }

        info!(
            symbol = %bundle.symbol,
            mode = %mode,
            points = bundle.dates.len(),
            series = bundle.series.len(),
            forecast = bundle.forecast.as_ref().map(|f| f.values.len()).unwrap_or(0),
            notice = bundle.notice.as_deref().unwrap_or("-"),
            "render bundle ready"
        );
    }

    info!("TickerScope shutdown complete");
    Ok(())
}
