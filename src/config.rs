// =============================================================================
// Runtime Configuration — watchlist and analytics parameters
// =============================================================================
//
// Central configuration for the TickerScope analytics core: the default
// watchlist, the default look-back period, and every indicator/forecast
// parameter in one place.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Period;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "AAPL".to_string(),
        "MSFT".to_string(),
        "GOOG".to_string(),
        "AMZN".to_string(),
        "TSLA".to_string(),
        "META".to_string(),
        "NVDA".to_string(),
    ]
}

fn default_ma_windows() -> Vec<usize> {
    vec![20, 50, 200]
}

fn default_rsi_window() -> usize {
    14
}

fn default_bollinger_window() -> usize {
    20
}

fn default_bollinger_k() -> f64 {
    2.0
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_forecast_horizon() -> usize {
    30
}

/// Tunable configuration, hot-loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Watchlist fetched at startup and offered in selection controls.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Look-back period applied until the user picks another one.
    #[serde(default)]
    pub default_period: Period,

    // --- Indicator parameters -----------------------------------------------

    /// Moving-average windows drawn in the "Price with MA" chart.
    #[serde(default = "default_ma_windows")]
    pub ma_windows: Vec<usize>,

    #[serde(default = "default_rsi_window")]
    pub rsi_window: usize,

    #[serde(default = "default_bollinger_window")]
    pub bollinger_window: usize,

    #[serde(default = "default_bollinger_k")]
    pub bollinger_k: f64,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    // --- Forecast parameters ------------------------------------------------

    /// Days projected ahead in the Forecast chart.
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            default_period: Period::default(),
            ma_windows: default_ma_windows(),
            rsi_window: default_rsi_window(),
            bollinger_window: default_bollinger_window(),
            bollinger_k: default_bollinger_k(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            forecast_horizon: default_forecast_horizon(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            period = %config.default_period,
            "config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "config saved (atomic)");
        Ok(())
    }
}
