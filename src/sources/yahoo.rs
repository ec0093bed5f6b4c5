// =============================================================================
// Yahoo Finance chart API — historical daily OHLCV source
// =============================================================================
//
// GET /v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d
//
// The chart endpoint is unsigned (no cookie/crumb dance — that is only
// required for quote and download endpoints). Yahoo answers unknown
// symbols with HTTP 404 and a "chart" error body; both that and a result
// with zero usable rows are reported as `FetchError::NoData`.
//
// Rows with null fields (market holidays, partial data) are skipped.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use tracing::{debug, warn};

use crate::market_data::fetch::DataSource;
use crate::market_data::series::{OhlcvRow, OhlcvSeries};
use crate::types::FetchError;

/// Historical data source backed by Yahoo Finance's chart API.
#[derive(Clone)]
pub struct YahooChartSource {
    base_url: String,
    client: reqwest::Client,
}

impl Default for YahooChartSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooChartSource {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            // Yahoo rejects requests without a browser-like user agent.
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            client,
        }
    }

    /// Override the endpoint host, for tests against a local server.
    #[cfg(test)]
    fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut source = Self::new();
        source.base_url = base_url.into();
        source
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc()
            .timestamp();
        // period2 is exclusive; push it one day past `end` so the end date
        // itself is included.
        let period2 = (end + chrono::Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight is a valid time")
            .and_utc()
            .timestamp();
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, symbol, period1, period2
        )
    }
}

#[async_trait]
impl DataSource for YahooChartSource {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<OhlcvSeries, FetchError> {
        let url = self.chart_url(symbol, start, end);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("GET chart request failed: {e}")))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Network(format!("failed to parse chart response: {e}")))?;

        // Unknown symbols come back as 404 with a chart error body.
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(symbol, "chart endpoint returned 404");
            return Err(FetchError::NoData);
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "chart endpoint returned {status}: {body}"
            )));
        }

        parse_chart_body(symbol, &body)
    }
}

/// Parse a chart API response body into an `OhlcvSeries`.
///
/// Split out from the transport so the parsing can be tested against
/// canned JSON bodies.
fn parse_chart_body(symbol: &str, body: &Value) -> Result<OhlcvSeries, FetchError> {
    let chart = &body["chart"];

    if !chart["error"].is_null() {
        // e.g. {"code":"Not Found","description":"No data found, ..."}
        debug!(symbol, error = %chart["error"], "chart error body");
        return Err(FetchError::NoData);
    }

    let result = match chart["result"].get(0) {
        Some(r) => r,
        None => return Err(FetchError::NoData),
    };

    let timestamps = result["timestamp"].as_array().cloned().unwrap_or_default();
    let quote = &result["indicators"]["quote"][0];

    let column = |name: &str| -> Vec<Value> { quote[name].as_array().cloned().unwrap_or_default() };
    let opens = column("open");
    let highs = column("high");
    let lows = column("low");
    let closes = column("close");
    let volumes = column("volume");

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let fields = (
            ts.as_i64(),
            opens.get(i).and_then(Value::as_f64),
            highs.get(i).and_then(Value::as_f64),
            lows.get(i).and_then(Value::as_f64),
            closes.get(i).and_then(Value::as_f64),
            volumes.get(i).and_then(Value::as_f64),
        );
        let (Some(ts), Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields
        else {
            warn!(symbol, index = i, "skipping row with missing fields");
            continue;
        };
        let date = match DateTime::from_timestamp(ts, 0) {
            Some(dt) => dt.date_naive(),
            None => {
                warn!(symbol, index = i, ts, "skipping row with invalid timestamp");
                continue;
            }
        };
        rows.push(OhlcvRow {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    debug!(symbol, rows = rows.len(), "chart body parsed");
    Ok(OhlcvSeries::from_rows(rows))
}
