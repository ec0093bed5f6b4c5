// =============================================================================
// OHLCV series — the canonical historical data shape
// =============================================================================
//
// One row per trading date, strictly increasing by date with no duplicates.
// Construction enforces ordering and uniqueness; the high/low envelope
// (high >= max(open, close), low <= min(open, close)) is a data-source
// contract and is not re-checked here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// An owned, date-ordered OHLCV series for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcvSeries {
    rows: Vec<OhlcvRow>,
}

impl OhlcvSeries {
    /// Build a series from unordered rows.
    ///
    /// Rows are sorted by date; on duplicate dates the last row wins
    /// (providers occasionally resend the most recent bar).
    pub fn from_rows(mut rows: Vec<OhlcvRow>) -> Self {
        rows.sort_by_key(|r| r.date);
        rows.dedup_by(|next, prev| {
            if next.date == prev.date {
                // `dedup_by` drops `next`; keep its values in `prev` so the
                // later row wins.
                *prev = next.clone();
                true
            } else {
                false
            }
        });
        Self { rows }
    }

    pub fn rows(&self) -> &[OhlcvRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Date index, oldest first. Derived series align 1:1 with this.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    /// Traded volumes, oldest first.
    pub fn volumes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.volume).collect()
    }

    /// The most recent date in the series, if any.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }
}
