// =============================================================================
// Shared types used across the TickerScope analytics core
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a ticker's cached data.
///
/// `Idle → Fetching → Ready | Failed`. A record re-enters `Fetching` on
/// every refresh (e.g. a period change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Ready,
    Failed,
}

impl Default for FetchStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Fetching => write!(f, "Fetching"),
            Self::Ready => write!(f, "Ready"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Which chart the presentation layer has asked for.
///
/// Dispatch in the orchestrator is an exhaustive match on this enum —
/// adding a variant forces every handler site to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartMode {
    Price,
    PriceWithMa,
    Volume,
    Returns,
    Technical,
    Forecast,
}

impl Default for ChartMode {
    fn default() -> Self {
        Self::Price
    }
}

impl std::fmt::Display for ChartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Price => write!(f, "Price"),
            Self::PriceWithMa => write!(f, "Price with MA"),
            Self::Volume => write!(f, "Volume"),
            Self::Returns => write!(f, "Returns"),
            Self::Technical => write!(f, "Technical"),
            Self::Forecast => write!(f, "Forecast"),
        }
    }
}

/// Historical look-back period selectable from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "6m")]
    M6,
    #[serde(rename = "1y")]
    Y1,
    #[serde(rename = "2y")]
    Y2,
    #[serde(rename = "5y")]
    Y5,
    #[serde(rename = "max")]
    Max,
}

impl Default for Period {
    fn default() -> Self {
        Self::Y1
    }
}

impl Period {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M3 => "3m",
            Self::M6 => "6m",
            Self::Y1 => "1y",
            Self::Y2 => "2y",
            Self::Y5 => "5y",
            Self::Max => "max",
        }
    }

    /// Number of calendar days of history this period covers, or `None`
    /// for `Max` (which starts at the UNIX epoch).
    pub const fn days(self) -> Option<i64> {
        match self {
            Self::M1 => Some(30),
            Self::M3 => Some(90),
            Self::M6 => Some(180),
            Self::Y1 => Some(365),
            Self::Y2 => Some(730),
            Self::Y5 => Some(1825),
            Self::Max => None,
        }
    }

    /// Resolve this period to a concrete `(start, end)` date range given
    /// the desired end date.
    ///
    /// `Max` anchors at 1970-01-01 regardless of `end`.
    pub fn date_range(self, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self.days() {
            Some(days) => end - chrono::Duration::days(days),
            None => NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch is a valid date"),
        };
        (start, end)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::M1),
            "3m" => Ok(Self::M3),
            "6m" => Ok(Self::M6),
            "1y" => Ok(Self::Y1),
            "2y" => Ok(Self::Y2),
            "5y" => Ok(Self::Y5),
            "max" => Ok(Self::Max),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// Why a retrieval for a symbol failed.
///
/// Stored on the `TickerRecord` and surfaced when the orchestrator next
/// reads that record — never thrown across the async boundary, so the
/// type stays `Clone` and cheap to copy into snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FetchError {
    /// The data source answered but returned zero rows. The usual cause
    /// is a symbol the provider does not know.
    #[error("no data returned for symbol")]
    NoData,

    /// Transport failure, timeout, or a provider-side error response.
    #[error("network error: {0}")]
    Network(String),
}
