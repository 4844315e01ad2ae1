// =============================================================================
// Shared types used across the comparison service
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Open time of the bar (UTC).
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `high >= max(open, close)` and `low <= min(open, close)`.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }
}

/// Chronologically ordered, immutable sequence of bars.
///
/// Construction goes through [`OhlcvSeries::new`], which rejects duplicate or
/// out-of-order timestamps and bars whose high/low do not bracket the body.
/// An empty series is allowed here; the indicator engine guards that case.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OhlcvSeries {
    bars: Vec<OhlcvBar>,
}

impl OhlcvSeries {
    pub fn new(bars: Vec<OhlcvBar>) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_consistent() {
                return Err(SeriesError::InconsistentRange {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(SeriesError::OutOfOrder {
                    index,
                    timestamp: bar.timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Point-in-time market metrics for one asset.
///
/// Every numeric field defaults to `0.0` when the upstream source does not
/// provide it, so a partially populated snapshot is still usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    /// Last traded price in USD.
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub market_cap: f64,
    /// Quote-currency volume over the trailing 24 hours.
    #[serde(default)]
    pub volume_24h: f64,
    /// Percentage change over the trailing 24 hours (e.g. `-2.5` = -2.5 %).
    #[serde(default)]
    pub change_24h_pct: f64,
    #[serde(default)]
    pub circulating_supply: f64,
    #[serde(default)]
    pub total_supply: f64,
    /// `0.0` for assets without a hard cap.
    #[serde(default)]
    pub max_supply: f64,
}

impl MarketSnapshot {
    /// An all-zero snapshot for `symbol`.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Normalise a user-entered ticker: trim whitespace and upper-case.
///
/// Returns `None` for an empty or whitespace-only input.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_uppercase())
    }
}
