// =============================================================================
// Market Data — OHLCV series + snapshot per symbol
// =============================================================================

pub mod exchange;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DataFetchError;
use crate::types::{MarketSnapshot, OhlcvSeries};

pub use exchange::ExchangeMarketData;

/// Everything fetched for one symbol in one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketData {
    pub series: OhlcvSeries,
    pub snapshot: MarketSnapshot,
}

/// A source of daily bars and current metrics.
///
/// `symbol` is already normalised (trimmed, upper-case). Implementations do
/// not retry; a failure is returned as-is with the symbol attached.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<MarketData, DataFetchError>;
}
