// =============================================================================
// Exchange-backed market data source
// =============================================================================
//
// Bars and the 24h ticker come from Binance for `<SYMBOL><QUOTE>` (e.g.
// BTCUSDT). Market cap and supply figures come from CoinGecko and are
// best-effort: when that lookup fails the fields stay at 0 and the request
// carries on.
// =============================================================================

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};

use super::{MarketData, MarketDataSource};
use crate::binance::{BinanceClient, Ticker24h};
use crate::coingecko::{CoinGeckoClient, CoinMarket};
use crate::error::{DataFetchError, FetchCause};
use crate::runtime_config::RuntimeConfig;
use crate::types::{MarketSnapshot, OhlcvSeries};

pub struct ExchangeMarketData {
    binance: BinanceClient,
    coingecko: Option<CoinGeckoClient>,
    quote_asset: String,
    interval: String,
    lookback_days: u32,
    kline_limit: u32,
}

impl ExchangeMarketData {
    pub fn new(
        binance: BinanceClient,
        coingecko: Option<CoinGeckoClient>,
        config: &RuntimeConfig,
    ) -> anyhow::Result<Self> {
        let kline_limit = config
            .kline_limit()
            .with_context(|| format!("unsupported kline_interval {:?}", config.kline_interval))?;

        Ok(Self {
            binance,
            coingecko,
            quote_asset: config.quote_asset.trim().to_uppercase(),
            interval: config.kline_interval.clone(),
            lookback_days: config.lookback_days,
            kline_limit,
        })
    }

    /// Exchange pair for a normalised symbol.
    pub fn pair_for(&self, symbol: &str) -> String {
        format!("{symbol}{}", self.quote_asset)
    }

    async fn coin_market(&self, symbol: &str) -> Option<CoinMarket> {
        let client = self.coingecko.as_ref()?;
        match client.get_market(symbol).await {
            Ok(market) => Some(market),
            Err(e) => {
                warn!(symbol, error = %e, "CoinGecko lookup failed, market cap and supply default to 0");
                None
            }
        }
    }
}

#[async_trait]
impl MarketDataSource for ExchangeMarketData {
    #[instrument(skip(self), name = "market_data::fetch")]
    async fn fetch(&self, symbol: &str) -> Result<MarketData, DataFetchError> {
        let pair = self.pair_for(symbol);
        let start = Utc::now() - Duration::days(i64::from(self.lookback_days));

        let (klines, ticker, market) = tokio::join!(
            self.binance
                .get_klines(&pair, &self.interval, start, self.kline_limit),
            self.binance.get_ticker_24h(&pair),
            self.coin_market(symbol),
        );

        let bars = klines.map_err(|c| DataFetchError::new(symbol, c))?;
        let series = OhlcvSeries::new(bars).map_err(|e| DataFetchError::new(symbol, e))?;
        if series.is_empty() {
            return Err(DataFetchError::new(symbol, FetchCause::Empty));
        }
        let ticker = ticker.map_err(|c| DataFetchError::new(symbol, c))?;
        let snapshot = build_snapshot(symbol, &ticker, market.as_ref());

        info!(
            symbol,
            pair = %pair,
            bars = series.len(),
            price = snapshot.price,
            "market data fetched"
        );
        debug!(?snapshot, "snapshot assembled");

        Ok(MarketData { series, snapshot })
    }
}

/// Merge the exchange ticker with optional CoinGecko figures.
fn build_snapshot(symbol: &str, ticker: &Ticker24h, market: Option<&CoinMarket>) -> MarketSnapshot {
    let mut snapshot = MarketSnapshot {
        price: ticker.last_price,
        volume_24h: ticker.quote_volume,
        change_24h_pct: ticker.price_change_percent,
        ..MarketSnapshot::empty(symbol)
    };

    if let Some(m) = market {
        snapshot.market_cap = m.market_cap.unwrap_or_default();
        snapshot.circulating_supply = m.circulating_supply.unwrap_or_default();
        snapshot.total_supply = m.total_supply.unwrap_or_default();
        snapshot.max_supply = m.max_supply.unwrap_or_default();
    }

    snapshot
}
