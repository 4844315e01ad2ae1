// =============================================================================
// CoinGecko REST Client — market cap and supply figures
// =============================================================================
//
// `/api/v3/coins/markets?vs_currency=usd&symbols=<sym>` returns every coin
// sharing the ticker, ordered by market cap. The largest one is taken as the
// asset the user meant.
// =============================================================================

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::FetchCause;

/// Capitalisation and supply figures for one coin. Absent upstream values
/// are `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CoinMarket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!(base_url = %base_url, "CoinGeckoClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET /api/v3/coins/markets for a ticker symbol (case-insensitive).
    #[instrument(skip(self), name = "coingecko::get_market")]
    pub async fn get_market(&self, symbol: &str) -> Result<CoinMarket, FetchCause> {
        let request = self.markets_request(symbol)?;
        let resp = self.client.execute(request).await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(FetchCause::Status {
                endpoint: "/api/v3/coins/markets",
                status: status.as_u16(),
                body: text,
            });
        }

        let coins: Vec<CoinMarket> = serde_json::from_str(&text)
            .map_err(|e| FetchCause::Malformed(format!("/api/v3/coins/markets: {e}")))?;

        let coin = pick_largest(coins).ok_or(FetchCause::UnknownSymbol)?;
        debug!(symbol, id = %coin.id, market_cap = ?coin.market_cap, "coin market fetched");
        Ok(coin)
    }

    fn markets_request(&self, symbol: &str) -> reqwest::Result<reqwest::Request> {
        let symbol = symbol.to_lowercase();
        self.client
            .get(format!("{}/api/v3/coins/markets", self.base_url))
            .query(&[
                ("vs_currency", "usd"),
                ("symbols", symbol.as_str()),
                ("order", "market_cap_desc"),
            ])
            .build()
    }
}

impl std::fmt::Debug for CoinGeckoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinGeckoClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Coin with the largest market cap; ties and missing caps keep API order.
fn pick_largest(coins: Vec<CoinMarket>) -> Option<CoinMarket> {
    coins.into_iter().reduce(|best, next| {
        if next.market_cap.unwrap_or(0.0) > best.market_cap.unwrap_or(0.0) {
            next
        } else {
            best
        }
    })
}
