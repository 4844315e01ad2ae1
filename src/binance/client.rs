// =============================================================================
// Binance REST API Client — public market data endpoints
// =============================================================================
//
// Only unauthenticated endpoints are used: daily klines for the OHLCV series
// and the 24h rolling ticker for the snapshot's price / volume / change.
// =============================================================================

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::FetchCause;
use crate::types::OhlcvBar;

/// Binance error code for an unknown trading pair.
const INVALID_SYMBOL_CODE: i64 = -1121;

/// Maximum klines returned by a single request.
pub const MAX_KLINES: u32 = 1000;

/// Bar length in seconds for a Binance kline interval. `None` for intervals
/// the exchange does not offer (and for `1M`, which has no fixed length).
pub fn interval_secs(interval: &str) -> Option<i64> {
    let secs = match interval {
        "1m" => 60,
        "3m" => 3 * 60,
        "5m" => 5 * 60,
        "15m" => 15 * 60,
        "30m" => 30 * 60,
        "1h" => 3_600,
        "2h" => 2 * 3_600,
        "4h" => 4 * 3_600,
        "6h" => 6 * 3_600,
        "8h" => 8 * 3_600,
        "12h" => 12 * 3_600,
        "1d" => 86_400,
        "3d" => 3 * 86_400,
        "1w" => 7 * 86_400,
        _ => return None,
    };
    Some(secs)
}

/// Fields of `/api/v3/ticker/24hr` used by the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker24h {
    pub last_price: f64,
    pub price_change_percent: f64,
    /// 24h volume in the quote asset (USDT), i.e. a dollar figure.
    pub quote_volume: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    last_price: String,
    price_change_percent: String,
    quote_volume: String,
}

#[derive(Deserialize)]
struct RawApiError {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Binance public REST API client.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self { base_url, client })
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/klines starting at `start`.
    ///
    /// Array indices of each entry:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, ...
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        pair: &str,
        interval: &str,
        start: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<OhlcvBar>, FetchCause> {
        let request = self.klines_request(pair, interval, start, limit)?;
        let body = self.get_json("/api/v3/klines", request).await?;
        let bars = parse_klines(&body)?;

        debug!(pair, interval, count = bars.len(), "klines fetched");
        Ok(bars)
    }

    /// GET /api/v3/ticker/24hr for a single pair.
    #[instrument(skip(self), name = "binance::get_ticker_24h")]
    pub async fn get_ticker_24h(&self, pair: &str) -> Result<Ticker24h, FetchCause> {
        let request = self.ticker_request(pair)?;
        let body = self.get_json("/api/v3/ticker/24hr", request).await?;
        let ticker = parse_ticker(body)?;

        debug!(pair, price = ticker.last_price, "24h ticker fetched");
        Ok(ticker)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    // Query values go through the builder so a pair containing `&`, `#` or
    // `=` stays a single encoded parameter.
    fn klines_request(
        &self,
        pair: &str,
        interval: &str,
        start: DateTime<Utc>,
        limit: u32,
    ) -> reqwest::Result<reqwest::Request> {
        let start_time = start.timestamp_millis().to_string();
        let limit = limit.min(MAX_KLINES).to_string();
        self.client
            .get(format!("{}/api/v3/klines", self.base_url))
            .query(&[
                ("symbol", pair),
                ("interval", interval),
                ("startTime", start_time.as_str()),
                ("limit", limit.as_str()),
            ])
            .build()
    }

    fn ticker_request(&self, pair: &str) -> reqwest::Result<reqwest::Request> {
        self.client
            .get(format!("{}/api/v3/ticker/24hr", self.base_url))
            .query(&[("symbol", pair)])
            .build()
    }

    async fn get_json(
        &self,
        endpoint: &'static str,
        request: reqwest::Request,
    ) -> Result<serde_json::Value, FetchCause> {
        let resp = self.client.execute(request).await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(classify_error(endpoint, status.as_u16(), text));
        }

        serde_json::from_str(&text)
            .map_err(|e| FetchCause::Malformed(format!("{endpoint}: {e}")))
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Payload parsing
// =============================================================================

/// Map a non-2xx response onto a fetch cause.
fn classify_error(endpoint: &'static str, status: u16, body: String) -> FetchCause {
    match serde_json::from_str::<RawApiError>(&body) {
        Ok(err) if err.code == INVALID_SYMBOL_CODE => FetchCause::UnknownSymbol,
        Ok(err) => FetchCause::Status {
            endpoint,
            status,
            body: format!("code {}: {}", err.code, err.msg),
        },
        Err(_) => FetchCause::Status {
            endpoint,
            status,
            body,
        },
    }
}

/// Parse the array-of-arrays klines payload into bars.
fn parse_klines(body: &serde_json::Value) -> Result<Vec<OhlcvBar>, FetchCause> {
    let raw = body
        .as_array()
        .ok_or_else(|| FetchCause::Malformed("klines response is not an array".into()))?;

    let mut bars = Vec::with_capacity(raw.len());

    for entry in raw {
        let arr = entry
            .as_array()
            .ok_or_else(|| FetchCause::Malformed("kline entry is not an array".into()))?;

        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let open_time = arr[0]
            .as_i64()
            .ok_or_else(|| FetchCause::Malformed(format!("kline open time: {}", arr[0])))?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(open_time)
            .ok_or_else(|| FetchCause::Malformed(format!("kline open time out of range: {open_time}")))?;

        bars.push(OhlcvBar::new(
            timestamp,
            parse_str_f64(&arr[1])?,
            parse_str_f64(&arr[2])?,
            parse_str_f64(&arr[3])?,
            parse_str_f64(&arr[4])?,
            parse_str_f64(&arr[5])?,
        ));
    }

    Ok(bars)
}

fn parse_ticker(body: serde_json::Value) -> Result<Ticker24h, FetchCause> {
    let raw: RawTicker = serde_json::from_value(body)
        .map_err(|e| FetchCause::Malformed(format!("24h ticker: {e}")))?;

    Ok(Ticker24h {
        last_price: parse_f64(&raw.last_price)?,
        price_change_percent: parse_f64(&raw.price_change_percent)?,
        quote_volume: parse_f64(&raw.quote_volume)?,
    })
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64, FetchCause> {
    if let Some(s) = val.as_str() {
        parse_f64(s)
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        Err(FetchCause::Malformed(format!("expected string or number, got: {val}")))
    }
}

fn parse_f64(s: &str) -> Result<f64, FetchCause> {
    s.parse::<f64>()
        .map_err(|_| FetchCause::Malformed(format!("failed to parse '{s}' as f64")))
}
