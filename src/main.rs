// =============================================================================
// Crypto Compare — Main Entry Point
// =============================================================================
//
// Serves the comparison API: daily OHLCV bars and 24h metrics from Binance,
// market cap and supply from CoinGecko, technical indicators computed locally,
// and a markdown narrative from a hosted model on Hugging Face.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod binance;
mod coingecko;
mod error;
mod indicators;
mod market_data;
mod narrative;
mod runtime_config;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::ComparisonService;
use crate::app_state::AppState;
use crate::binance::BinanceClient;
use crate::coingecko::CoinGeckoClient;
use crate::market_data::ExchangeMarketData;
use crate::narrative::HuggingFaceClient;
use crate::runtime_config::RuntimeConfig;

const CONFIG_PATH: &str = "crypto_compare.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Crypto Compare starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides(|name| std::env::var(name).ok());
    config.validate().context("invalid configuration")?;

    let default_token = std::env::var("HUGGINGFACEHUB_API_TOKEN").ok();
    if default_token.is_none() {
        warn!("HUGGINGFACEHUB_API_TOKEN not set; narratives need a per-request token");
    }

    info!(
        lookback_days = config.lookback_days,
        interval = %config.kline_interval,
        model = %config.model,
        coingecko = config.enable_coingecko,
        "Configuration resolved"
    );

    // ── 2. External clients ──────────────────────────────────────────────
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    let binance = BinanceClient::new(config.binance_base_url.clone(), request_timeout)
        .context("failed to build Binance client")?;
    let coingecko = if config.enable_coingecko {
        Some(
            CoinGeckoClient::new(config.coingecko_base_url.clone(), request_timeout)
                .context("failed to build CoinGecko client")?,
        )
    } else {
        None
    };
    let market = ExchangeMarketData::new(binance, coingecko, &config)?;

    let narrator = HuggingFaceClient::new(
        &config.inference_base_url,
        config.model.clone(),
        config.generation.clone(),
        Duration::from_secs(config.narrative_timeout_secs),
    )
    .context("failed to build inference client")?;

    // ── 3. Shared state ──────────────────────────────────────────────────
    let service = ComparisonService::new(Arc::new(market), Arc::new(narrator), config.indicators);
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, service, default_token));

    // ── 4. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
