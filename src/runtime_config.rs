// =============================================================================
// Runtime Configuration — JSON file + environment overrides
// =============================================================================
//
// Every tunable lives here: bind address, upstream endpoints, lookback
// window, inference parameters and the indicator windows. All fields carry
// `#[serde(default)]` so a partial (or empty) JSON file is valid.
//
// Secrets are never part of this struct. The inference token is read from the
// environment at startup and held separately in `AppState`.
// =============================================================================

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::binance::{interval_secs, MAX_KLINES};
use crate::indicators::IndicatorParams;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_lookback_days() -> u32 {
    90
}

fn default_kline_interval() -> String {
    "1d".to_string()
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_coingecko_base_url() -> String {
    "https://api.coingecko.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_inference_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_model() -> String {
    "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_new_tokens() -> u32 {
    2048
}

fn default_top_p() -> f64 {
    0.9
}

fn default_narrative_timeout_secs() -> u64 {
    120
}

// =============================================================================
// GenerationParams
// =============================================================================

/// Sampling parameters forwarded to the inference API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_new_tokens: default_max_new_tokens(),
            top_p: default_top_p(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Server --------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Market data ---------------------------------------------------------

    /// Calendar days of daily bars to request per symbol.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Binance kline interval.
    #[serde(default = "default_kline_interval")]
    pub kline_interval: String,

    /// Quote asset appended to the user's symbol to form the exchange pair.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,

    #[serde(default = "default_coingecko_base_url")]
    pub coingecko_base_url: String,

    /// Fill market cap / supply figures from CoinGecko.
    #[serde(default = "default_true")]
    pub enable_coingecko: bool,

    /// Timeout for each market data request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Narrative -----------------------------------------------------------

    #[serde(default = "default_inference_base_url")]
    pub inference_base_url: String,

    /// Hosted model id used for the comparison narrative.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub generation: GenerationParams,

    #[serde(default = "default_narrative_timeout_secs")]
    pub narrative_timeout_secs: u64,

    // --- Indicators ----------------------------------------------------------

    #[serde(default)]
    pub indicators: IndicatorParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            lookback_days: default_lookback_days(),
            kline_interval: default_kline_interval(),
            quote_asset: default_quote_asset(),
            binance_base_url: default_binance_base_url(),
            coingecko_base_url: default_coingecko_base_url(),
            enable_coingecko: true,
            request_timeout_secs: default_request_timeout_secs(),
            inference_base_url: default_inference_base_url(),
            model: default_model(),
            generation: GenerationParams::default(),
            narrative_timeout_secs: default_narrative_timeout_secs(),
            indicators: IndicatorParams::default(),
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
            lookback_days = config.lookback_days,
            model = %config.model,
            "config loaded"
        );

        Ok(config)
    }

    /// Apply `CRYPTO_COMPARE_*` overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(addr) = get("CRYPTO_COMPARE_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(raw) = get("CRYPTO_COMPARE_LOOKBACK_DAYS") {
            match raw.parse() {
                Ok(days) => self.lookback_days = days,
                Err(_) => warn!(value = %raw, "ignoring invalid CRYPTO_COMPARE_LOOKBACK_DAYS"),
            }
        }
        if let Some(model) = get("CRYPTO_COMPARE_MODEL") {
            self.model = model;
        }
    }

    /// Bars needed to cover `lookback_days` at `kline_interval`, plus the
    /// bar still in progress. `None` for an unsupported interval.
    pub fn kline_limit(&self) -> Option<u32> {
        let bar_secs = interval_secs(&self.kline_interval)?;
        let span_secs = i64::from(self.lookback_days) * 86_400;
        let bars = (span_secs + bar_secs - 1) / bar_secs;
        u32::try_from(bars + 1).ok()
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.lookback_days == 0 {
            bail!("lookback_days must be at least 1");
        }
        let Some(limit) = self.kline_limit() else {
            bail!("unsupported kline_interval {:?}", self.kline_interval);
        };
        // One klines request returns at most MAX_KLINES bars.
        if limit > MAX_KLINES {
            bail!(
                "lookback_days={} at interval {} needs {} bars, more than the {} one request returns",
                self.lookback_days,
                self.kline_interval,
                limit,
                MAX_KLINES
            );
        }
        if self.quote_asset.trim().is_empty() {
            bail!("quote_asset must not be empty");
        }
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            bail!("generation.top_p must be within [0, 1]");
        }
        self.indicators
            .validate()
            .context("invalid indicator parameters")?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
        assert_eq!(cfg.lookback_days, 90);
        assert_eq!(cfg.kline_interval, "1d");
        assert_eq!(cfg.quote_asset, "USDT");
        assert_eq!(cfg.model, "mistralai/Mixtral-8x7B-Instruct-v0.1");
        assert!(cfg.enable_coingecko);
        assert!((cfg.generation.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.generation.max_new_tokens, 2048);
        assert!((cfg.generation.top_p - 0.9).abs() < f64::EPSILON);
        assert_eq!(cfg.indicators, IndicatorParams::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "lookback_days": 30, "generation": { "temperature": 0.7 }, "indicators": { "rsi_period": 7 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.lookback_days, 30);
        assert!((cfg.generation.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(cfg.generation.max_new_tokens, 2048);
        assert_eq!(cfg.indicators.rsi_period, 7);
        assert_eq!(cfg.indicators.sma_long, 50);
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(RuntimeConfig::load("/definitely/not/here/config.json").is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("CRYPTO_COMPARE_BIND_ADDR", "127.0.0.1:9000"),
            ("CRYPTO_COMPARE_LOOKBACK_DAYS", " 120 "),
            ("CRYPTO_COMPARE_MODEL", "some/other-model"),
        ]
        .into_iter()
        .collect();

        let mut cfg = RuntimeConfig::default();
        cfg.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.lookback_days, 120);
        assert_eq!(cfg.model, "some/other-model");
    }

    #[test]
    fn invalid_env_override_is_ignored() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_env_overrides(|k| (k == "CRYPTO_COMPARE_LOOKBACK_DAYS").then(|| "ninety".to_string()));
        assert_eq!(cfg.lookback_days, 90);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = RuntimeConfig::default();
        cfg.lookback_days = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.indicators.macd_fast = 30;
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.generation.top_p = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn kline_limit_follows_interval() {
        let mut cfg = RuntimeConfig::default();
        assert_eq!(cfg.kline_limit(), Some(91));

        cfg.kline_interval = "4h".into();
        assert_eq!(cfg.kline_limit(), Some(90 * 6 + 1));
        assert!(cfg.validate().is_ok());

        cfg.kline_interval = "1w".into();
        assert_eq!(cfg.kline_limit(), Some(14));
    }

    #[test]
    fn validate_rejects_lookback_beyond_one_request() {
        let mut cfg = RuntimeConfig::default();
        cfg.kline_interval = "1h".into();
        assert_eq!(cfg.kline_limit(), Some(90 * 24 + 1));
        assert!(cfg.validate().is_err());

        let mut cfg = RuntimeConfig::default();
        cfg.lookback_days = 999;
        assert!(cfg.validate().is_ok());
        cfg.lookback_days = 1000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_interval() {
        let mut cfg = RuntimeConfig::default();
        cfg.kline_interval = "1M".into();
        assert_eq!(cfg.kline_limit(), None);
        assert!(cfg.validate().is_err());
    }
}
