// =============================================================================
// Indicator Engine — OHLCV series in, five aligned indicator series out
// =============================================================================
//
// RSI(14), MACD(12, 26), signal line (9 over MACD), SMA(20) and SMA(50).
//
// The engine holds no state: `compute_indicators` reads the closes of the
// given bars and returns freshly allocated series. Calling it twice with the
// same input yields bit-identical output, and it may run on any number of
// threads at once.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::macd::calculate_macd;
use super::rsi::{calculate_rsi, RsiZone};
use super::sma::calculate_sma;
use super::IndicatorSeries;
use crate::error::IndicatorError;
use crate::types::OhlcvBar;

// =============================================================================
// Parameters
// =============================================================================

fn default_rsi_period() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_sma_short() -> usize {
    20
}

fn default_sma_long() -> usize {
    50
}

/// Window and span constants for the engine.
///
/// The defaults are the standard dashboard settings. They can be overridden
/// from the config file but are never changed per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    /// Fast EMA span of the MACD line.
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    /// Slow EMA span of the MACD line.
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    /// EMA span of the signal line over MACD.
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    #[serde(default = "default_sma_short")]
    pub sma_short: usize,

    #[serde(default = "default_sma_long")]
    pub sma_long: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
        }
    }
}

impl IndicatorParams {
    /// Reject zero windows and a MACD fast span that is not below the slow one.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let named = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("sma_short", self.sma_short),
            ("sma_long", self.sma_long),
        ];
        if let Some((name, _)) = named.iter().find(|(_, v)| *v == 0) {
            return Err(IndicatorError::InvalidParams(format!("{name} must be at least 1")));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(IndicatorError::InvalidParams(format!(
                "macd_fast ({}) must be below macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Output
// =============================================================================

/// The five indicator series, aligned with the timestamps and closes they
/// were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub params: IndicatorParams,
    pub timestamps: Vec<DateTime<Utc>>,
    pub close: Vec<f64>,
    pub rsi: IndicatorSeries,
    pub macd: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub sma_short: IndicatorSeries,
    pub sma_long: IndicatorSeries,
}

/// Relative position of the short and long SMAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmaTrend {
    Bullish,
    Bearish,
    Neutral,
}

/// Latest defined reading of each indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSummary {
    pub last_close: f64,
    pub rsi: Option<f64>,
    pub rsi_zone: Option<RsiZone>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    /// `macd - signal` at the last bar.
    pub macd_histogram: Option<f64>,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    /// `None` until both SMAs are defined at the last bar.
    pub sma_trend: Option<SmaTrend>,
}

impl IndicatorSet {
    /// Readings at the last bar.
    pub fn summary(&self) -> IndicatorSummary {
        let last = |s: &IndicatorSeries| s.last().copied().flatten();

        let rsi = last(&self.rsi);
        let macd = last(&self.macd);
        let signal = last(&self.signal);
        let sma_short = last(&self.sma_short);
        let sma_long = last(&self.sma_long);

        let sma_trend = match (sma_short, sma_long) {
            (Some(s), Some(l)) if s > l => Some(SmaTrend::Bullish),
            (Some(s), Some(l)) if s < l => Some(SmaTrend::Bearish),
            (Some(_), Some(_)) => Some(SmaTrend::Neutral),
            _ => None,
        };

        IndicatorSummary {
            last_close: self.close.last().copied().unwrap_or_default(),
            rsi,
            rsi_zone: rsi.map(RsiZone::classify),
            macd,
            signal,
            macd_histogram: macd.zip(signal).map(|(m, s)| m - s),
            sma_short,
            sma_long,
            sma_trend,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Compute all indicators for `bars`.
///
/// # Errors
/// - [`IndicatorError::InsufficientData`] when `bars` is empty.
/// - [`IndicatorError::InvalidParams`] when `params` fails validation. The
///   default parameters always pass.
///
/// A series shorter than a window is not an error: that indicator comes back
/// entirely `None`.
pub fn compute_indicators(
    bars: &[OhlcvBar],
    params: &IndicatorParams,
) -> Result<IndicatorSet, IndicatorError> {
    if bars.is_empty() {
        return Err(IndicatorError::InsufficientData);
    }
    params.validate()?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let macd = calculate_macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal);

    Ok(IndicatorSet {
        params: *params,
        timestamps: bars.iter().map(|b| b.timestamp).collect(),
        rsi: calculate_rsi(&closes, params.rsi_period),
        macd: macd.macd.into_iter().map(Some).collect(),
        signal: macd.signal.into_iter().map(Some).collect(),
        sma_short: calculate_sma(&closes, params.sma_short),
        sma_long: calculate_sma(&closes, params.sma_long),
        close: closes,
    })
}
