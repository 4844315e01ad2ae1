// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators shown on the
// comparison dashboard. Every derived series is aligned index-for-index with
// the input closes; `None` marks positions where a rolling window is not yet
// full.

pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use engine::{compute_indicators, IndicatorParams, IndicatorSet, IndicatorSummary};

/// Indicator values aligned with an OHLCV series; `None` = not yet computable.
pub type IndicatorSeries = Vec<Option<f64>>;
