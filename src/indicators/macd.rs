// =============================================================================
// MACD — Moving Average Convergence / Divergence
// =============================================================================
//
//   macd_i      = EMA(close, fast)_i - EMA(close, slow)_i
//   signal_i    = EMA(macd, signal)_i       (seeded from macd_0)
//   histogram_i = macd_i - signal_i
//
// Both EMAs are defined from index 0, so every MACD entry is defined too.

use super::ema::calculate_ema;

/// MACD line, signal line and histogram, each aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal = calculate_ema(&macd, signal);
    let histogram = macd.iter().zip(signal.iter()).map(|(m, s)| m - s).collect();

    MacdSeries {
        macd,
        signal,
        histogram,
    }
}
