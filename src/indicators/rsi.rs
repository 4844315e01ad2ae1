// =============================================================================
// Relative Strength Index (RSI) — simple trailing mean
// =============================================================================
//
// Step 1: delta_i = close_i - close_{i-1} for i >= 1.
// Step 2: gain_i = max(delta_i, 0), loss_i = max(-delta_i, 0).
// Step 3: avg_gain_i / avg_loss_i = plain mean of the last `period` gains /
//          losses. Defined once `period` deltas exist, i.e. from i = period.
// Step 4: RS = avg_gain / avg_loss, RSI = 100 - 100 / (1 + RS).
//
// The averages are rolling simple means, not Wilder's smoothing.
//
// Degenerate windows:
//   avg_loss == 0, avg_gain > 0  => 100  (RS = +inf)
//   avg_loss == 0, avg_gain == 0 => 50   (flat window)
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use serde::Serialize;

use super::IndicatorSeries;

/// Compute the RSI series for `closes`, aligned with the input.
///
/// Entries `0..period` are `None`.
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `closes.len() <= period` => all `None` (fewer than `period` deltas)
/// - Windows touching a NaN close are left as `None`.
pub fn calculate_rsi(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return result;
    }

    // deltas[j] is the change into close j + 1.
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    for i in period..closes.len() {
        let window = &deltas[i - period..i];
        if window.iter().any(|d| d.is_nan()) {
            continue;
        }

        let (sum_gain, sum_loss) =
            window
                .iter()
                .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
                    if d > 0.0 {
                        (g + d, l)
                    } else if d < 0.0 {
                        (g, l - d)
                    } else {
                        (g, l)
                    }
                });

        result[i] = rsi_from_averages(sum_gain / period_f, sum_loss / period_f);
    }

    result
}

/// Momentum zone of an RSI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn classify(rsi: f64) -> Self {
        if rsi >= 70.0 {
            Self::Overbought
        } else if rsi <= 30.0 {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}
