// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA_i = mean(close_{i-w+1} .. close_i)   for i >= w - 1
//
// The window is contiguous and trailing; nothing after index i is read.
// Each window is summed directly rather than with a running sum so that the
// value at every index is exactly the naive mean of its window.

use super::IndicatorSeries;

/// Compute the SMA of `closes` over `window`, aligned with the input.
///
/// The first `window - 1` entries are `None`. A `window` of zero or longer
/// than the input produces an all-`None` series.
pub fn calculate_sma(closes: &[f64], window: usize) -> IndicatorSeries {
    let mut result = vec![None; closes.len()];
    if window == 0 || closes.len() < window {
        return result;
    }

    let w = window as f64;
    for (offset, slice) in closes.windows(window).enumerate() {
        result[offset + window - 1] = Some(slice.iter().sum::<f64>() / w);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.3)
            .collect()
    }

    #[test]
    fn sma_matches_naive_mean_on_60_bars() {
        let closes = synthetic(60);
        for window in [20usize, 50] {
            let sma = calculate_sma(&closes, window);
            assert_eq!(sma.len(), 60);
            for (i, v) in sma.iter().enumerate() {
                if i + 1 < window {
                    assert!(v.is_none(), "window {window} index {i} should be undefined");
                } else {
                    let naive: f64 =
                        closes[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
                    let got = v.expect("defined");
                    assert!((got - naive).abs() < 1e-9, "window {window} index {i}");
                }
            }
        }
    }

    #[test]
    fn sma_short_series_is_all_undefined() {
        let closes = synthetic(49);
        assert!(calculate_sma(&closes, 50).iter().all(Option::is_none));
    }

    #[test]
    fn sma_zero_window_is_all_undefined() {
        assert!(calculate_sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn sma_flat_series() {
        let closes = vec![100.0; 20];
        let sma = calculate_sma(&closes, 20);
        assert_eq!(sma[19], Some(100.0));
        assert!(sma[..19].iter().all(Option::is_none));
    }
}
