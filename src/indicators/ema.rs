// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   alpha  = 2 / (span + 1)
//   EMA_0  = x_0
//   EMA_t  = alpha * x_t + (1 - alpha) * EMA_{t-1}
//
// The series is seeded from the first observation, not from an SMA warm-up.
// This is the `adjust=False` convention of common dataframe libraries and is
// required for numeric parity with them. Every index is therefore defined.
// =============================================================================

/// Smoothing factor for a given `span`.
pub fn alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Compute the EMA of `values` with the given `span`.
///
/// The output has the same length as the input. An empty input yields an
/// empty output. `span` must be at least 1; callers validate this through
/// [`super::IndicatorParams::validate`].
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let a = alpha(span);
    let mut result = Vec::with_capacity(values.len());
    result.push(first);

    let mut prev = first;
    for &x in &values[1..] {
        let ema = a * x + (1.0 - a) * prev;
        result.push(ema);
        prev = ema;
    }

    result
}
