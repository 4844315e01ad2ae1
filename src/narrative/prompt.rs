// =============================================================================
// Comparison prompt template
// =============================================================================

use crate::types::MarketSnapshot;

/// Shown with every report.
pub const DISCLAIMER: &str =
    "Disclaimer: This analysis is for informational purposes only. Cryptocurrency investments carry high risk.";

/// Sections the model is asked to produce, in order.
pub const ANALYSIS_SECTIONS: [&str; 5] = [
    "Market Position Comparison",
    "Volume Analysis",
    "Price Movement Analysis",
    "Risk Assessment",
    "Clear Investment Recommendation",
];

/// Build the prompt asking the model to compare `a` and `b`.
pub fn build_comparison_prompt(a: &MarketSnapshot, b: &MarketSnapshot) -> String {
    let mut prompt = String::from(
        "Analyze these two cryptocurrencies and recommend which is better for investment:\n\n",
    );

    for snap in [a, b] {
        prompt.push_str(&snapshot_block(snap));
        prompt.push('\n');
    }

    prompt.push_str("Please provide a detailed analysis including:\n");
    for (i, section) in ANALYSIS_SECTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, section));
    }
    prompt.push_str(
        "\nFormat your response in markdown with headers and bullet points.\n\
         Conclude with a clear recommendation on which cryptocurrency shows better investment potential and why.\n",
    );

    prompt
}

fn snapshot_block(s: &MarketSnapshot) -> String {
    format!(
        "{}:\n\
         - Current Price: {}\n\
         - Market Cap: {}\n\
         - 24h Volume: {}\n\
         - 24h Change: {:.2}%\n",
        s.symbol,
        format_usd(s.price),
        format_usd(s.market_cap),
        format_usd(s.volume_24h),
        s.change_24h_pct,
    )
}

/// `$` amount with thousands separators and two decimals, e.g. `$1,234.50`.
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(symbol: &str, price: f64, cap: f64, vol: f64, change: f64) -> MarketSnapshot {
        MarketSnapshot {
            symbol: symbol.into(),
            price,
            market_cap: cap,
            volume_24h: vol,
            change_24h_pct: change,
            ..MarketSnapshot::default()
        }
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(5.0), "$5.00");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(1234.5), "$1,234.50");
        assert_eq!(format_usd(43_000.123), "$43,000.12");
        assert_eq!(format_usd(842_000_000_000.0), "$842,000,000,000.00");
        assert_eq!(format_usd(-1_500.25), "-$1,500.25");
        assert_eq!(format_usd(-0.001), "$0.00");
    }

    #[test]
    fn prompt_contains_both_blocks_and_sections() {
        let a = snap("BTC", 43_000.5, 842_000_000_000.0, 21_000_000_000.0, 1.234);
        let b = snap("ETH", 2_300.0, 276_000_000_000.0, 9_500_000_000.0, -0.5);
        let prompt = build_comparison_prompt(&a, &b);

        assert!(prompt.starts_with("Analyze these two cryptocurrencies"));
        assert!(prompt.contains("BTC:\n- Current Price: $43,000.50\n"));
        assert!(prompt.contains("- Market Cap: $842,000,000,000.00\n"));
        assert!(prompt.contains("- 24h Volume: $21,000,000,000.00\n"));
        assert!(prompt.contains("- 24h Change: 1.23%\n"));
        assert!(prompt.contains("ETH:\n- Current Price: $2,300.00\n"));
        assert!(prompt.contains("- 24h Change: -0.50%\n"));

        for (i, section) in ANALYSIS_SECTIONS.iter().enumerate() {
            assert!(prompt.contains(&format!("{}. {}\n", i + 1, section)));
        }
        assert!(prompt.contains("markdown"));
        assert!(prompt.find("BTC:").unwrap() < prompt.find("ETH:").unwrap());
    }

    #[test]
    fn missing_metrics_render_as_zero() {
        let prompt = build_comparison_prompt(&MarketSnapshot::empty("AAA"), &MarketSnapshot::empty("BBB"));
        assert!(prompt.contains("AAA:\n- Current Price: $0.00\n- Market Cap: $0.00\n"));
        assert!(prompt.contains("- 24h Change: 0.00%\n"));
    }
}
