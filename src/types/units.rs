//! Unit Conversion Utilities
//!
//! Helpers for fiat amount conversions and formatting. Balances and deposit
//! amounts are stored as integer cents; decimals only exist at the API edge.

/// Cents per US dollar
pub const CENTS_PER_USD: u64 = 100;

/// Convert a decimal USD amount to cents.
///
/// Returns `None` for negative or non-finite inputs.
pub fn usd_to_cents(usd: f64) -> Option<u64> {
    if !usd.is_finite() || usd < 0.0 {
        return None;
    }
    Some((usd * CENTS_PER_USD as f64).round() as u64)
}

/// Convert cents to a decimal USD amount
pub fn cents_to_usd(cents: u64) -> f64 {
    cents as f64 / CENTS_PER_USD as f64
}

/// Convert cents to a USD string (e.g., "100.00")
pub fn cents_to_usd_string(cents: u64) -> String {
    format!("{}.{:02}", cents / CENTS_PER_USD, cents % CENTS_PER_USD)
}

/// Convert cents to human-readable string
/// e.g., 123456 -> "$1,234.56"
pub fn cents_to_display(cents: u64) -> String {
    let dollars = format_with_commas(cents / CENTS_PER_USD);
    format!("${}.{:02}", dollars, cents % CENTS_PER_USD)
}

/// Format number with thousands separators
fn format_with_commas(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Parse a cent amount from string
pub fn parse_cents(s: &str) -> Option<u64> {
    s.trim().replace(',', "").replace('_', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_to_cents() {
        assert_eq!(usd_to_cents(0.0), Some(0));
        assert_eq!(usd_to_cents(100.0), Some(10_000));
        assert_eq!(usd_to_cents(0.01), Some(1));
        assert_eq!(usd_to_cents(99.999), Some(10_000));
        assert_eq!(usd_to_cents(-1.0), None);
        assert_eq!(usd_to_cents(f64::NAN), None);
        assert_eq!(usd_to_cents(f64::INFINITY), None);
    }

    #[test]
    fn test_cents_to_usd_string() {
        assert_eq!(cents_to_usd_string(0), "0.00");
        assert_eq!(cents_to_usd_string(1), "0.01");
        assert_eq!(cents_to_usd_string(10_000), "100.00");
        assert_eq!(cents_to_usd_string(123_456), "1234.56");
    }

    #[test]
    fn test_display_format() {
        assert_eq!(cents_to_display(123_456), "$1,234.56");
        assert_eq!(cents_to_display(5), "$0.05");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("1000"), Some(1000));
        assert_eq!(parse_cents("1,000,000"), Some(1_000_000));
        assert_eq!(parse_cents("  42  "), Some(42));
        assert_eq!(parse_cents("invalid"), None);
    }
}
