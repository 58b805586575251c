//! Price input handling.
//!
//! Prices arrive as decimal text ("19.99") and are stored as integer cents.

use crate::error::SharedError;

/// Parse decimal price text into whole cents, rounding to the nearest cent.
pub fn parse_price_cents(text: &str) -> Result<i64, SharedError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SharedError::MissingPrice);
    }

    let value: f64 = text
        .parse()
        .map_err(|_| SharedError::InvalidPrice(text.to_string()))?;

    if !value.is_finite() {
        return Err(SharedError::InvalidPrice(text.to_string()));
    }
    if value < 0.0 {
        return Err(SharedError::NegativePrice);
    }

    // Rounds the f64 product, so "1.005" gives 100 cents, not 101.
    let cents = (value * 100.0).round();
    if cents > i64::MAX as f64 {
        return Err(SharedError::InvalidPrice(text.to_string()));
    }
    Ok(cents as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_rounds() {
        assert_eq!(parse_price_cents("19.99"), Ok(1999));
        assert_eq!(parse_price_cents(" 5 "), Ok(500));
        assert_eq!(parse_price_cents("0.005"), Ok(1));
        assert_eq!(parse_price_cents("1.005"), Ok(100));
        assert_eq!(parse_price_cents("2.344"), Ok(234));
        assert_eq!(parse_price_cents("0"), Ok(0));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_price_cents(""), Err(SharedError::MissingPrice));
        assert_eq!(parse_price_cents("-1"), Err(SharedError::NegativePrice));
        assert!(matches!(
            parse_price_cents("ten"),
            Err(SharedError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price_cents("NaN"),
            Err(SharedError::InvalidPrice(_))
        ));
    }
}
