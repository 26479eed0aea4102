//! Locale-tolerant price parsing.
//!
//! Prices are scraped as free text ("1 234,56 €", "EUR 29.99", "29,\u{a0}99") and
//! normalized to an exact amount in minor currency units. The last comma or period
//! is the decimal separator; every earlier one is a thousands separator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance, in cents, below which two prices are considered unchanged.
pub const PRICE_TOLERANCE_CENTS: u64 = 1;

/// A strictly positive price with two fraction digits, stored as cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Build a price from an amount in cents.
    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The amount in cents.
    pub fn cents(self) -> u64 {
        self.0
    }

    /// Lossy conversion for display and plotting.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Absolute difference to another price, in cents.
    pub fn distance(self, other: Price) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Price {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_price(s)
    }
}

/// Why a scraped text could not be turned into a price.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no digits in price text {0:?}")]
    Empty(String),

    #[error("price text {0:?} has malformed digit grouping")]
    Invalid(String),

    #[error("price text {0:?} is zero")]
    NonPositive(String),

    #[error("price text {0:?} is out of range")]
    Overflow(String),
}

/// Parse scraped price text into a [`Price`].
///
/// Everything except digits, `,` and `.` is discarded first, so currency symbols,
/// non-breaking spaces and markup leftovers never change the result. The amount is
/// rounded half-up to two fraction digits. Separators before the decimal one must
/// split the integer part into thousands groups (`1.234.567,89`); anything else,
/// such as two prices run together, is `Invalid`. Zero is rejected: on a product
/// page it is almost always a mis-read quantity or placeholder.
pub fn parse_price(raw: &str) -> Result<Price, ParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return Err(ParseError::Empty(raw.to_string()));
    }

    let (int_part, frac_part) = match cleaned.rfind([',', '.']) {
        Some(idx) => (&cleaned[..idx], &cleaned[idx + 1..]),
        None => (cleaned.as_str(), ""),
    };

    if !well_grouped(int_part) {
        return Err(ParseError::Invalid(raw.to_string()));
    }

    let overflow = || ParseError::Overflow(raw.to_string());

    let mut units: u64 = 0;
    for b in int_part.bytes().filter(u8::is_ascii_digit) {
        units = units
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or_else(overflow)?;
    }

    let mut frac = frac_part.bytes();
    let mut digit = || frac.next().map(|b| u64::from(b - b'0')).unwrap_or(0);
    let tenths = digit();
    let hundredths = digit();
    let round_up = digit() >= 5;

    let cents = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(tenths * 10 + hundredths + u64::from(round_up)))
        .ok_or_else(overflow)?;

    if cents == 0 {
        return Err(ParseError::NonPositive(raw.to_string()));
    }
    Ok(Price(cents))
}

/// First group of 1-3 digits, every later group exactly 3.
fn well_grouped(int_part: &str) -> bool {
    let mut groups = int_part.split([',', '.']);
    match groups.next() {
        Some(first) if int_part.contains([',', '.']) => {
            (1..=3).contains(&first.len()) && groups.all(|g| g.len() == 3)
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(raw: &str) -> u64 {
        parse_price(raw).unwrap().cents()
    }

    #[test]
    fn test_french_format_with_thin_space_and_symbol() {
        assert_eq!(cents("1 234,56 €"), 123_456);
        assert_eq!(cents("1\u{a0}234,56\u{a0}€"), 123_456);
        assert_eq!(cents("1\u{202f}234,56 €"), 123_456);
    }

    #[test]
    fn test_english_and_german_grouping() {
        assert_eq!(cents("$1,234.56"), 123_456);
        assert_eq!(cents("1.234,56 EUR"), 123_456);
        assert_eq!(cents("1,234,567.89"), 123_456_789);
    }

    #[test]
    fn test_last_separator_is_decimal() {
        // A single separator is always read as decimal.
        assert_eq!(cents("1.234"), 123);
        assert_eq!(cents("29,9"), 2_990);
        assert_eq!(cents("29,"), 2_900);
    }

    #[test]
    fn test_whole_number_without_separator() {
        assert_eq!(cents("€49"), 4_900);
    }

    #[test]
    fn test_rounds_half_up_to_cents() {
        assert_eq!(cents("19.995"), 2_000);
        assert_eq!(cents("19.994"), 1_999);
    }

    #[test]
    fn test_markup_artifacts_are_ignored() {
        assert_eq!(cents("<span>29</span>,<span>99</span>€"), 2_999);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        for raw in ["1 234,56 €", "$ 12.30", "EUR\u{a0}7,05", "Prix : 99,00 €"] {
            let cleaned: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
                .collect();
            assert_eq!(parse_price(raw), parse_price(&cleaned), "{raw}");
        }
    }

    #[test]
    fn test_zero_rejected() {
        assert!(matches!(parse_price("€0"), Err(ParseError::NonPositive(_))));
        assert!(matches!(parse_price("0,00 €"), Err(ParseError::NonPositive(_))));
        assert!(matches!(parse_price("0.004"), Err(ParseError::NonPositive(_))));
    }

    #[test]
    fn test_empty_or_symbol_only_rejected() {
        assert!(matches!(parse_price(""), Err(ParseError::Empty(_))));
        assert!(matches!(parse_price("€"), Err(ParseError::Empty(_))));
        assert!(matches!(parse_price(",."), Err(ParseError::Empty(_))));
    }

    #[test]
    fn test_minus_sign_is_stripped() {
        // The sign never survives cleaning, so scraped prices are never negative.
        assert_eq!(cents("-5,00"), 500);
    }

    #[test]
    fn test_malformed_grouping_rejected() {
        assert!(matches!(parse_price("1.2.3"), Err(ParseError::Invalid(_))));
        assert!(matches!(parse_price("1,,50"), Err(ParseError::Invalid(_))));
        // A price container's text with the visible and screen-reader copies run together.
        assert!(matches!(
            parse_price("29,99 €29,99€"),
            Err(ParseError::Invalid(_))
        ));
        assert_eq!(cents("12.345.678,90"), 1_234_567_890);
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            parse_price("99999999999999999999999"),
            Err(ParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_display_and_from_str() {
        let p: Price = "1 234,5 €".parse().unwrap();
        assert_eq!(p.to_string(), "1234.50");
        assert_eq!(Price::from_cents(7).to_string(), "0.07");
        assert!((p.as_f64() - 1234.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distance() {
        let a = Price::from_cents(1_999);
        let b = Price::from_cents(2_000);
        assert_eq!(a.distance(b), 1);
        assert_eq!(b.distance(a), 1);
    }
}
