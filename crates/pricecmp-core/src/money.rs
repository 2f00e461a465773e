//! Currency parsing and the fixed `$0.00` rendering used in reports.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::CoreError;

/// Renders an amount as `$<amount>` with exactly two decimal places.
///
/// Midpoints round away from zero, so `2.005` renders as `"$2.01"`.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${rounded:.2}")
}

/// Parses a decimal amount as sources return it: `"12.5"`, `"12.50"`, or
/// a report string like `"$12.50"`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPrice`] if the trimmed text is not a decimal.
pub fn parse_price(raw: &str) -> Result<Decimal, CoreError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('$').unwrap_or(trimmed);
    Decimal::from_str(digits).map_err(|e| CoreError::InvalidPrice {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}
