//! Price formatting using decimal arithmetic.
//!
//! Prices travel as `rust_decimal::Decimal` so that line totals and subtotals
//! stay exact. The stock API sends prices as JSON numbers; persisted carts
//! store them as strings. Both forms deserialize.

use rust_decimal::Decimal;

/// Format a price for display, e.g. `$139.90`.
///
/// Rounds to cents with `Decimal::round_dp` (banker's rounding), then always
/// shows two decimal places.
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    format!("${rounded:.2}")
}
