//! User amount parsing.
//!
//! Raw input text becomes a fixed-point integer in the token's smallest
//! unit. Invalid or non-positive input yields `None` — the absent state —
//! never zero, so downstream gates can distinguish "nothing to act on"
//! from a zero balance.

use alloy::primitives::{utils::parse_units, U256};

/// Parse a user-entered amount into the token's smallest unit.
///
/// Returns `None` when the input is empty, non-numeric, non-finite, or
/// not strictly positive.
pub fn parse_amount(input: &str, decimals: u8) -> Option<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Mirror the numeric pre-check before fixed-point parsing so values
    // like "-1" or "NaN" never reach the unit conversion.
    let numeric: f64 = trimmed.parse().ok()?;
    if !numeric.is_finite() || numeric <= 0.0 {
        return None;
    }
    let parsed = parse_units(trimmed, decimals).ok()?;
    let value: U256 = parsed.get_absolute();
    if value.is_zero() {
        None
    } else {
        Some(value)
    }
}
