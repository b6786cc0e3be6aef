//! Money helpers
//!
//! Amounts and balances are `Decimal` values with at most two fractional
//! digits (cents). Storage keeps them as integer minor units. Nothing here
//! rounds: a value with sub-cent precision is rejected, not adjusted.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::result::{Error, Result};

/// Number of fractional digits carried by every amount
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount, grant or balance, in minor units ($1,000,000,000,000,000.00).
/// Stays far inside `i64` cents, so sums of a few balances cannot overflow.
pub const MAX_MINOR_UNITS: i64 = 100_000_000_000_000_000;

/// [`MAX_MINOR_UNITS`] as a decimal value
pub fn max_balance() -> Decimal {
    Decimal::new(MAX_MINOR_UNITS, CURRENCY_SCALE)
}

/// Check that a value carries no more than cent precision
fn has_cent_precision(value: Decimal) -> bool {
    value.normalize().scale() <= CURRENCY_SCALE
}

/// Validate a transfer or ledger amount: positive, at most 2 decimals
pub fn validate_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if !has_cent_precision(amount) {
        return Err(Error::InvalidAmount(format!(
            "amount {} has more than {} decimal places",
            amount, CURRENCY_SCALE
        )));
    }
    if amount > max_balance() {
        return Err(Error::InvalidAmount(format!(
            "amount {} exceeds the maximum of {}",
            amount,
            max_balance()
        )));
    }
    Ok(amount)
}

/// Validate a starting grant set on approval (zero is allowed)
pub fn validate_grant(grant: Decimal) -> Result<Decimal> {
    if grant < Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "starting balance cannot be negative, got {}",
            grant
        )));
    }
    if !has_cent_precision(grant) {
        return Err(Error::InvalidAmount(format!(
            "starting balance {} has more than {} decimal places",
            grant, CURRENCY_SCALE
        )));
    }
    if grant > max_balance() {
        return Err(Error::InvalidAmount(format!(
            "starting balance {} exceeds the maximum of {}",
            grant,
            max_balance()
        )));
    }
    Ok(grant)
}

/// Convert a float held by a caller into an amount
///
/// NaN and infinities are rejected. The float is converted through its
/// shortest decimal representation, so `10.1` becomes exactly `10.1`.
pub fn amount_from_f64(value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(Error::InvalidAmount(format!("amount must be finite, got {}", value)));
    }
    let decimal = Decimal::from_str(&value.to_string())
        .map_err(|e| Error::InvalidAmount(format!("cannot represent {}: {}", value, e)))?;
    validate_amount(decimal)
}

/// Parse a user-entered amount such as `"250.00"` or `"12.5"`
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim().trim_start_matches('$');
    let decimal = Decimal::from_str(trimmed)
        .map_err(|_| Error::InvalidAmount(format!("'{}' is not a number", input.trim())))?;
    validate_amount(decimal)
}

/// Convert a cent-precision value into integer minor units
pub fn to_minor_units(value: Decimal) -> Result<i64> {
    if !has_cent_precision(value) {
        return Err(Error::InvalidAmount(format!(
            "{} has more than {} decimal places",
            value, CURRENCY_SCALE
        )));
    }
    value
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| Error::InvalidAmount(format!("{} is out of range", value)))
}

/// Convert integer minor units back into a decimal value
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, CURRENCY_SCALE)
}
