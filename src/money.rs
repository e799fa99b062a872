//! Money Module
//!
//! Conversion between client-facing amount strings, the `Decimal` values the
//! ledger stores, and the integer minor units hosted gateways expect.
//!
//! ## Design Principles
//! 1. Amounts are `rust_decimal::Decimal` end to end; never floats
//! 2. Explicit errors: no silent truncation of client input
//! 3. Currency exponent table is the single source for minor-unit scaling
//!
//! ## Usage
//! ```rust
//! use payment_core::money::{parse_amount, to_minor_units};
//!
//! let amount = parse_amount("12.50").unwrap();
//! assert_eq!(to_minor_units(amount, "USD").unwrap(), 1250);
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Money conversion errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Precision overflow: {provided} decimals, {currency} allows {max}")]
    PrecisionOverflow {
        currency: String,
        provided: u32,
        max: u32,
    },

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}

/// Currencies without a minor unit in practice.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["IDR", "JPY", "KRW", "VND"];

/// Number of minor-unit decimals for an ISO-4217 code.
pub fn currency_exponent(currency: &str) -> u32 {
    if ZERO_DECIMAL_CURRENCIES.contains(&currency) {
        0
    } else {
        2
    }
}

/// Normalize and validate a three-letter currency code ("idr" -> "IDR").
pub fn normalize_currency(code: &str) -> Result<String, MoneyError> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(MoneyError::InvalidCurrency(code.to_string()));
    }
    Ok(code.to_ascii_uppercase())
}

/// Parse a client amount string into a positive `Decimal`.
///
/// Accepts `"100"`, `"100.5"`; rejects signs, exponents, `".5"` and `"5."`.
pub fn parse_amount(amount_str: &str) -> Result<Decimal, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let parts: Vec<&str> = amount_str.split('.').collect();
    match parts.len() {
        1 => {}
        2 => {
            if parts[0].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if parts[1].is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
        }
        _ => return Err(MoneyError::InvalidFormat("multiple decimal points".into())),
    }

    if !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid characters in '{}'",
            amount_str
        )));
    }

    let value = Decimal::from_str(amount_str).map_err(|_| MoneyError::Overflow)?;
    if value <= Decimal::ZERO {
        return Err(MoneyError::InvalidAmount);
    }
    Ok(value)
}

/// Scale a major-unit amount into integer minor units for `currency`.
///
/// Fails if the amount carries more decimals than the currency allows.
pub fn to_minor_units(amount: Decimal, currency: &str) -> Result<i64, MoneyError> {
    let exponent = currency_exponent(currency);
    let normalized = amount.normalize();
    if normalized.scale() > exponent {
        return Err(MoneyError::PrecisionOverflow {
            currency: currency.to_string(),
            provided: normalized.scale(),
            max: exponent,
        });
    }
    let factor = Decimal::from(10u64.pow(exponent));
    normalized
        .checked_mul(factor)
        .and_then(|v| v.to_i64())
        .ok_or(MoneyError::Overflow)
}

/// Convert gateway minor units back to a major-unit `Decimal`.
pub fn from_minor_units(minor: i64, currency: &str) -> Decimal {
    Decimal::new(minor, currency_exponent(currency))
}
