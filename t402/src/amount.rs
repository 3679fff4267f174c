//! Price parsing and atomic amount conversion.
//!
//! Resource servers declare prices in human terms (`"$0.10"`, `0.1`) or as
//! an explicit [`AssetAmount`]. Scheme servers turn them into atomic token
//! units with [`Price::to_asset_amount`].

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// A resolved token amount in atomic units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAmount {
    /// Amount in the asset's smallest unit, as a decimal string.
    pub amount: String,

    /// Asset address or identifier.
    pub asset: String,

    /// Scheme-specific metadata merged into the requirements' `extra`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl AssetAmount {
    /// Creates an asset amount with no extra metadata.
    #[must_use]
    pub fn new(amount: impl Into<String>, asset: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            asset: asset.into(),
            extra: Map::new(),
        }
    }
}

/// A price as declared by a resource server.
///
/// # JSON Format
///
/// Any of `"$0.10"`, `"0.10"`, `0.1`, or
/// `{"amount": "100000", "asset": "0x..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    /// Money string, optionally prefixed with `$`.
    Money(String),
    /// Bare JSON number in whole units.
    Number(serde_json::Number),
    /// Explicit atomic amount; passed through unchanged.
    Asset(AssetAmount),
}

impl From<&str> for Price {
    fn from(value: &str) -> Self {
        Self::Money(value.to_owned())
    }
}

impl From<AssetAmount> for Price {
    fn from(value: AssetAmount) -> Self {
        Self::Asset(value)
    }
}

impl Price {
    /// Resolves this price against the default asset of a network.
    ///
    /// An [`AssetAmount`] price is returned as-is; money and number prices
    /// are scaled by `10^decimals` and paired with `asset` and `extra`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the price is malformed, negative, or
    /// overflows the decimal range.
    pub fn to_asset_amount(
        &self,
        decimals: u32,
        asset: &str,
        extra: Map<String, Value>,
    ) -> Result<AssetAmount, ConfigError> {
        let value = match self {
            Self::Asset(amount) => return Ok(amount.clone()),
            Self::Money(s) => parse_money(s)?,
            Self::Number(n) => parse_money(&n.to_string())?,
        };
        Ok(AssetAmount {
            amount: to_atomic(value, decimals)?,
            asset: asset.to_owned(),
            extra,
        })
    }
}

/// Parses a money string such as `"$0.10"` or `" 1.5 "` into a decimal.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPrice`] for non-numeric input and
/// [`ConfigError::NegativePrice`] below zero.
pub fn parse_money(input: &str) -> Result<Decimal, ConfigError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    let value = Decimal::from_str(digits)
        .or_else(|_| Decimal::from_scientific(digits))
        .map_err(|_| ConfigError::InvalidPrice(input.to_owned()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ConfigError::NegativePrice(input.to_owned()));
    }
    Ok(value)
}

/// Scales a decimal by `10^decimals`, truncating toward zero.
///
/// # Errors
///
/// Returns [`ConfigError::PriceOverflow`] if the result does not fit.
pub fn to_atomic(value: Decimal, decimals: u32) -> Result<String, ConfigError> {
    let overflow = || ConfigError::PriceOverflow(value.to_string());
    let scale = 10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(overflow)?;
    let atomic = value.checked_mul(scale).ok_or_else(overflow)?.trunc();
    if atomic.is_zero() {
        return Ok("0".to_owned());
    }
    Ok(atomic.normalize().to_string())
}

/// Renders an atomic amount as a decimal string with trailing zeros removed.
///
/// `format_amount("1500000", 6)` yields `"1.5"`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidAmount`] if `atomic` is not a non-negative
/// integer.
pub fn format_amount(atomic: &str, decimals: u32) -> Result<String, ConfigError> {
    let value: u128 = atomic
        .parse()
        .map_err(|_| ConfigError::InvalidAmount(atomic.to_owned()))?;
    let divisor = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| ConfigError::InvalidAmount(atomic.to_owned()))?;
    let whole = value / divisor;
    let rem = value % divisor;
    if rem == 0 {
        return Ok(whole.to_string());
    }
    let width = decimals as usize;
    let frac = format!("{rem:0width$}");
    Ok(format!("{whole}.{}", frac.trim_end_matches('0')))
}
