//! Fixed-point helpers over `U256`.
//!
//! Prices are USD values scaled by `10^18`. Set values are expressed in cents.
//! Every helper is checked: overflow and division by zero surface as
//! `ArithmeticError` instead of wrapping or panicking.

use alloy_primitives::U256;
use thiserror::Error;

/// Decimals of every oracle price (`150 USD == 150 * 10^18`).
pub const PRICE_DECIMALS: u8 = 18;

/// One whole collateral set, in set base units (`10^18`).
pub const FULL_UNIT: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Converts a `10^18`-scaled dollar value into cents.
pub const VALUE_TO_CENTS_CONVERSION: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

/// Auction prices carry three implied decimals (`1000 == 1.000`).
pub const AUCTION_PRICE_DIVISOR: U256 = U256::from_limbs([1_000, 0, 0, 0]);

/// Percent denominator.
pub const HUNDRED: U256 = U256::from_limbs([100, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic underflow")]
    Underflow,
}

/// `10^exp` as a `U256`.
pub fn pow10(exp: u32) -> Result<U256, ArithmeticError> {
    U256::from(10u64)
        .checked_pow(U256::from(exp))
        .ok_or(ArithmeticError::Overflow)
}

pub fn checked_add(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow)
}

pub fn checked_sub(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_sub(b).ok_or(ArithmeticError::Underflow)
}

pub fn checked_mul(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_mul(b).ok_or(ArithmeticError::Overflow)
}

/// Floor division.
pub fn checked_div(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_div(b).ok_or(ArithmeticError::DivisionByZero)
}

/// `floor(a * b / d)`.
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256, ArithmeticError> {
    checked_div(checked_mul(a, b)?, d)
}

/// Division rounding half away from zero: `floor((2n + d) / 2d)`.
///
/// `div_round_half_up(15, 10) == 2`, `div_round_half_up(14, 10) == 1`.
pub fn div_round_half_up(n: U256, d: U256) -> Result<U256, ArithmeticError> {
    if d.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }
    let two = U256::from(2u64);
    let numerator = checked_add(checked_mul(n, two)?, d)?;
    checked_div(numerator, checked_mul(d, two)?)
}

/// Errors from parsing human-readable decimal amounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount '{input}' has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u8 },
    #[error("amount '{0}' overflows 256 bits")]
    Overflow(String),
}

/// Parse a decimal string such as `"150.25"` into a fixed-point `U256` with
/// `decimals` fractional digits.
pub fn parse_scaled(input: &str, decimals: u8) -> Result<U256, ParseAmountError> {
    let trimmed = input.trim().replace('_', "");
    if trimmed.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed.as_str(), ""),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(ParseAmountError::Invalid(input.to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(ParseAmountError::TooPrecise {
            input: input.to_string(),
            decimals,
        });
    }

    let padded = format!(
        "{}{}{}",
        if whole.is_empty() { "0" } else { whole },
        fraction,
        "0".repeat(decimals as usize - fraction.len())
    );
    U256::from_str_radix(&padded, 10).map_err(|_| ParseAmountError::Overflow(input.to_string()))
}

/// Render a fixed-point value with `decimals` fractional digits, trimming
/// trailing zeros (`150500000000000000000` at 18 decimals → `"150.5"`).
pub fn format_scaled(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Parse a dollar amount into an 18-decimal oracle price.
pub fn usd(input: &str) -> Result<U256, ParseAmountError> {
    parse_scaled(input, PRICE_DECIMALS)
}

/// Serde adapter: `U256` as a decimal string (integers are accepted on input).
pub mod u256_dec {
    use alloy_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
    }

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(U256::from(v)),
            Raw::Text(s) => U256::from_str_radix(s.trim(), 10).map_err(de::Error::custom),
        }
    }
}

/// Serde adapter: `Vec<U256>` as a list of decimal strings.
pub mod u256_dec_seq {
    use alloy_primitives::U256;
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<U256>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| U256::from_str_radix(s.trim(), 10).map_err(de::Error::custom))
            .collect()
    }
}

/// Serde adapter: 18-decimal dollar prices written as `"150.25"`.
pub mod usd_price {
    use super::{format_scaled, parse_scaled, PRICE_DECIMALS};
    use alloy_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_scaled(*value, PRICE_DECIMALS))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_scaled(&s, PRICE_DECIMALS).map_err(de::Error::custom)
    }
}
