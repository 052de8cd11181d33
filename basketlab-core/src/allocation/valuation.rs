//! Dollar valuation of single-asset sets and the natural-unit search.
//!
//! Values are in cents, floor-rounded at every division.

use super::AllocationError;
use crate::feeds::PriceOracle;
use crate::math::{self, ArithmeticError, FULL_UNIT, VALUE_TO_CENTS_CONVERSION};
use alloy_primitives::{Address, U256};
use std::fmt;
use std::sync::Arc;

/// Largest natural unit the search will try (`10^36`).
pub const MAX_NATURAL_UNIT: U256 = U256::from_limbs([0xb34b_9f10_0000_0000, 0x00c0_97ce_7bc9_0715, 0, 0]);

/// Default starting point of the natural-unit search.
pub const DEFAULT_MIN_NATURAL_UNIT: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

/// One side of the pair: token address, decimals, and its USD price oracle.
#[derive(Clone)]
pub struct AssetConfig {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    pub oracle: Arc<dyn PriceOracle>,
}

impl AssetConfig {
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        decimals: u8,
        oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
            oracle,
        }
    }

    pub fn price(&self) -> Result<U256, AllocationError> {
        Ok(self.oracle.read()?)
    }
}

impl fmt::Debug for AssetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetConfig")
            .field("address", &self.address)
            .field("symbol", &self.symbol)
            .field("decimals", &self.decimals)
            .finish_non_exhaustive()
    }
}

/// `price * (units * FULL_UNIT / natural_unit) / 10^decimals / 10^16`.
pub fn calculate_set_value(
    price: U256,
    units: U256,
    natural_unit: U256,
    decimals: u8,
) -> Result<U256, ArithmeticError> {
    let per_full_set = math::mul_div(units, FULL_UNIT, natural_unit)?;
    value_of_full_set(price, per_full_set, decimals)
}

/// Cents value of `per_full_set` base units of an asset with `decimals`.
pub fn value_of_full_set(
    price: U256,
    per_full_set: U256,
    decimals: u8,
) -> Result<U256, ArithmeticError> {
    let value = math::mul_div(price, per_full_set, math::pow10(decimals.into())?)?;
    math::checked_div(value, VALUE_TO_CENTS_CONVERSION)
}

/// Units of the next asset worth `value` cents at `natural_unit`.
///
/// `value * 10^decimals * natural_unit / FULL_UNIT / (price / 10^16)`.
pub fn calculate_next_set_units(
    value: U256,
    next_price: U256,
    next_decimals: u8,
    natural_unit: U256,
) -> Result<U256, AllocationError> {
    let price_in_cents = math::checked_div(next_price, VALUE_TO_CENTS_CONVERSION)?;
    if price_in_cents.is_zero() {
        return Err(AllocationError::InvalidPrice { price: next_price });
    }
    let scaled = math::checked_mul(
        math::checked_mul(value, math::pow10(next_decimals.into())?)?,
        natural_unit,
    )?;
    let units = math::checked_div(math::checked_div(scaled, FULL_UNIT)?, price_in_cents)?;
    Ok(units)
}

/// Smallest power-of-ten natural unit, starting at `min_natural_unit`, that
/// gives at least one unit. Returns `(units, natural_unit)`.
pub fn search_natural_unit(
    value: U256,
    next_price: U256,
    next_decimals: u8,
    min_natural_unit: U256,
) -> Result<(U256, U256), AllocationError> {
    if value.is_zero() {
        return Err(AllocationError::ZeroValue);
    }
    let ten = U256::from(10u64);
    let mut natural_unit = min_natural_unit;
    while natural_unit <= MAX_NATURAL_UNIT {
        let units = calculate_next_set_units(value, next_price, next_decimals, natural_unit)?;
        if !units.is_zero() {
            return Ok((units, natural_unit));
        }
        natural_unit = math::checked_mul(natural_unit, ten)?;
    }
    Err(AllocationError::UnitsUnderflow {
        max_natural_unit: MAX_NATURAL_UNIT,
    })
}
