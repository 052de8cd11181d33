//! Collateral sets: fixed bundles of components at per-unit quantities.

use crate::math::{self, u256_dec, u256_dec_seq, ArithmeticError, FULL_UNIT};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollateralError {
    #[error("collateral set has no components")]
    NoComponents,
    #[error("components ({components}) and units ({units}) differ in length")]
    LengthMismatch { components: usize, units: usize },
    #[error("natural unit must be positive")]
    ZeroNaturalUnit,
    #[error("unit for component {0} is zero")]
    ZeroUnit(Address),
}

/// A registered basket: `components[i]` circulates `units[i] * FULL_UNIT /
/// natural_unit` base units per whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralSet {
    pub address: Address,
    components: Vec<Address>,
    #[serde(with = "u256_dec_seq")]
    units: Vec<U256>,
    #[serde(with = "u256_dec")]
    natural_unit: U256,
}

impl CollateralSet {
    pub fn new(
        address: Address,
        components: Vec<Address>,
        units: Vec<U256>,
        natural_unit: U256,
    ) -> Result<Self, CollateralError> {
        if components.is_empty() {
            return Err(CollateralError::NoComponents);
        }
        if components.len() != units.len() {
            return Err(CollateralError::LengthMismatch {
                components: components.len(),
                units: units.len(),
            });
        }
        if natural_unit.is_zero() {
            return Err(CollateralError::ZeroNaturalUnit);
        }
        if let Some((component, _)) = components.iter().zip(&units).find(|(_, u)| u.is_zero()) {
            return Err(CollateralError::ZeroUnit(*component));
        }
        Ok(Self {
            address,
            components,
            units,
            natural_unit,
        })
    }

    pub fn get_components(&self) -> &[Address] {
        &self.components
    }

    pub fn get_units(&self) -> &[U256] {
        &self.units
    }

    pub fn natural_unit(&self) -> U256 {
        self.natural_unit
    }

    /// The only component of a single-asset set.
    pub fn single_component(&self) -> Option<(Address, U256)> {
        match (self.components.as_slice(), self.units.as_slice()) {
            ([component], [units]) => Some((*component, *units)),
            _ => None,
        }
    }

    /// Base units of component `index` backing one whole set.
    pub fn units_per_full_set(&self, index: usize) -> Result<Option<U256>, ArithmeticError> {
        match self.units.get(index) {
            Some(units) => Ok(Some(math::mul_div(*units, FULL_UNIT, self.natural_unit)?)),
            None => Ok(None),
        }
    }

    pub fn key(&self) -> CollateralKey {
        CollateralKey::new(&self.components, &self.units, self.natural_unit)
    }
}

/// Content hash of `(units, natural_unit, components)`.
///
/// Two sets with the same composition share a key, which lets the allocator
/// reuse an existing set instead of deploying a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollateralKey([u8; 32]);

impl CollateralKey {
    pub fn new(components: &[Address], units: &[U256], natural_unit: U256) -> Self {
        let mut hasher = blake3::Hasher::new();
        for u in units {
            hasher.update(&u.to_be_bytes::<32>());
        }
        hasher.update(&natural_unit.to_be_bytes::<32>());
        for c in components {
            hasher.update(c.as_slice());
        }
        Self(*hasher.finalize().as_bytes())
    }

    pub fn single(component: Address, units: U256, natural_unit: U256) -> Self {
        Self::new(&[component], &[units], natural_unit)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CollateralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", blake3::Hash::from(self.0).to_hex())
    }
}
