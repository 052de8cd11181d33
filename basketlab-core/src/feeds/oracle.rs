//! Spot price oracles.

use crate::error::ErrorCategory;
use alloy_primitives::U256;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle '{0}' has no valid price")]
    NoPrice(String),
}

impl OracleError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Data
    }
}

/// Latest USD price of an asset, scaled by `10^18`.
pub trait PriceOracle: Send + Sync {
    fn read(&self) -> Result<U256, OracleError>;
}

/// Oracle whose price is set by its owner.
///
/// Stands in for a medianizer: the simulator and tests move the price between
/// calls. A zero price means "no valid reading".
#[derive(Debug)]
pub struct ManualPriceOracle {
    name: String,
    price: RwLock<U256>,
}

impl ManualPriceOracle {
    pub fn new(name: impl Into<String>, price: U256) -> Self {
        Self {
            name: name.into(),
            price: RwLock::new(price),
        }
    }

    pub fn set_price(&self, price: U256) {
        *self.price.write().unwrap_or_else(PoisonError::into_inner) = price;
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PriceOracle for ManualPriceOracle {
    fn read(&self) -> Result<U256, OracleError> {
        let price = *self.price.read().unwrap_or_else(PoisonError::into_inner);
        if price.is_zero() {
            return Err(OracleError::NoPrice(self.name.clone()));
        }
        Ok(price)
    }
}
