//! Binary allocation pricing: rotate a single-asset set fully into the other
//! asset at equal dollar value.

pub mod binary;
pub mod registry;
pub mod valuation;

pub use binary::{AllocationPlan, AllocationResult, BinaryAllocator};
pub use registry::{CreateSetRequest, InMemorySetRegistry, RegistryError, SetRegistry};
pub use valuation::{
    calculate_next_set_units, calculate_set_value, search_natural_unit, value_of_full_set,
    AssetConfig, DEFAULT_MIN_NATURAL_UNIT, MAX_NATURAL_UNIT,
};

use crate::error::ErrorCategory;
use crate::feeds::OracleError;
use crate::math::ArithmeticError;
use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("invalid collateral set {set}: {reason}")]
    InvalidCollateral { set: Address, reason: String },

    #[error("target allocation {target} must be 0 or {denominator}")]
    InvalidTarget { target: U256, denominator: U256 },

    #[error("set {set} already holds the target asset")]
    AllocationUnchanged { set: Address },

    #[error("current set is worth zero cents")]
    ZeroValue,

    #[error("price {price} is below one cent")]
    InvalidPrice { price: U256 },

    #[error("no natural unit up to {max_natural_unit} yields a positive unit count")]
    UnitsUnderflow { max_natural_unit: U256 },

    #[error("invalid allocator configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("allocation arithmetic: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

impl AllocationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AllocationError::InvalidTarget { .. } | AllocationError::InvalidConfig(_) => {
                ErrorCategory::Validation
            }
            AllocationError::AllocationUnchanged { .. } => ErrorCategory::State,
            AllocationError::Registry(e) => e.category(),
            AllocationError::Oracle(e) => e.category(),
            AllocationError::InvalidCollateral { .. }
            | AllocationError::ZeroValue
            | AllocationError::InvalidPrice { .. }
            | AllocationError::UnitsUnderflow { .. }
            | AllocationError::Arithmetic(_) => ErrorCategory::Data,
        }
    }
}
