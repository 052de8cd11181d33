use crate::math::u256_dec;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// One recorded feed value. Immutable once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: u64,
    #[serde(with = "u256_dec")]
    pub value: U256,
}

impl PricePoint {
    pub fn new(timestamp: u64, value: U256) -> Self {
        Self { timestamp, value }
    }
}
