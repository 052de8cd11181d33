//! RSI trend band: bullish at or above `upper`, bearish below `lower`,
//! and unchanged in between.

use super::{TriggerCondition, TriggerError};
use crate::indicators::RsiOracle;
use alloy_primitives::U256;

pub struct RsiTrending {
    rsi: RsiOracle,
    lower: u64,
    upper: u64,
    period: usize,
}

impl RsiTrending {
    pub fn new(rsi: RsiOracle, lower: u64, upper: u64, period: usize) -> Result<Self, TriggerError> {
        if lower > upper || upper > 100 {
            return Err(TriggerError::InvalidBounds { lower, upper });
        }
        Ok(Self {
            rsi,
            lower,
            upper,
            period,
        })
    }

    pub fn bounds(&self) -> (u64, u64) {
        (self.lower, self.upper)
    }
}

impl TriggerCondition for RsiTrending {
    fn name(&self) -> &str {
        "rsi_trending"
    }

    fn evaluate(&self, confirmed: bool) -> Result<bool, TriggerError> {
        let rsi = self.rsi.read(self.period)?;
        if rsi >= U256::from(self.upper) {
            Ok(true)
        } else if rsi < U256::from(self.lower) {
            Ok(false)
        } else {
            Ok(confirmed)
        }
    }
}
