//! Exponential Moving Average (EMA).
//!
//! Integer recurrence: EMA[t] = (price*2 + EMA[t-1]*(period-1)) / (period+1).
//! This is the textbook `alpha = 2/(period+1)` step with a single floor
//! division at the end.

use super::{IndicatorError, MovingAverageSource};
use crate::feeds::{FeedError, FeedHandle, PriceHistory};
use crate::math;
use alloy_primitives::U256;
use std::collections::BTreeMap;

pub fn calculate_ema(
    previous: U256,
    time_period: u64,
    current_price: U256,
) -> Result<U256, IndicatorError> {
    if time_period == 0 {
        return Err(IndicatorError::InvalidPeriod(time_period));
    }
    let period = U256::from(time_period);
    let one = U256::from(1u64);

    let weighted_price = math::checked_mul(current_price, U256::from(2u64))?;
    let weighted_previous = math::checked_mul(previous, math::checked_sub(period, one)?)?;
    let sum = math::checked_add(weighted_price, weighted_previous)?;
    Ok(math::checked_div(sum, math::checked_add(period, one)?)?)
}

/// EMA feeds keyed by their period; `read(period)` is the latest EMA.
#[derive(Clone, Default)]
pub struct EmaOracle {
    feeds: BTreeMap<u64, FeedHandle>,
}

impl EmaOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feed(&mut self, period: u64, feed: FeedHandle) -> Result<(), FeedError> {
        if period == 0 {
            return Err(FeedError::InvalidConfig("EMA period must be >= 1".into()));
        }
        if self.feeds.contains_key(&period) {
            return Err(FeedError::InvalidConfig(format!(
                "EMA feed for period {period} already registered"
            )));
        }
        self.feeds.insert(period, feed);
        Ok(())
    }

    pub fn remove_feed(&mut self, period: u64) -> Result<FeedHandle, FeedError> {
        self.feeds
            .remove(&period)
            .ok_or(FeedError::UnknownPeriod(period))
    }

    pub fn periods(&self) -> impl Iterator<Item = u64> + '_ {
        self.feeds.keys().copied()
    }

    pub fn read(&self, period: u64) -> Result<U256, FeedError> {
        self.feeds
            .get(&period)
            .ok_or(FeedError::UnknownPeriod(period))?
            .latest()
    }
}

impl MovingAverageSource for EmaOracle {
    fn kind(&self) -> &'static str {
        "ema"
    }

    fn moving_average(&self, period: usize) -> Result<U256, FeedError> {
        self.read(period as u64)
    }
}
