//! Simple Moving Average (SMA) over the newest `period` feed values.

use super::{IndicatorError, MovingAverageSource};
use crate::feeds::{FeedError, FeedHandle, PriceHistory};
use crate::math;
use alloy_primitives::U256;

/// Floor of the arithmetic mean.
pub fn simple_moving_average(values: &[U256]) -> Result<U256, IndicatorError> {
    if values.is_empty() {
        return Err(IndicatorError::InsufficientData {
            required: 1,
            available: 0,
        });
    }
    let sum = values
        .iter()
        .try_fold(U256::ZERO, |acc, v| math::checked_add(acc, *v))?;
    Ok(math::checked_div(sum, U256::from(values.len()))?)
}

/// Moving-average price feed: SMA of the newest `n` recorded values.
#[derive(Clone)]
pub struct MovingAverageOracle {
    feed: FeedHandle,
}

impl MovingAverageOracle {
    pub fn new(feed: FeedHandle) -> Self {
        Self { feed }
    }

    pub fn read(&self, data_points: usize) -> Result<U256, FeedError> {
        if data_points == 0 {
            return Err(IndicatorError::InvalidPeriod(0).into());
        }
        let values = self.feed.read(data_points)?;
        Ok(simple_moving_average(&values)?)
    }

    pub fn feed(&self) -> &FeedHandle {
        &self.feed
    }
}

impl MovingAverageSource for MovingAverageOracle {
    fn kind(&self) -> &'static str {
        "sma"
    }

    fn moving_average(&self, period: usize) -> Result<U256, FeedError> {
        self.read(period)
    }
}
