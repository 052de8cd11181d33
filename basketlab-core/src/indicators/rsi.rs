//! Relative Strength Index (RSI), simplified integer form.
//!
//! RSI = 100 - floor(100 * negative / (positive + negative)).
//!
//! Input is newest-first, as returned by feeds: `prices[i - 1]` is the later
//! observation and `prices[i]` the earlier one. A rise from `prices[i]` to
//! `prices[i - 1]` counts as positive. Equal neighbours add zero to the
//! negative sum.
//! Edge case: both sums zero → negative sum is 1, so a flat series reads 0.

use super::IndicatorError;
use crate::feeds::{FeedError, FeedHandle, PriceHistory};
use crate::math::{self, HUNDRED};
use alloy_primitives::U256;

pub fn calculate_rsi(prices: &[U256]) -> Result<U256, IndicatorError> {
    if prices.len() < 2 {
        return Err(IndicatorError::InsufficientData {
            required: 2,
            available: prices.len(),
        });
    }

    let mut positive_sum = U256::ZERO;
    let mut negative_sum = U256::ZERO;
    for pair in prices.windows(2) {
        let (current, previous) = (pair[0], pair[1]);
        if current > previous {
            positive_sum = math::checked_add(positive_sum, current - previous)?;
        } else {
            negative_sum = math::checked_add(negative_sum, previous - current)?;
        }
    }

    if positive_sum.is_zero() && negative_sum.is_zero() {
        negative_sum = U256::from(1u64);
    }

    let total = math::checked_add(positive_sum, negative_sum)?;
    let negative_share = math::mul_div(negative_sum, HUNDRED, total)?;
    Ok(math::checked_sub(HUNDRED, negative_share)?)
}

/// RSI over the newest `period + 1` values of a feed.
#[derive(Clone)]
pub struct RsiOracle {
    feed: FeedHandle,
}

impl RsiOracle {
    pub fn new(feed: FeedHandle) -> Self {
        Self { feed }
    }

    pub fn read(&self, period: usize) -> Result<U256, FeedError> {
        if period == 0 {
            return Err(IndicatorError::InvalidPeriod(0).into());
        }
        let prices = self.feed.read(period + 1)?;
        Ok(calculate_rsi(&prices)?)
    }
}
