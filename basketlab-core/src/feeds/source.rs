//! Data sources: how a feed turns an oracle reading into its next value.

use super::{FeedError, FeedState, PriceOracle};
use crate::indicators::ema::calculate_ema;
use crate::math::{self, ArithmeticError};
use alloy_primitives::U256;
use std::sync::Arc;

/// Produces the next value of a feed at `now`.
///
/// Called only once the feed's update window is open, so
/// `now >= state.next_earliest_update`.
pub trait DataSource: Send + Sync {
    fn next_value(&self, state: &FeedState, now: u64) -> Result<U256, FeedError>;
}

/// Imply the price at the expected update time when a poke arrives late.
///
/// Linear interpolation between the last logged value (one `update_interval`
/// before the expected update) and the current reading (`late` seconds after
/// it): `(current * interval + previous * late) / (late + interval)`, floor.
pub fn interpolate_delayed_price_update(
    current: U256,
    update_interval: u64,
    time_from_expected_update: u64,
    previous: U256,
) -> Result<U256, ArithmeticError> {
    let interval = U256::from(update_interval);
    let late = U256::from(time_from_expected_update);
    let time_from_last_update = math::checked_add(late, interval)?;
    let weighted = math::checked_add(
        math::checked_mul(current, interval)?,
        math::checked_mul(previous, late)?,
    )?;
    math::checked_div(weighted, time_from_last_update)
}

fn time_from_expected_update(state: &FeedState, now: u64) -> u64 {
    now.saturating_sub(state.next_earliest_update)
}

/// Spot price with linear interpolation across missed updates.
///
/// On-time pokes (`late < interpolation_threshold`) record the raw reading.
pub struct LinearizedDataSource {
    oracle: Arc<dyn PriceOracle>,
    interpolation_threshold: u64,
}

impl LinearizedDataSource {
    pub fn new(oracle: Arc<dyn PriceOracle>, interpolation_threshold: u64) -> Self {
        Self {
            oracle,
            interpolation_threshold,
        }
    }

    pub fn interpolation_threshold(&self) -> u64 {
        self.interpolation_threshold
    }
}

impl DataSource for LinearizedDataSource {
    fn next_value(&self, state: &FeedState, now: u64) -> Result<U256, FeedError> {
        let reading = self.oracle.read()?;
        let late = time_from_expected_update(state, now);
        if late < self.interpolation_threshold {
            return Ok(reading);
        }
        Ok(interpolate_delayed_price_update(
            reading,
            state.update_interval,
            late,
            state.latest_value,
        )?)
    }
}

/// Exponential moving average stepped once per update.
///
/// The previous EMA is the feed's latest value; late pokes interpolate
/// between the previous and the freshly computed EMA.
pub struct EmaDataSource {
    oracle: Arc<dyn PriceOracle>,
    ema_period: u64,
    interpolation_threshold: u64,
}

impl EmaDataSource {
    pub fn new(
        oracle: Arc<dyn PriceOracle>,
        ema_period: u64,
        interpolation_threshold: u64,
    ) -> Result<Self, FeedError> {
        if ema_period == 0 {
            return Err(FeedError::InvalidConfig("EMA period must be >= 1".into()));
        }
        Ok(Self {
            oracle,
            ema_period,
            interpolation_threshold,
        })
    }

    pub fn ema_period(&self) -> u64 {
        self.ema_period
    }
}

impl DataSource for EmaDataSource {
    fn next_value(&self, state: &FeedState, now: u64) -> Result<U256, FeedError> {
        let reading = self.oracle.read()?;
        let ema = calculate_ema(state.latest_value, self.ema_period, reading)?;
        let late = time_from_expected_update(state, now);
        if late < self.interpolation_threshold {
            return Ok(ema);
        }
        Ok(interpolate_delayed_price_update(
            ema,
            state.update_interval,
            late,
            state.latest_value,
        )?)
    }
}
