//! Spot price versus moving average.
//!
//! Bullish while the spot price trades strictly above the moving average of
//! the configured period; at or below it the reading is bearish.

use super::{TriggerCondition, TriggerError};
use crate::feeds::PriceOracle;
use crate::indicators::MovingAverageSource;
use std::sync::Arc;

pub struct MovingAverageCrossover {
    spot: Arc<dyn PriceOracle>,
    average: Arc<dyn MovingAverageSource>,
    period: usize,
    name: String,
}

impl MovingAverageCrossover {
    pub fn new(
        spot: Arc<dyn PriceOracle>,
        average: Arc<dyn MovingAverageSource>,
        period: usize,
    ) -> Self {
        let name = format!("{}_{}_crossover", average.kind(), period);
        Self {
            spot,
            average,
            period,
            name,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl TriggerCondition for MovingAverageCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, _confirmed: bool) -> Result<bool, TriggerError> {
        let spot = self.spot.read()?;
        let average = self.average.moving_average(self.period)?;
        Ok(spot > average)
    }
}
