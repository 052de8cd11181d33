//! Linear-auction curve endpoints.
//!
//! Prices carry three implied decimals: a fair value of `1000` means the next
//! set is worth exactly the current set.

use crate::domain::AuctionPriceParameters;
use crate::error::ErrorCategory;
use crate::math::{self, ArithmeticError, AUCTION_PRICE_DIVISOR, HUNDRED};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("current set value is zero")]
    ZeroCurrentValue,

    #[error("auction time increment must be positive")]
    ZeroTimeIncrement,

    #[error("auction percentage {0} exceeds 100")]
    InvalidPercentage(u64),

    #[error("linear band of {periods} periods reaches the fair value (limit {max})")]
    BandTooWide { periods: U256, max: u64 },

    #[error("auction band {band} exceeds fair value {fair_value}")]
    StartPriceUnderflow { fair_value: U256, band: U256 },

    #[error("auction arithmetic: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

impl AuctionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuctionError::ZeroTimeIncrement
            | AuctionError::InvalidPercentage(_)
            | AuctionError::BandTooWide { .. } => {
                ErrorCategory::Validation
            }
            AuctionError::ZeroCurrentValue
            | AuctionError::StartPriceUnderflow { .. }
            | AuctionError::Arithmetic(_) => ErrorCategory::Data,
        }
    }
}

/// A linear band of this many 1% periods puts the start price at zero.
pub const MAX_BAND_PERIODS: u64 = 200;

/// How start and pivot prices are placed around the fair value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum AuctionPriceModel {
    /// Half the expected drift over `time_to_pivot` on each side, where the
    /// price moves 1% of fair value every `time_increment` seconds.
    LinearBand { time_increment: u64 },
    /// Fixed percentage offsets below and above fair value.
    PercentageOffsets {
        start_percentage: u64,
        pivot_percentage: u64,
    },
}

impl AuctionPriceModel {
    pub fn validate(&self) -> Result<(), AuctionError> {
        match *self {
            AuctionPriceModel::LinearBand { time_increment } => {
                if time_increment == 0 {
                    return Err(AuctionError::ZeroTimeIncrement);
                }
            }
            AuctionPriceModel::PercentageOffsets {
                start_percentage,
                pivot_percentage,
            } => {
                for pct in [start_percentage, pivot_percentage] {
                    if pct > 100 {
                        return Err(AuctionError::InvalidPercentage(pct));
                    }
                }
            }
        }
        Ok(())
    }

    /// `validate`, plus a linear band narrow enough to leave a positive
    /// start price at `time_to_pivot`.
    pub fn validate_for(&self, time_to_pivot: u64) -> Result<(), AuctionError> {
        self.validate()?;
        if let AuctionPriceModel::LinearBand { time_increment } = *self {
            let periods =
                math::div_round_half_up(U256::from(time_to_pivot), U256::from(time_increment))?;
            if periods >= U256::from(MAX_BAND_PERIODS) {
                return Err(AuctionError::BandTooWide {
                    periods,
                    max: MAX_BAND_PERIODS,
                });
            }
        }
        Ok(())
    }
}

/// `round_half_up(next * 1000 / current)`.
pub fn fair_value(current_value: U256, next_value: U256) -> Result<U256, AuctionError> {
    if current_value.is_zero() {
        return Err(AuctionError::ZeroCurrentValue);
    }
    let scaled = math::checked_mul(next_value, AUCTION_PRICE_DIVISOR)?;
    Ok(math::div_round_half_up(scaled, current_value)?)
}

pub fn calculate_auction_price_parameters(
    current_value: U256,
    next_value: U256,
    time_to_pivot: u64,
    model: AuctionPriceModel,
) -> Result<AuctionPriceParameters, AuctionError> {
    model.validate()?;
    let fair = fair_value(current_value, next_value)?;

    let (start_price, pivot_price) = match model {
        AuctionPriceModel::LinearBand { time_increment } => {
            let periods =
                math::div_round_half_up(U256::from(time_to_pivot), U256::from(time_increment))?;
            let percent_of_fair = math::div_round_half_up(fair, HUNDRED)?;
            let band = math::checked_div(
                math::checked_mul(periods, percent_of_fair)?,
                U256::from(2u64),
            )?;
            let start = fair
                .checked_sub(band)
                .ok_or(AuctionError::StartPriceUnderflow {
                    fair_value: fair,
                    band,
                })?;
            (start, math::checked_add(fair, band)?)
        }
        AuctionPriceModel::PercentageOffsets {
            start_percentage,
            pivot_percentage,
        } => {
            let below = math::mul_div(fair, U256::from(start_percentage), HUNDRED)?;
            let above = math::mul_div(fair, U256::from(pivot_percentage), HUNDRED)?;
            (math::checked_sub(fair, below)?, math::checked_add(fair, above)?)
        }
    };

    Ok(AuctionPriceParameters {
        time_to_pivot,
        start_price,
        pivot_price,
    })
}
