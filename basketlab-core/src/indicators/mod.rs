//! Integer indicator library and the oracles that apply it to feeds.
//!
//! The pure functions (`calculate_ema`, `calculate_rsi`,
//! `simple_moving_average`) operate on `U256` with floor division and must
//! reproduce the reference integer results bit for bit. The oracle adapters
//! read windows from `PriceHistory` feeds, which return newest-first.

pub mod ema;
pub mod rsi;
pub mod sma;

pub use ema::{calculate_ema, EmaOracle};
pub use rsi::{calculate_rsi, RsiOracle};
pub use sma::{simple_moving_average, MovingAverageOracle};

use crate::error::ErrorCategory;
use crate::feeds::FeedError;
use crate::math::ArithmeticError;
use alloy_primitives::U256;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: {available} data points, at least {required} required")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid time period {0}")]
    InvalidPeriod(u64),

    #[error("indicator arithmetic: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

impl IndicatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IndicatorError::InvalidPeriod(_) => ErrorCategory::Validation,
            IndicatorError::InsufficientData { .. } | IndicatorError::Arithmetic(_) => {
                ErrorCategory::Data
            }
        }
    }
}

/// A moving average readable for a given period (SMA over a feed, or the
/// latest value of an EMA feed).
pub trait MovingAverageSource: Send + Sync {
    /// Short label, e.g. `"sma"` or `"ema"`.
    fn kind(&self) -> &'static str;

    fn moving_average(&self, period: usize) -> Result<U256, FeedError>;
}

/// Chronological test prices → newest-first `U256` window.
#[cfg(test)]
pub(crate) fn newest_first(chronological: &[u64]) -> Vec<U256> {
    chronological.iter().rev().map(|v| U256::from(*v)).collect()
}
