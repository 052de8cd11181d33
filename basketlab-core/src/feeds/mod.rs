//! Price feeds: spot oracles, data sources, and interval-gated time series.
//!
//! A `TimeSeriesFeed` is poked by a keeper at most once per `update_interval`;
//! each poke asks its `DataSource` for the next value (a linearized spot
//! price or an EMA step) and appends it to a fixed-capacity ring. Readers get
//! the newest `n` values newest-first.

pub mod oracle;
pub mod source;
pub mod time_series;

pub use oracle::{ManualPriceOracle, OracleError, PriceOracle};
pub use source::{
    interpolate_delayed_price_update, DataSource, EmaDataSource, LinearizedDataSource,
};
pub use time_series::{FeedConfig, FeedHandle, FeedState, PriceHistory, TimeSeriesFeed};

use crate::error::ErrorCategory;
use crate::indicators::IndicatorError;
use crate::math::ArithmeticError;
use thiserror::Error;

/// Errors from feeds and the indicator oracles reading them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("invalid feed configuration: {0}")]
    InvalidConfig(String),

    #[error("not enough time elapsed since last update: now {now} < next earliest update {next_earliest_update}")]
    TooEarly { now: u64, next_earliest_update: u64 },

    #[error("insufficient history: requested {requested} data points, {available} available")]
    InsufficientHistory { requested: usize, available: usize },

    #[error("no feed registered for period {0}")]
    UnknownPeriod(u64),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error("feed arithmetic: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

impl FeedError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FeedError::InvalidConfig(_) | FeedError::UnknownPeriod(_) => ErrorCategory::Validation,
            FeedError::TooEarly { .. } => ErrorCategory::Timing,
            FeedError::InsufficientHistory { .. } => ErrorCategory::Data,
            FeedError::Oracle(e) => e.category(),
            FeedError::Indicator(e) => e.category(),
            FeedError::Arithmetic(_) => ErrorCategory::Data,
        }
    }
}
