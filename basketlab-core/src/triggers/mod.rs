//! Bullish/bearish signal trigger with a confirmation window.
//!
//! A `Trigger` pairs a `Confirmable<bool>` with a `TriggerCondition`. The
//! condition is evaluated on both `initial_trigger` and `confirm_trigger`, so
//! a signal that reverts during the waiting window cannot be confirmed.

pub mod confirmation;
pub mod ma_crossover;
pub mod rsi_trending;

pub use confirmation::{
    Confirmable, ConfirmationError, ConfirmationWindow, Pending, Transition,
};
pub use ma_crossover::MovingAverageCrossover;
pub use rsi_trending::RsiTrending;

use crate::error::ErrorCategory;
use crate::feeds::{FeedError, OracleError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error("trigger input: {0}")]
    Feed(#[from] FeedError),

    #[error("trigger input: {0}")]
    Oracle(#[from] OracleError),

    #[error("invalid RSI bounds: lower {lower}, upper {upper}")]
    InvalidBounds { lower: u64, upper: u64 },
}

impl TriggerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TriggerError::Confirmation(e) => e.category(),
            TriggerError::Feed(e) => e.category(),
            TriggerError::Oracle(e) => e.category(),
            TriggerError::InvalidBounds { .. } => ErrorCategory::Validation,
        }
    }
}

/// Market reading behind a trigger.
pub trait TriggerCondition: Send + Sync {
    fn name(&self) -> &str;

    /// Current bullish reading. `confirmed` is the trigger's confirmed state,
    /// for conditions with a neutral band that hold the previous state.
    fn evaluate(&self, confirmed: bool) -> Result<bool, TriggerError>;
}

/// Anything the manager can ask for the confirmed market direction.
pub trait BullishSignal {
    fn is_bullish(&self) -> bool;
}

/// Fixed direction, for callers that decide the signal themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSignal(pub bool);

impl BullishSignal for StaticSignal {
    fn is_bullish(&self) -> bool {
        self.0
    }
}

/// Emitted on every confirmed flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerFlipped {
    pub flip_to: bool,
    pub flipped_index: u64,
    pub timestamp: u64,
}

impl From<Transition<bool>> for TriggerFlipped {
    fn from(t: Transition<bool>) -> Self {
        Self {
            flip_to: t.to,
            flipped_index: t.flipped_index,
            timestamp: t.timestamp,
        }
    }
}

/// Scenario-file form of a trigger's timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(flatten)]
    pub window: ConfirmationWindow,
    /// Defaults to `window.max_time`.
    #[serde(default)]
    pub retrigger_interval: Option<u64>,
    #[serde(default)]
    pub initial_bullish: bool,
}

pub struct Trigger {
    state: Confirmable<bool>,
    condition: Box<dyn TriggerCondition>,
    events: Vec<TriggerFlipped>,
}

impl Trigger {
    pub fn new(
        condition: Box<dyn TriggerCondition>,
        window: ConfirmationWindow,
        initial_bullish: bool,
    ) -> Result<Self, TriggerError> {
        Ok(Self {
            state: Confirmable::new(initial_bullish, window)?,
            condition,
            events: Vec::new(),
        })
    }

    pub fn from_config(
        condition: Box<dyn TriggerCondition>,
        config: &TriggerConfig,
    ) -> Result<Self, TriggerError> {
        let mut trigger = Self::new(condition, config.window, config.initial_bullish)?;
        if let Some(interval) = config.retrigger_interval {
            trigger.state = trigger.state.with_retrigger_interval(interval);
        }
        Ok(trigger)
    }

    fn observe(&self) -> Result<bool, TriggerError> {
        self.condition.evaluate(self.state.confirmed())
    }

    /// Start the confirmation window if the condition disagrees with the
    /// confirmed state.
    pub fn initial_trigger(&mut self, now: u64) -> Result<Pending<bool>, TriggerError> {
        let observed = self.observe()?;
        let pending = self.state.initiate(now, observed)?;
        debug!(
            condition = self.condition.name(),
            candidate = observed,
            since = now,
            "trigger initiated"
        );
        Ok(pending)
    }

    pub fn confirm_trigger(&mut self, now: u64) -> Result<TriggerFlipped, TriggerError> {
        let observed = self.observe()?;
        let event = TriggerFlipped::from(self.state.confirm(now, observed)?);
        info!(
            condition = self.condition.name(),
            flip_to = event.flip_to,
            flipped_index = event.flipped_index,
            timestamp = event.timestamp,
            "trigger flipped"
        );
        self.events.push(event);
        Ok(event)
    }

    /// False on any input error as well as on a failing guard.
    pub fn can_initial_trigger(&self, now: u64) -> bool {
        self.observe()
            .map(|observed| self.state.can_initiate(now, observed))
            .unwrap_or(false)
    }

    pub fn can_confirm_trigger(&self, now: u64) -> bool {
        self.observe()
            .map(|observed| self.state.can_confirm(now, observed))
            .unwrap_or(false)
    }

    pub fn is_bullish(&self) -> bool {
        self.state.confirmed()
    }

    pub fn flipped_index(&self) -> u64 {
        self.state.flipped_index()
    }

    pub fn pending(&self) -> Option<Pending<bool>> {
        self.state.pending()
    }

    pub fn state(&self) -> &Confirmable<bool> {
        &self.state
    }

    pub fn condition_name(&self) -> &str {
        self.condition.name()
    }

    pub fn events(&self) -> &[TriggerFlipped] {
        &self.events
    }
}

impl BullishSignal for Trigger {
    fn is_bullish(&self) -> bool {
        Trigger::is_bullish(self)
    }
}
