//! Manager configuration, fixed at construction.

use super::auction::AuctionPriceModel;
use super::timelock::TimeLockConfig;
use super::ManagerError;
use crate::math::u256_dec;
use crate::triggers::ConfirmationWindow;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Which proposal entry points the manager accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProposalMode {
    /// Single-shot `propose`.
    #[default]
    Direct,
    /// `initial_propose` then `confirm_propose` within `[min_time, max_time]`.
    Confirmed { min_time: u64, max_time: u64 },
}

impl ProposalMode {
    pub fn window(&self) -> ConfirmationWindow {
        match *self {
            ProposalMode::Direct => ConfirmationWindow {
                min_time: 0,
                max_time: 0,
            },
            ProposalMode::Confirmed { min_time, max_time } => {
                ConfirmationWindow { min_time, max_time }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProposalMode::Direct => "direct",
            ProposalMode::Confirmed { .. } => "confirmed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub auction_library: Address,
    #[serde(with = "u256_dec")]
    pub allocation_denominator: U256,
    #[serde(with = "u256_dec")]
    pub bullish_base_asset_allocation: U256,
    #[serde(with = "u256_dec")]
    pub initial_base_asset_allocation: U256,
    pub auction_time_to_pivot: u64,
    pub auction_price_model: AuctionPriceModel,
    #[serde(default)]
    pub proposal_mode: ProposalMode,
    #[serde(default)]
    pub time_lock: TimeLockConfig,
}

impl ManagerConfig {
    /// `denominator - bullish`; only meaningful after `validate`.
    pub fn bearish_base_asset_allocation(&self) -> U256 {
        self.allocation_denominator
            .saturating_sub(self.bullish_base_asset_allocation)
    }

    pub fn validate(&self) -> Result<(), ManagerError> {
        if self.allocation_denominator.is_zero() {
            return Err(ManagerError::InvalidConfig(
                "allocation denominator must be positive".into(),
            ));
        }
        if self.bullish_base_asset_allocation > self.allocation_denominator {
            return Err(ManagerError::InvalidConfig(format!(
                "bullish allocation {} exceeds denominator {}",
                self.bullish_base_asset_allocation, self.allocation_denominator
            )));
        }
        let initial = self.initial_base_asset_allocation;
        if initial != self.bullish_base_asset_allocation
            && initial != self.bearish_base_asset_allocation()
        {
            return Err(ManagerError::InvalidConfig(format!(
                "initial allocation {initial} is neither the bullish nor the bearish allocation"
            )));
        }
        self.proposal_mode.window().validate()?;
        self.auction_price_model
            .validate_for(self.auction_time_to_pivot)?;
        if self.time_lock.expiry_window == 0 {
            return Err(ManagerError::InvalidConfig(
                "time lock expiry window must be positive".into(),
            ));
        }
        Ok(())
    }
}
