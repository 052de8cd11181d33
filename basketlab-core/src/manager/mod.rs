//! Rebalancing manager: turns the confirmed market direction into a
//! proposal on the rebalancing token.

pub mod asset_pair;
pub mod auction;
pub mod config;
pub mod timelock;
pub mod token;

pub use asset_pair::{AssetPairManager, ManagerEvent, ProposalOutcome};
pub use auction::{
    calculate_auction_price_parameters, fair_value, AuctionError, AuctionPriceModel,
    MAX_BAND_PERIODS,
};
pub use config::{ManagerConfig, ProposalMode};
pub use timelock::{
    TimeLock, TimeLockConfig, TimeLockError, TimeLockOutcome, UpgradeAction, UpgradeHash,
};
pub use token::{InMemoryRebalancingToken, RebalancingToken, TokenError};

use crate::allocation::AllocationError;
use crate::domain::RebalanceState;
use crate::error::ErrorCategory;
use crate::triggers::ConfirmationError;
use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    #[error("invalid manager configuration: {0}")]
    InvalidConfig(String),

    #[error("caller {sender} is not the owner")]
    Unauthorized { sender: Address },

    #[error("manager already initialized")]
    AlreadyInitialized,

    #[error("manager not initialized")]
    NotInitialized,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token {actual} is not the bound token {expected}")]
    TokenMismatch { expected: Address, actual: Address },

    #[error("token in {0} state, manager acts only in Default")]
    WrongState(RebalanceState),

    #[error("rebalance interval not elapsed: now {now}, available at {available_at}")]
    TooSoon { now: u64, available_at: u64 },

    #[error("allocation already matches the market direction")]
    NoChange,

    #[error("entry point not available in {mode} proposal mode")]
    WrongProposalMode { mode: &'static str },

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    TimeLock(#[from] TimeLockError),
}

impl ManagerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ManagerError::InvalidConfig(_)
            | ManagerError::InvalidToken(_)
            | ManagerError::TokenMismatch { .. } => ErrorCategory::Validation,
            ManagerError::Unauthorized { .. } => ErrorCategory::Authorization,
            ManagerError::AlreadyInitialized
            | ManagerError::NotInitialized
            | ManagerError::WrongState(_)
            | ManagerError::NoChange
            | ManagerError::WrongProposalMode { .. } => ErrorCategory::State,
            ManagerError::TooSoon { .. } => ErrorCategory::Timing,
            ManagerError::Confirmation(e) => e.category(),
            ManagerError::Allocation(e) => e.category(),
            ManagerError::Auction(e) => e.category(),
            ManagerError::Token(e) => e.category(),
            ManagerError::TimeLock(e) => e.category(),
        }
    }
}
