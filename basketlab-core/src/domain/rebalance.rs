//! Rebalancing-token phases and proposal payloads.

use crate::math::u256_dec;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the external rebalancing token.
///
/// `Default → Proposal → Rebalance → (Default | Drawdown)`. Managers only act
/// in `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebalanceState {
    Default,
    Proposal,
    Rebalance,
    Drawdown,
}

impl fmt::Display for RebalanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RebalanceState::Default => "Default",
            RebalanceState::Proposal => "Proposal",
            RebalanceState::Rebalance => "Rebalance",
            RebalanceState::Drawdown => "Drawdown",
        };
        f.write_str(s)
    }
}

/// Endpoints of a linear auction, in `AUCTION_PRICE_DIVISOR` units.
///
/// Derived fresh for every proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionPriceParameters {
    pub time_to_pivot: u64,
    #[serde(with = "u256_dec")]
    pub start_price: U256,
    #[serde(with = "u256_dec")]
    pub pivot_price: U256,
}

/// Everything the token needs to enter the proposal phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub next_set: Address,
    pub auction_library: Address,
    pub auction: AuctionPriceParameters,
}

/// Fees a manager may adjust on its token through the timelock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Streaming,
    Rebalance,
}

impl FeeKind {
    pub(crate) fn tag(self) -> u8 {
        match self {
            FeeKind::Streaming => 0,
            FeeKind::Rebalance => 1,
        }
    }
}

impl fmt::Display for FeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeKind::Streaming => f.write_str("streaming"),
            FeeKind::Rebalance => f.write_str("rebalance"),
        }
    }
}
