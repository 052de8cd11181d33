//! Domain types for basketlab

pub mod collateral;
pub mod context;
pub mod price;
pub mod rebalance;

pub use collateral::{CollateralError, CollateralKey, CollateralSet};
pub use context::CallContext;
pub use price::PricePoint;
pub use rebalance::{AuctionPriceParameters, FeeKind, Proposal, RebalanceState};

pub use alloy_primitives::{Address, U256};
