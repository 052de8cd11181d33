//! basketlab core: the allocation and auction engine of a two-asset
//! basket-rebalancing protocol.
//!
//! - Price history feeds poked at a fixed interval, with linear interpolation
//!   across missed updates
//! - Integer indicator library (EMA, RSI, SMA) and oracles over the feeds
//! - Signal triggers gated by a two-phase confirmation window
//! - A binary allocator that rotates a single-asset collateral set into the
//!   other asset at equal dollar value
//! - The rebalancing manager that turns a confirmed signal into a linear
//!   auction proposal on the rebalancing token
//!
//! Every call is serialized and either completes or leaves state untouched.
//! Time is a caller-supplied timestamp in seconds.

pub mod allocation;
pub mod domain;
pub mod error;
pub mod feeds;
pub mod indicators;
pub mod manager;
pub mod math;
pub mod triggers;

pub use error::ErrorCategory;
