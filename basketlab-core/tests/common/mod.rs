//! Shared fixtures: an ETH/USDC pair with seeded collateral sets.

#![allow(dead_code)]

use std::sync::Arc;

use basketlab_core::allocation::{AssetConfig, BinaryAllocator, InMemorySetRegistry};
use basketlab_core::domain::{Address, CollateralSet, U256};
use basketlab_core::feeds::{
    FeedConfig, FeedHandle, LinearizedDataSource, ManualPriceOracle, TimeSeriesFeed,
};
use basketlab_core::manager::{
    AuctionPriceModel, ManagerConfig, ProposalMode, TimeLockConfig,
};
use basketlab_core::math::{pow10, usd};

pub const T0: u64 = 1_700_000_000;
pub const HOUR: u64 = 3_600;
pub const DAY: u64 = 86_400;

pub fn weth() -> Address {
    Address::repeat_byte(0xee)
}

pub fn usdc() -> Address {
    Address::repeat_byte(0xcc)
}

pub fn owner() -> Address {
    Address::repeat_byte(0x0f)
}

pub fn dollars(s: &str) -> U256 {
    usd(s).unwrap()
}

pub struct Pair {
    pub registry: InMemorySetRegistry,
    pub eth: Arc<ManualPriceOracle>,
    pub dollar: Arc<ManualPriceOracle>,
    pub eth_set: Address,
    pub usdc_set: Address,
    pub allocator: BinaryAllocator,
}

/// One whole ETH set (10^6 / 10^6) and $150 of USDC (150 at 10^12).
pub fn pair(eth_price: &str) -> Pair {
    let eth = Arc::new(ManualPriceOracle::new("ETH", dollars(eth_price)));
    let dollar = Arc::new(ManualPriceOracle::new("USDC", dollars("1")));
    let mut registry = InMemorySetRegistry::new();
    let eth_set = registry
        .register(
            CollateralSet::new(
                Address::repeat_byte(0x01),
                vec![weth()],
                vec![U256::from(1_000_000u64)],
                U256::from(1_000_000u64),
            )
            .unwrap(),
        )
        .unwrap();
    let usdc_set = registry
        .register(
            CollateralSet::new(
                Address::repeat_byte(0x02),
                vec![usdc()],
                vec![U256::from(150u64)],
                pow10(12).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    let allocator = BinaryAllocator::new(
        AssetConfig::new(weth(), "WETH", 18, eth.clone()),
        AssetConfig::new(usdc(), "USDC", 6, dollar.clone()),
        eth_set,
        usdc_set,
        &registry,
    )
    .unwrap();
    Pair {
        registry,
        eth,
        dollar,
        eth_set,
        usdc_set,
        allocator,
    }
}

pub fn manager_config(mode: ProposalMode) -> ManagerConfig {
    ManagerConfig {
        auction_library: Address::repeat_byte(0xab),
        allocation_denominator: U256::from(100u64),
        bullish_base_asset_allocation: U256::from(100u64),
        initial_base_asset_allocation: U256::ZERO,
        auction_time_to_pivot: 14_400,
        auction_price_model: AuctionPriceModel::LinearBand {
            time_increment: 1_800,
        },
        proposal_mode: mode,
        time_lock: TimeLockConfig::default(),
    }
}

/// Daily feed over `spot`, seeded with `seeds` (chronological), first poke
/// accepted at `T0 + DAY`.
pub fn daily_feed(seeds: &[U256], spot: Arc<ManualPriceOracle>, capacity: usize) -> FeedHandle {
    let feed = TimeSeriesFeed::new(
        FeedConfig {
            description: "ETH daily".into(),
            update_interval: DAY,
            max_data_points: capacity,
            next_earliest_update: T0 + DAY,
        },
        seeds,
        T0,
        Box::new(LinearizedDataSource::new(spot, HOUR)),
    )
    .unwrap();
    FeedHandle::new(feed)
}
