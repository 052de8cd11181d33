//! Criterion benchmarks for basketlab hot paths.
//!
//! Benchmarks:
//! 1. Indicator math over feed-sized windows (RSI, SMA, EMA recurrence)
//! 2. Natural-unit search and set valuation
//! 3. Full allocation: cache hit vs. new set

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use basketlab_core::allocation::{
    search_natural_unit, AssetConfig, BinaryAllocator, InMemorySetRegistry, DEFAULT_MIN_NATURAL_UNIT,
};
use basketlab_core::domain::{Address, CollateralSet, U256};
use basketlab_core::feeds::ManualPriceOracle;
use basketlab_core::indicators::{calculate_ema, calculate_rsi, simple_moving_average};
use basketlab_core::manager::{calculate_auction_price_parameters, AuctionPriceModel};
use basketlab_core::math::{pow10, usd};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_prices(n: usize) -> Vec<U256> {
    (0..n)
        .map(|i| {
            let cents = 15_000 + ((i as f64 * 0.1).sin() * 2_000.0) as i64;
            U256::from(cents as u64) * pow10(16).unwrap()
        })
        .collect()
}

struct Pair {
    registry: InMemorySetRegistry,
    allocator: BinaryAllocator,
    eth: Arc<ManualPriceOracle>,
    usdc_set: Address,
}

fn make_pair() -> Pair {
    let eth = Arc::new(ManualPriceOracle::new("ETH", usd("150").unwrap()));
    let mut registry = InMemorySetRegistry::new();
    let eth_set = registry
        .register(
            CollateralSet::new(
                Address::repeat_byte(0x01),
                vec![Address::repeat_byte(0xee)],
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
                vec![Address::repeat_byte(0xcc)],
                vec![U256::from(150u64)],
                pow10(12).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    let allocator = BinaryAllocator::new(
        AssetConfig::new(Address::repeat_byte(0xee), "WETH", 18, eth.clone()),
        AssetConfig::new(
            Address::repeat_byte(0xcc),
            "USDC",
            6,
            Arc::new(ManualPriceOracle::new("USDC", usd("1").unwrap())),
        ),
        eth_set,
        usdc_set,
        &registry,
    )
    .unwrap();
    Pair {
        registry,
        allocator,
        eth,
        usdc_set,
    }
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");

    for n in [15usize, 50, 200] {
        let prices = make_prices(n);
        group.bench_with_input(BenchmarkId::new("rsi", n), &prices, |b, prices| {
            b.iter(|| calculate_rsi(black_box(prices)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("sma", n), &prices, |b, prices| {
            b.iter(|| simple_moving_average(black_box(prices)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("ema_series", n), &prices, |b, prices| {
            b.iter(|| {
                prices[1..].iter().fold(prices[0], |ema, price| {
                    calculate_ema(ema, 26, black_box(*price)).unwrap()
                })
            })
        });
    }

    group.finish();
}

// ── 2. Valuation ─────────────────────────────────────────────────────

fn bench_valuation(c: &mut Criterion) {
    let mut group = c.benchmark_group("valuation");
    let price = usd("1").unwrap();

    group.bench_function("natural_unit_search_usdc", |b| {
        b.iter(|| {
            search_natural_unit(
                black_box(U256::from(15_000u64)),
                price,
                6,
                DEFAULT_MIN_NATURAL_UNIT,
            )
            .unwrap()
        })
    });

    group.bench_function("auction_linear_band", |b| {
        let model = AuctionPriceModel::LinearBand {
            time_increment: 1_800,
        };
        b.iter(|| {
            calculate_auction_price_parameters(
                black_box(U256::from(17_000u64)),
                black_box(U256::from(15_000u64)),
                21_600,
                model,
            )
            .unwrap()
        })
    });

    group.finish();
}

// ── 3. Allocation ────────────────────────────────────────────────────

fn bench_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation");
    let hundred = U256::from(100u64);

    group.bench_function("cache_hit", |b| {
        let mut pair = make_pair();
        b.iter(|| {
            pair.allocator
                .determine_new_allocation(hundred, hundred, pair.usdc_set, &mut pair.registry)
                .unwrap()
        })
    });

    group.bench_function("new_set", |b| {
        let mut pair = make_pair();
        let mut cents = 12_000u64;
        b.iter(|| {
            cents += 1;
            pair.eth.set_price(U256::from(cents) * pow10(16).unwrap());
            pair.allocator
                .determine_new_allocation(hundred, hundred, pair.usdc_set, &mut pair.registry)
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_indicators, bench_valuation, bench_allocation);
criterion_main!(benches);
