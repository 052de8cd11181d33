//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Allocation is idempotent: the same inputs select the same set
//! 2. A rotation never gains value, and loses at most one unit's worth
//! 3. The natural-unit search terminates for realistic values and prices
//! 4. RSI of a monotone series is 100 or 0
//! 5. A failed confirmation call leaves the state machine untouched
//! 6. Feed history stays bounded and evenly spaced

mod common;

use std::sync::Arc;

use proptest::prelude::*;

use basketlab_core::allocation::{
    calculate_set_value, search_natural_unit, AssetConfig, BinaryAllocator, InMemorySetRegistry,
    SetRegistry, MAX_NATURAL_UNIT,
};
use basketlab_core::domain::{Address, CollateralSet, U256};
use basketlab_core::feeds::{ManualPriceOracle, PriceHistory};
use basketlab_core::indicators::calculate_rsi;
use basketlab_core::math::{pow10, VALUE_TO_CENTS_CONVERSION};
use basketlab_core::triggers::{Confirmable, ConfirmationWindow};
use common::*;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Whole-cent USD price in 18-decimal fixed point.
fn arb_price(max_cents: u64) -> impl Strategy<Value = U256> {
    (1..=max_cents).prop_map(|c| U256::from(c) * VALUE_TO_CENTS_CONVERSION)
}

fn arb_decimals() -> impl Strategy<Value = u8> {
    prop_oneof![Just(6u8), Just(8u8), Just(18u8)]
}

struct World {
    registry: InMemorySetRegistry,
    allocator: BinaryAllocator,
    usdc_set: Address,
}

/// ETH/USDC pair at the given prices, starting from `usdc_units` at 10^12.
fn world(eth: U256, usdc_units: u64) -> World {
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
                vec![U256::from(usdc_units)],
                pow10(12).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    let allocator = BinaryAllocator::new(
        AssetConfig::new(weth(), "WETH", 18, Arc::new(ManualPriceOracle::new("ETH", eth))),
        AssetConfig::new(
            usdc(),
            "USDC",
            6,
            Arc::new(ManualPriceOracle::new("USDC", dollars("1"))),
        ),
        eth_set,
        usdc_set,
        &registry,
    )
    .unwrap();
    World {
        registry,
        allocator,
        usdc_set,
    }
}

fn hundred() -> U256 {
    U256::from(100u64)
}

// ── 1. Idempotent allocation ─────────────────────────────────────────

proptest! {
    #[test]
    fn same_inputs_select_the_same_set(
        eth in arb_price(10_000_000),
        usdc_units in 1u64..1_000_000,
    ) {
        let mut w = world(eth, usdc_units);
        let first = w.allocator
            .determine_new_allocation(hundred(), hundred(), w.usdc_set, &mut w.registry)
            .unwrap();
        let created = w.registry.created_count();
        let second = w.allocator
            .determine_new_allocation(hundred(), hundred(), w.usdc_set, &mut w.registry)
            .unwrap();

        prop_assert_eq!(second.next_set, first.next_set);
        prop_assert_eq!(second.next_units, first.next_units);
        prop_assert_eq!(second.next_natural_unit, first.next_natural_unit);
        prop_assert!(second.cache_hit);
        prop_assert_eq!(w.registry.created_count(), created);
    }
}

// ── 2. Value preservation ────────────────────────────────────────────

proptest! {
    #[test]
    fn rotation_never_gains_value(
        eth in arb_price(10_000_000),
        usdc_units in 1u64..1_000_000,
    ) {
        let mut w = world(eth, usdc_units);
        let into_eth = w.allocator
            .determine_new_allocation(hundred(), hundred(), w.usdc_set, &mut w.registry)
            .unwrap();
        prop_assert!(into_eth.next_value <= into_eth.current_value);

        let one_unit = calculate_set_value(eth, U256::from(1u64), into_eth.next_natural_unit, 18)
            .unwrap();
        let loss = into_eth.current_value - into_eth.next_value;
        prop_assert!(loss <= one_unit + U256::from(3u64));

        // and back into USDC from the set just created
        prop_assert!(w.registry.is_valid_set(into_eth.next_set));
        let back = w.allocator
            .determine_new_allocation(U256::ZERO, hundred(), into_eth.next_set, &mut w.registry)
            .unwrap();
        prop_assert_eq!(back.current_value, into_eth.next_value);
        prop_assert!(back.next_value <= back.current_value);
    }
}

// ── 3. Natural-unit search terminates ────────────────────────────────

proptest! {
    #[test]
    fn natural_unit_search_finds_positive_units(
        value in 1u64..=1_000_000_000_000,
        price in arb_price(1_000_000_000),
        decimals in arb_decimals(),
    ) {
        let (units, natural_unit) =
            search_natural_unit(U256::from(value), price, decimals, pow10(6).unwrap()).unwrap();
        prop_assert!(!units.is_zero());
        prop_assert!(natural_unit >= pow10(6).unwrap());
        prop_assert!(natural_unit <= MAX_NATURAL_UNIT);

        let next_value = calculate_set_value(price, units, natural_unit, decimals).unwrap();
        prop_assert!(next_value <= U256::from(value));
    }
}

// ── 4. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn strictly_rising_series_reads_100(
        start in 1u64..1_000_000,
        steps in prop::collection::vec(1u64..1_000, 1..30),
    ) {
        let mut chronological = vec![start];
        for step in steps {
            let last = *chronological.last().unwrap();
            chronological.push(last + step);
        }
        let newest_first: Vec<U256> = chronological.iter().rev().map(|p| U256::from(*p)).collect();
        prop_assert_eq!(calculate_rsi(&newest_first).unwrap(), hundred());
    }

    #[test]
    fn non_rising_series_reads_0(
        start in 1_000_000u64..2_000_000,
        steps in prop::collection::vec(0u64..1_000, 1..30),
    ) {
        let mut chronological = vec![start];
        for step in steps {
            let last = *chronological.last().unwrap();
            chronological.push(last - step);
        }
        let newest_first: Vec<U256> = chronological.iter().rev().map(|p| U256::from(*p)).collect();
        prop_assert_eq!(calculate_rsi(&newest_first).unwrap(), U256::ZERO);
    }

    #[test]
    fn rsi_is_at_most_100(prices in prop::collection::vec(0u64..10_000, 2..40)) {
        let values: Vec<U256> = prices.into_iter().map(U256::from).collect();
        prop_assert!(calculate_rsi(&values).unwrap() <= hundred());
    }
}

// ── 5. Confirmation atomicity ────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Op {
    Initiate { advance: u64, observed: bool },
    Confirm { advance: u64, observed: bool },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..20 * HOUR, any::<bool>())
            .prop_map(|(advance, observed)| Op::Initiate { advance, observed }),
        (0u64..20 * HOUR, any::<bool>())
            .prop_map(|(advance, observed)| Op::Confirm { advance, observed }),
    ]
}

proptest! {
    #[test]
    fn failed_calls_do_not_mutate(ops in prop::collection::vec(arb_op(), 1..40)) {
        let window = ConfirmationWindow::new(6 * HOUR, 12 * HOUR).unwrap();
        let mut machine = Confirmable::new(false, window).unwrap();
        let mut now = T0;
        let mut flips = 0u64;

        for op in ops {
            let before = machine.clone();
            let failed = match op {
                Op::Initiate { advance, observed } => {
                    now += advance;
                    machine.initiate(now, observed).is_err()
                }
                Op::Confirm { advance, observed } => {
                    now += advance;
                    match machine.confirm(now, observed) {
                        Ok(transition) => {
                            flips += 1;
                            prop_assert_eq!(transition.flipped_index, flips);
                            prop_assert_eq!(transition.to, observed);
                            false
                        }
                        Err(_) => true,
                    }
                }
            };
            if failed {
                prop_assert_eq!(&machine, &before);
            }
            prop_assert_eq!(machine.flipped_index(), flips);
        }
    }
}

// ── 6. Feed history invariants ───────────────────────────────────────

proptest! {
    #[test]
    fn feed_stays_bounded_and_spaced(
        capacity in 2usize..15,
        offsets in prop::collection::vec(0u64..3 * DAY, 1..40),
        prices in prop::collection::vec(1u64..100_000, 40),
    ) {
        let spot = Arc::new(ManualPriceOracle::new("ETH", dollars("100")));
        let feed = daily_feed(&[dollars("100")], spot.clone(), capacity);
        let mut now = T0;

        for (offset, price) in offsets.into_iter().zip(prices) {
            now += offset;
            spot.set_price(U256::from(price) * VALUE_TO_CENTS_CONVERSION);
            let accepted = feed.can_poke(now);
            prop_assert_eq!(feed.poke(now).is_ok(), accepted);

            let points = feed.points();
            prop_assert!(!points.is_empty());
            prop_assert!(points.len() <= capacity);
            for pair in points.windows(2) {
                prop_assert!(pair[1].timestamp >= pair[0].timestamp + DAY);
            }
            prop_assert_eq!(feed.latest().unwrap(), points[points.len() - 1].value);
        }
    }
}
