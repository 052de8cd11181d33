//! Feeds poked over several days, read through the indicator oracles.

mod common;

use std::sync::Arc;

use basketlab_core::domain::U256;
use basketlab_core::feeds::{
    EmaDataSource, FeedConfig, FeedError, FeedHandle, ManualPriceOracle, PriceHistory,
    TimeSeriesFeed,
};
use basketlab_core::indicators::{EmaOracle, MovingAverageSource, RsiOracle};
use basketlab_core::triggers::{
    ConfirmationWindow, MovingAverageCrossover, RsiTrending, Trigger, TriggerCondition,
};
use common::*;

fn ema_feed(spot: Arc<ManualPriceOracle>, period: u64) -> FeedHandle {
    let feed = TimeSeriesFeed::new(
        FeedConfig {
            description: format!("ETH {period}-day EMA"),
            update_interval: DAY,
            max_data_points: 30,
            next_earliest_update: T0 + DAY,
        },
        &[dollars("100")],
        T0,
        Box::new(EmaDataSource::new(spot, period, HOUR).unwrap()),
    )
    .unwrap();
    FeedHandle::new(feed)
}

#[test]
fn ema_feed_steps_once_per_day() {
    let spot = Arc::new(ManualPriceOracle::new("ETH", dollars("110")));
    let feed = ema_feed(spot, 3);
    let mut oracle = EmaOracle::new();
    oracle.add_feed(3, feed.clone()).unwrap();

    feed.poke(T0 + DAY).unwrap();
    assert_eq!(oracle.read(3).unwrap(), dollars("105"));
    assert!(matches!(
        feed.poke(T0 + DAY + HOUR),
        Err(FeedError::TooEarly { .. })
    ));

    feed.poke(T0 + 2 * DAY).unwrap();
    assert_eq!(oracle.read(3).unwrap(), dollars("107.5"));

    // A day late: the fresh EMA (108.75) is pulled halfway back to 107.5.
    feed.poke(T0 + 4 * DAY).unwrap();
    assert_eq!(oracle.read(3).unwrap(), dollars("108.125"));
    assert_eq!(feed.next_earliest_update(), T0 + 5 * DAY);
    assert_eq!(feed.len(), 4);
}

#[test]
fn ema_oracle_rejects_unknown_period() {
    let spot = Arc::new(ManualPriceOracle::new("ETH", dollars("110")));
    let mut oracle = EmaOracle::new();
    oracle.add_feed(3, ema_feed(spot.clone(), 3)).unwrap();
    assert!(oracle.add_feed(3, ema_feed(spot, 3)).is_err());
    assert_eq!(oracle.read(26), Err(FeedError::UnknownPeriod(26)));
    assert_eq!(oracle.periods().collect::<Vec<_>>(), vec![3]);
}

#[test]
fn ema_crossover_is_bullish_above_the_average() {
    let spot = Arc::new(ManualPriceOracle::new("ETH", dollars("110")));
    let mut oracle = EmaOracle::new();
    let feed = ema_feed(spot.clone(), 3);
    oracle.add_feed(3, feed.clone()).unwrap();
    feed.poke(T0 + DAY).unwrap();
    let average: Arc<dyn MovingAverageSource> = Arc::new(oracle);

    let crossover = MovingAverageCrossover::new(spot.clone(), average, 3);
    assert_eq!(crossover.name(), "ema_3_crossover");
    assert!(crossover.evaluate(false).unwrap());

    spot.set_price(dollars("104"));
    assert!(!crossover.evaluate(true).unwrap());
}

#[test]
fn rsi_trigger_follows_poked_prices() {
    let spot = Arc::new(ManualPriceOracle::new("ETH", dollars("13")));
    let seeds = [dollars("10"), dollars("12"), dollars("11")];
    let feed = daily_feed(&seeds, spot.clone(), 10);
    let rsi = RsiOracle::new(feed.clone());

    feed.poke(T0 + DAY).unwrap();
    assert_eq!(
        feed.read(4).unwrap(),
        vec![dollars("13"), dollars("11"), dollars("12"), dollars("10")]
    );
    assert_eq!(rsi.read(3).unwrap(), U256::from(80u64));

    let condition = RsiTrending::new(rsi.clone(), 30, 70, 3).unwrap();
    let window = ConfirmationWindow::new(6 * HOUR, 12 * HOUR).unwrap();
    let mut trigger = Trigger::new(Box::new(condition), window, false).unwrap();

    let start = T0 + DAY;
    trigger.initial_trigger(start).unwrap();
    trigger.confirm_trigger(start + 7 * HOUR).unwrap();
    assert!(trigger.is_bullish());

    // Sharp drop: gains 2, losses 9 → 100 - 81 = 19.
    spot.set_price(dollars("5"));
    feed.poke(T0 + 2 * DAY).unwrap();
    assert_eq!(rsi.read(3).unwrap(), U256::from(19u64));
    let pending = trigger.initial_trigger(T0 + 2 * DAY).unwrap();
    assert!(!pending.candidate);
}

#[test]
fn rsi_needs_period_plus_one_points() {
    let spot = Arc::new(ManualPriceOracle::new("ETH", dollars("13")));
    let feed = daily_feed(&[dollars("10"), dollars("12")], spot, 10);
    let rsi = RsiOracle::new(feed);
    assert_eq!(rsi.read(1).unwrap(), U256::from(100u64));
    assert!(matches!(
        rsi.read(2),
        Err(FeedError::InsufficientHistory {
            requested: 3,
            available: 2
        })
    ));
}
