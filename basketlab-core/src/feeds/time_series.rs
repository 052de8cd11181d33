//! Interval-gated, fixed-capacity price history.

use super::{DataSource, FeedError};
use crate::domain::PricePoint;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Construction parameters of a `TimeSeriesFeed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub description: String,
    /// Minimum spacing between recorded points, in seconds.
    pub update_interval: u64,
    /// Ring capacity; the oldest point is evicted beyond it.
    pub max_data_points: usize,
    /// First timestamp at which `poke` is accepted.
    pub next_earliest_update: u64,
}

/// What a data source may see of the feed when producing the next value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedState {
    pub latest_value: U256,
    pub next_earliest_update: u64,
    pub update_interval: u64,
}

/// Read access to a price history, newest value first.
pub trait PriceHistory: Send + Sync {
    /// The newest `n` values, newest first.
    fn read(&self, n: usize) -> Result<Vec<U256>, FeedError>;

    fn latest(&self) -> Result<U256, FeedError> {
        self.read(1).map(|values| values[0])
    }
}

/// Append-only time series.
///
/// # Invariants
/// - never empty (construction requires seeded values)
/// - timestamps strictly increase and are spaced by `>= update_interval`
/// - `len() <= max_data_points`
pub struct TimeSeriesFeed {
    description: String,
    update_interval: u64,
    max_data_points: usize,
    next_earliest_update: u64,
    points: VecDeque<PricePoint>,
    source: Box<dyn DataSource>,
}

impl TimeSeriesFeed {
    /// Build a feed seeded with `seeded_values` in chronological order.
    ///
    /// Seeded points are timestamped backwards from
    /// `next_earliest_update - update_interval`, one interval apart.
    pub fn new(
        config: FeedConfig,
        seeded_values: &[U256],
        now: u64,
        source: Box<dyn DataSource>,
    ) -> Result<Self, FeedError> {
        if config.update_interval == 0 {
            return Err(FeedError::InvalidConfig("update interval must be positive".into()));
        }
        if config.max_data_points == 0 {
            return Err(FeedError::InvalidConfig("max data points must be positive".into()));
        }
        if seeded_values.is_empty() {
            return Err(FeedError::InvalidConfig("at least one seeded value required".into()));
        }
        if seeded_values.len() > config.max_data_points {
            return Err(FeedError::InvalidConfig(format!(
                "{} seeded values exceed capacity {}",
                seeded_values.len(),
                config.max_data_points
            )));
        }
        if config.next_earliest_update <= now {
            return Err(FeedError::InvalidConfig(format!(
                "next earliest update {} must be after current time {now}",
                config.next_earliest_update
            )));
        }

        let span = (seeded_values.len() as u64)
            .checked_mul(config.update_interval)
            .and_then(|s| config.next_earliest_update.checked_sub(s))
            .ok_or_else(|| FeedError::InvalidConfig("seeded history predates timestamp zero".into()))?;

        let points = seeded_values
            .iter()
            .enumerate()
            .map(|(i, v)| PricePoint::new(span + i as u64 * config.update_interval, *v))
            .collect();

        Ok(Self {
            description: config.description,
            update_interval: config.update_interval,
            max_data_points: config.max_data_points,
            next_earliest_update: config.next_earliest_update,
            points,
            source,
        })
    }

    /// Append the data source's next value.
    ///
    /// Fails `TooEarly` before the update window opens. On success the next
    /// window opens `update_interval` after `now` (not after the previous
    /// window), so a late poke does not compound lag.
    pub fn poke(&mut self, now: u64) -> Result<PricePoint, FeedError> {
        if now < self.next_earliest_update {
            return Err(FeedError::TooEarly {
                now,
                next_earliest_update: self.next_earliest_update,
            });
        }

        let value = self.source.next_value(&self.state(), now)?;
        let point = PricePoint::new(now, value);

        if self.points.len() == self.max_data_points {
            self.points.pop_front();
        }
        self.points.push_back(point);
        self.next_earliest_update = now.saturating_add(self.update_interval);

        debug!(
            feed = %self.description,
            timestamp = now,
            value = %value,
            next_earliest_update = self.next_earliest_update,
            "feed poked"
        );
        Ok(point)
    }

    pub fn state(&self) -> FeedState {
        FeedState {
            latest_value: self.points.back().map(|p| p.value).unwrap_or(U256::ZERO),
            next_earliest_update: self.next_earliest_update,
            update_interval: self.update_interval,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn update_interval(&self) -> u64 {
        self.update_interval
    }

    pub fn max_data_points(&self) -> usize {
        self.max_data_points
    }

    pub fn next_earliest_update(&self) -> u64 {
        self.next_earliest_update
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All stored points, oldest first.
    pub fn points(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }
}

impl PriceHistory for TimeSeriesFeed {
    fn read(&self, n: usize) -> Result<Vec<U256>, FeedError> {
        if n > self.points.len() {
            return Err(FeedError::InsufficientHistory {
                requested: n,
                available: self.points.len(),
            });
        }
        Ok(self.points.iter().rev().take(n).map(|p| p.value).collect())
    }
}

/// Shared handle to a feed: the keeper pokes it, oracles and triggers read it.
#[derive(Clone)]
pub struct FeedHandle(Arc<RwLock<TimeSeriesFeed>>);

impl FeedHandle {
    pub fn new(feed: TimeSeriesFeed) -> Self {
        Self(Arc::new(RwLock::new(feed)))
    }

    pub fn poke(&self, now: u64) -> Result<PricePoint, FeedError> {
        self.0.write().unwrap_or_else(PoisonError::into_inner).poke(now)
    }

    /// Whether `poke(now)` would pass the interval gate.
    pub fn can_poke(&self, now: u64) -> bool {
        now >= self.next_earliest_update()
    }

    pub fn next_earliest_update(&self) -> u64 {
        self.0.read().unwrap_or_else(PoisonError::into_inner).next_earliest_update()
    }

    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn description(&self) -> String {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .description()
            .to_string()
    }

    /// Snapshot of all stored points, oldest first.
    pub fn points(&self) -> Vec<PricePoint> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .points()
            .copied()
            .collect()
    }
}

impl PriceHistory for FeedHandle {
    fn read(&self, n: usize) -> Result<Vec<U256>, FeedError> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).read(n)
    }
}
