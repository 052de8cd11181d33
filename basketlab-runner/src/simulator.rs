//! Deterministic replay of a scenario against the engine.
//!
//! The simulator plays keeper for every participant. The clock starts at
//! midnight UTC of the scenario's start date and advances in `token.step`
//! ticks. Each path price becomes the spot price for one feed interval. On
//! every tick, in order:
//! 1. Poke each feed that accepts an update
//! 2. Advance the token: `Proposal` starts the auction after the proposal
//!    period, `Rebalance` settles after the auction duration
//! 3. Confirm a pending trigger signal, or open one
//! 4. Propose through the manager when it allows it
//!
//! The leading `feed.history` prices seed the feeds; the last of them is the
//! spot price on day zero.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use basketlab_core::allocation::{
    AllocationError, AssetConfig, BinaryAllocator, InMemorySetRegistry, RegistryError, SetRegistry,
};
use basketlab_core::domain::{CallContext, CollateralSet, RebalanceState};
use basketlab_core::feeds::{
    EmaDataSource, FeedConfig, FeedError, FeedHandle, LinearizedDataSource, ManualPriceOracle,
    PriceOracle, TimeSeriesFeed,
};
use basketlab_core::indicators::{
    simple_moving_average, EmaOracle, MovingAverageOracle, MovingAverageSource, RsiOracle,
};
use basketlab_core::manager::{
    AssetPairManager, InMemoryRebalancingToken, ManagerError, ProposalMode, ProposalOutcome,
    RebalancingToken, TokenError,
};
use basketlab_core::triggers::{
    MovingAverageCrossover, RsiTrending, Trigger, TriggerCondition, TriggerError,
};

use crate::config::{AverageKind, ConditionSpec, ConfigError, ScenarioConfig, Side};
use crate::price_path::{load_path, PathError, PricePath};
use crate::report::{
    to_datetime, FlipRecord, ProposalRecord, SettlementRecord, SimulationReport, SCHEMA_VERSION,
};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("price path error: {0}")]
    Path(#[from] PathError),
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
    #[error("trigger error: {0}")]
    Trigger(#[from] TriggerError),
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("manager error: {0}")]
    Manager(#[from] ManagerError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

const BASE_SET: Address = Address::with_last_byte(0x01);
const QUOTE_SET: Address = Address::with_last_byte(0x02);
const TOKEN: Address = Address::with_last_byte(0x10);
const OWNER: Address = Address::with_last_byte(0x0f);

/// Midnight UTC of `date`, in seconds.
pub fn start_timestamp(date: NaiveDate) -> Result<u64, ConfigError> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ConfigError::Invalid(format!("no midnight on {date}")))?;
    u64::try_from(midnight.and_utc().timestamp())
        .map_err(|_| ConfigError::Invalid(format!("start date {date} is before 1970")))
}

/// A scenario paired with its resolved price path.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: ScenarioConfig,
    path: PricePath,
}

impl Simulation {
    pub fn new(config: ScenarioConfig, path: PricePath) -> Result<Self, RunError> {
        config.validate()?;
        let required = config.feed.history;
        if path.len() < required {
            return Err(PathError::TooShort {
                required,
                available: path.len(),
            }
            .into());
        }
        Ok(Self { config, path })
    }

    /// Resolve the scenario's own price path.
    pub fn from_config(config: ScenarioConfig) -> Result<Self, RunError> {
        let path = load_path(&config.path, &config.name)?;
        Self::new(config, path)
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn path(&self) -> &PricePath {
        &self.path
    }

    /// Path days replayed: the last seed day plus every later price.
    pub fn days(&self) -> usize {
        self.path.len() - self.config.feed.history + 1
    }

    pub fn run(&self) -> Result<SimulationReport, RunError> {
        let mut world = World::build(&self.config, &self.path)?;
        let interval = self.config.feed.update_interval;
        let history = self.config.feed.history;
        info!(
            scenario = %self.config.name,
            days = self.days(),
            condition = world.trigger.condition_name(),
            "simulation started"
        );

        let mut ticks = 0u64;
        for (day, price) in self.path.prices[history - 1..].iter().enumerate() {
            let day_start = world.start + day as u64 * interval;
            world.spot.set_price(*price);
            let mut now = day_start;
            while now < day_start + interval {
                world.tick(now, &self.config)?;
                ticks += 1;
                now += self.config.token.step;
            }
        }

        let end = world.start + self.days() as u64 * interval;
        let report = world.into_report(self, ticks, end)?;
        info!(
            scenario = %report.scenario,
            rotations = report.rotations(),
            reverted = report.reverted_proposals,
            "simulation finished"
        );
        Ok(report)
    }
}

/// Load a scenario's path and run it.
pub fn run_scenario(config: &ScenarioConfig) -> Result<SimulationReport, RunError> {
    Simulation::from_config(config.clone())?.run()
}

struct World {
    start: u64,
    spot: Arc<ManualPriceOracle>,
    feeds: Vec<FeedHandle>,
    trigger: Trigger,
    manager: AssetPairManager,
    token: InMemoryRebalancingToken,
    registry: InMemorySetRegistry,
    /// When the token entered its current phase.
    phase_since: u64,
    flips: Vec<FlipRecord>,
    proposals: Vec<ProposalRecord>,
    settlements: Vec<SettlementRecord>,
    reverted: usize,
}

impl World {
    fn build(config: &ScenarioConfig, path: &PricePath) -> Result<Self, RunError> {
        let start = start_timestamp(config.start_date)?;
        let feed = &config.feed;
        let seeds = &path.prices[..feed.history];
        let spot = Arc::new(ManualPriceOracle::new(
            config.base.symbol.clone(),
            seeds[seeds.len() - 1],
        ));
        let quote_oracle = Arc::new(ManualPriceOracle::new(
            config.quote.symbol.clone(),
            config.quote_price()?,
        ));

        let mut registry = InMemorySetRegistry::new();
        let collateral = &config.collateral;
        let base_set = registry.register(
            CollateralSet::new(
                BASE_SET,
                vec![config.base.address],
                vec![collateral.base_units],
                collateral.base_natural_unit,
            )
            .map_err(RegistryError::from)?,
        )?;
        let quote_set = registry.register(
            CollateralSet::new(
                QUOTE_SET,
                vec![config.quote.address],
                vec![collateral.quote_units],
                collateral.quote_natural_unit,
            )
            .map_err(RegistryError::from)?,
        )?;

        let allocator = BinaryAllocator::new(
            AssetConfig::new(
                config.base.address,
                config.base.symbol.clone(),
                config.base.decimals,
                spot.clone(),
            ),
            AssetConfig::new(
                config.quote.address,
                config.quote.symbol.clone(),
                config.quote.decimals,
                quote_oracle,
            ),
            base_set,
            quote_set,
            &registry,
        )?
        .with_min_natural_unit(collateral.min_natural_unit)?;

        let feed_config = |description: String| FeedConfig {
            description,
            update_interval: feed.update_interval,
            max_data_points: feed.max_data_points,
            next_earliest_update: start + feed.update_interval,
        };
        let price_feed = FeedHandle::new(TimeSeriesFeed::new(
            feed_config(format!("{} price", config.base.symbol)),
            seeds,
            start,
            Box::new(LinearizedDataSource::new(
                spot.clone(),
                feed.interpolation_threshold,
            )),
        )?);
        let mut feeds = vec![price_feed.clone()];

        let spot_oracle: Arc<dyn PriceOracle> = spot.clone();
        let condition: Box<dyn TriggerCondition> = match config.trigger.condition {
            ConditionSpec::MaCrossover {
                period,
                average: AverageKind::Sma,
            } => {
                let average: Arc<dyn MovingAverageSource> =
                    Arc::new(MovingAverageOracle::new(price_feed.clone()));
                Box::new(MovingAverageCrossover::new(spot_oracle, average, period))
            }
            ConditionSpec::MaCrossover {
                period,
                average: AverageKind::Ema,
            } => {
                // The EMA starts from the SMA of the newest seeds.
                let window = &seeds[seeds.len().saturating_sub(period)..];
                let seed = simple_moving_average(window).map_err(FeedError::from)?;
                let ema_feed = FeedHandle::new(TimeSeriesFeed::new(
                    feed_config(format!("{} {period}-period EMA", config.base.symbol)),
                    &[seed],
                    start,
                    Box::new(EmaDataSource::new(
                        spot.clone(),
                        period as u64,
                        feed.interpolation_threshold,
                    )?),
                )?);
                let mut oracle = EmaOracle::new();
                oracle.add_feed(period as u64, ema_feed.clone())?;
                feeds.push(ema_feed);
                let average: Arc<dyn MovingAverageSource> = Arc::new(oracle);
                Box::new(MovingAverageCrossover::new(spot_oracle, average, period))
            }
            ConditionSpec::Rsi {
                period,
                lower,
                upper,
            } => Box::new(RsiTrending::new(
                RsiOracle::new(price_feed.clone()),
                lower,
                upper,
                period,
            )?),
        };
        let trigger = Trigger::from_config(condition, &config.trigger.timing)?;

        let mut manager = AssetPairManager::new(OWNER, config.manager.clone(), allocator)?;
        let current_set = match collateral.start_in {
            Side::Base => base_set,
            Side::Quote => quote_set,
        };
        let interval = config.token.rebalance_interval;
        let token = InMemoryRebalancingToken::new(
            TOKEN,
            manager.address(),
            current_set,
            interval,
            start.saturating_sub(interval),
        );
        manager.initialize(&CallContext::new(OWNER, start), &token, &registry)?;

        Ok(Self {
            start,
            spot,
            feeds,
            trigger,
            manager,
            token,
            registry,
            phase_since: start,
            flips: Vec::new(),
            proposals: Vec::new(),
            settlements: Vec::new(),
            reverted: 0,
        })
    }

    fn tick(&mut self, now: u64, config: &ScenarioConfig) -> Result<(), RunError> {
        for feed in &self.feeds {
            if feed.can_poke(now) {
                let point = feed.poke(now)?;
                debug!(feed = %feed.description(), value = %point.value, now, "feed poked");
            }
        }

        self.advance_token(now, config)?;

        if self.trigger.can_confirm_trigger(now) {
            let flipped = self.trigger.confirm_trigger(now)?;
            self.flips.push(FlipRecord {
                timestamp: now,
                at: to_datetime(now),
                bullish: flipped.flip_to,
                flipped_index: flipped.flipped_index,
            });
        } else if self.trigger.can_initial_trigger(now) {
            self.trigger.initial_trigger(now)?;
        }

        self.drive_manager(now);
        Ok(())
    }

    fn advance_token(&mut self, now: u64, config: &ScenarioConfig) -> Result<(), RunError> {
        let ctx = CallContext::new(self.manager.address(), now);
        match self.token.rebalance_state() {
            RebalanceState::Proposal if now >= self.phase_since + config.token.proposal_period => {
                self.token.start_rebalance(&ctx)?;
                self.phase_since = now;
            }
            RebalanceState::Rebalance if now >= self.phase_since + config.token.auction_duration => {
                let set = self.token.settle(&ctx)?;
                let value = self.set_value(set)?;
                self.settlements.push(SettlementRecord {
                    timestamp: now,
                    at: to_datetime(now),
                    set,
                    value_cents: value,
                });
                self.phase_since = now;
            }
            _ => {}
        }
        Ok(())
    }

    /// A failed proposal is recorded and retried on a later tick.
    fn drive_manager(&mut self, now: u64) {
        let ctx = CallContext::new(OWNER, now);
        let result = match self.manager.config().proposal_mode {
            ProposalMode::Direct => {
                if !self.manager.can_propose(&ctx, &self.trigger, &self.token) {
                    return;
                }
                self.manager
                    .propose(&ctx, &self.trigger, &mut self.token, &mut self.registry)
            }
            ProposalMode::Confirmed { .. } => {
                if self.manager.can_confirm_propose(&ctx, &self.trigger, &self.token) {
                    self.manager.confirm_propose(
                        &ctx,
                        &self.trigger,
                        &mut self.token,
                        &mut self.registry,
                    )
                } else {
                    if self.manager.can_initial_propose(&ctx, &self.trigger, &self.token) {
                        if let Err(error) =
                            self.manager.initial_propose(&ctx, &self.trigger, &self.token)
                        {
                            warn!(%error, now, "initial proposal failed");
                        }
                    }
                    return;
                }
            }
        };

        match result {
            Ok(outcome) => self.record_proposal(&outcome),
            Err(error) => {
                self.reverted += 1;
                warn!(%error, category = ?error.category(), now, "proposal reverted");
            }
        }
    }

    fn record_proposal(&mut self, outcome: &ProposalOutcome) {
        self.phase_since = outcome.timestamp;
        self.proposals.push(ProposalRecord {
            timestamp: outcome.timestamp,
            at: to_datetime(outcome.timestamp),
            base_asset_allocation: outcome.base_asset_allocation,
            next_set: outcome.allocation.next_set,
            current_value: outcome.allocation.current_value,
            next_value: outcome.allocation.next_value,
            start_price: outcome.auction.start_price,
            pivot_price: outcome.auction.pivot_price,
            cache_hit: outcome.allocation.cache_hit,
        });
    }

    fn set_value(&self, address: Address) -> Result<U256, RunError> {
        let set = self
            .registry
            .set(address)
            .ok_or(RegistryError::UnknownSet(address))?;
        Ok(self.manager.allocator().calculate_collateral_set_value(set)?)
    }

    fn into_report(
        self,
        simulation: &Simulation,
        ticks: u64,
        end: u64,
    ) -> Result<SimulationReport, RunError> {
        let final_set = self.token.current_set();
        let final_value_cents = self.set_value(final_set)?;
        let final_price = self.spot.read().map_err(FeedError::from)?;
        Ok(SimulationReport {
            schema_version: SCHEMA_VERSION,
            scenario: simulation.config.name.clone(),
            scenario_id: simulation.config.scenario_id(),
            condition: self.trigger.condition_name().to_string(),
            path_hash: simulation.path.hash(),
            synthetic: simulation.path.is_synthetic(),
            started_at: to_datetime(self.start),
            ended_at: to_datetime(end),
            days: simulation.days(),
            ticks,
            flips: self.flips,
            proposals: self.proposals,
            settlements: self.settlements,
            reverted_proposals: self.reverted,
            sets_created: self.registry.created_count(),
            final_state: self.token.rebalance_state(),
            final_set,
            final_base_asset_allocation: self.manager.base_asset_allocation(),
            final_price,
            final_value_cents,
        })
    }
}
