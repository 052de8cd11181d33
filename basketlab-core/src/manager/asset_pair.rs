//! Two-asset rebalancing manager.
//!
//! Holds the base-asset allocation inside a `Confirmable<U256>`, so the
//! confirmed proposal mode reuses the trigger's confirmation window. A
//! proposal either completes, with the token in `Proposal` and the allocation
//! committed, or leaves the manager, the allocator cache and the registry
//! exactly as they were. The rotation is planned and priced before any set is
//! created, and a set created for a proposal the token rejects is removed
//! again.

use super::auction::calculate_auction_price_parameters;
use super::config::{ManagerConfig, ProposalMode};
use super::timelock::{TimeLock, TimeLockOutcome, UpgradeAction, UpgradeHash};
use super::token::RebalancingToken;
use super::ManagerError;
use crate::allocation::{AllocationResult, BinaryAllocator, SetRegistry};
use crate::domain::{AuctionPriceParameters, CallContext, FeeKind, Proposal, RebalanceState};
use crate::math::u256_dec;
use crate::triggers::{BullishSignal, Confirmable, ConfirmationError, Pending, Transition};
use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{info, warn};

/// A proposal handed to the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProposalOutcome {
    #[serde(with = "u256_dec")]
    pub base_asset_allocation: U256,
    pub flipped_index: u64,
    pub allocation: AllocationResult,
    pub auction: AuctionPriceParameters,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManagerEvent {
    Initialized {
        token: Address,
        timestamp: u64,
    },
    ProposalInitiated {
        #[serde(with = "u256_dec")]
        base_asset_allocation: U256,
        timestamp: u64,
    },
    Proposed(ProposalOutcome),
    UpgradeRegistered {
        hash: UpgradeHash,
        executable_at: u64,
        expires_at: u64,
    },
    FeeAdjusted {
        kind: FeeKind,
        #[serde(with = "u256_dec")]
        value: U256,
        timestamp: u64,
    },
    UpgradeRemoved {
        hash: UpgradeHash,
        timestamp: u64,
    },
    TimeLockPeriodChanged {
        period: u64,
        timestamp: u64,
    },
}

type Commit = fn(&mut Confirmable<U256>, u64, U256) -> Result<Transition<U256>, ConfirmationError>;

pub struct AssetPairManager {
    address: Address,
    owner: Address,
    config: ManagerConfig,
    allocation: Confirmable<U256>,
    allocator: BinaryAllocator,
    time_lock: TimeLock,
    token: Option<Address>,
    events: Vec<ManagerEvent>,
}

impl AssetPairManager {
    pub fn new(
        owner: Address,
        config: ManagerConfig,
        allocator: BinaryAllocator,
    ) -> Result<Self, ManagerError> {
        config.validate()?;
        let allocation = Confirmable::new(
            config.initial_base_asset_allocation,
            config.proposal_mode.window(),
        )?;
        let time_lock = TimeLock::new(config.time_lock)?;
        Ok(Self {
            address: derive_address(owner),
            owner,
            config,
            allocation,
            allocator,
            time_lock,
            token: None,
            events: Vec::new(),
        })
    }

    /// Override the address the manager calls the token from.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn allocator(&self) -> &BinaryAllocator {
        &self.allocator
    }

    pub fn token(&self) -> Option<Address> {
        self.token
    }

    pub fn is_initialized(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_asset_allocation(&self) -> U256 {
        self.allocation.confirmed()
    }

    pub fn bullish_base_asset_allocation(&self) -> U256 {
        self.config.bullish_base_asset_allocation
    }

    pub fn bearish_base_asset_allocation(&self) -> U256 {
        self.config.bearish_base_asset_allocation()
    }

    pub fn pending_proposal(&self) -> Option<Pending<U256>> {
        self.allocation.pending()
    }

    pub fn allocation_state(&self) -> &Confirmable<U256> {
        &self.allocation
    }

    pub fn time_lock(&self) -> &TimeLock {
        &self.time_lock
    }

    pub fn events(&self) -> &[ManagerEvent] {
        &self.events
    }

    fn only_owner(&self, ctx: &CallContext) -> Result<(), ManagerError> {
        if ctx.sender != self.owner {
            return Err(ManagerError::Unauthorized { sender: ctx.sender });
        }
        Ok(())
    }

    /// Bind the rebalancing token. Owner only, once.
    pub fn initialize(
        &mut self,
        ctx: &CallContext,
        token: &dyn RebalancingToken,
        registry: &dyn SetRegistry,
    ) -> Result<(), ManagerError> {
        self.only_owner(ctx)?;
        if self.token.is_some() {
            return Err(ManagerError::AlreadyInitialized);
        }
        let address = token.address();
        if address == Address::ZERO {
            return Err(ManagerError::InvalidToken("token address is zero".into()));
        }
        if !registry.is_valid_set(token.current_set()) {
            return Err(ManagerError::InvalidToken(format!(
                "current set {} is not a valid set",
                token.current_set()
            )));
        }
        self.token = Some(address);
        self.events.push(ManagerEvent::Initialized {
            token: address,
            timestamp: ctx.timestamp,
        });
        info!(manager = %self.address, token = %address, "manager initialized");
        Ok(())
    }

    fn bound_token(&self, token: &dyn RebalancingToken) -> Result<(), ManagerError> {
        let expected = self.token.ok_or(ManagerError::NotInitialized)?;
        if token.address() != expected {
            return Err(ManagerError::TokenMismatch {
                expected,
                actual: token.address(),
            });
        }
        Ok(())
    }

    fn require_mode(&self, confirmed: bool) -> Result<(), ManagerError> {
        let is_confirmed = matches!(self.config.proposal_mode, ProposalMode::Confirmed { .. });
        if is_confirmed != confirmed {
            return Err(ManagerError::WrongProposalMode {
                mode: self.config.proposal_mode.name(),
            });
        }
        Ok(())
    }

    fn target_allocation(&self, signal: &dyn BullishSignal) -> U256 {
        if signal.is_bullish() {
            self.config.bullish_base_asset_allocation
        } else {
            self.config.bearish_base_asset_allocation()
        }
    }

    /// Guards shared by every proposal entry point; yields the allocation the
    /// signal asks for.
    fn check_common(
        &self,
        now: u64,
        signal: &dyn BullishSignal,
        token: &dyn RebalancingToken,
    ) -> Result<U256, ManagerError> {
        self.bound_token(token)?;
        let state = token.rebalance_state();
        if state != RebalanceState::Default {
            return Err(ManagerError::WrongState(state));
        }
        let available_at = token
            .last_rebalance_timestamp()
            .saturating_add(token.rebalance_interval());
        if now < available_at {
            return Err(ManagerError::TooSoon { now, available_at });
        }
        let target = self.target_allocation(signal);
        if target == self.allocation.confirmed() {
            return Err(ManagerError::NoChange);
        }
        Ok(target)
    }

    pub fn can_propose(
        &self,
        ctx: &CallContext,
        signal: &dyn BullishSignal,
        token: &dyn RebalancingToken,
    ) -> bool {
        self.require_mode(false).is_ok() && self.check_common(ctx.timestamp, signal, token).is_ok()
    }

    pub fn can_initial_propose(
        &self,
        ctx: &CallContext,
        signal: &dyn BullishSignal,
        token: &dyn RebalancingToken,
    ) -> bool {
        self.require_mode(true).is_ok()
            && self
                .check_common(ctx.timestamp, signal, token)
                .map(|target| self.allocation.can_initiate(ctx.timestamp, target))
                .unwrap_or(false)
    }

    pub fn can_confirm_propose(
        &self,
        ctx: &CallContext,
        signal: &dyn BullishSignal,
        token: &dyn RebalancingToken,
    ) -> bool {
        self.require_mode(true).is_ok()
            && self
                .check_common(ctx.timestamp, signal, token)
                .map(|target| self.allocation.can_confirm(ctx.timestamp, target))
                .unwrap_or(false)
    }

    /// Single-shot proposal (`ProposalMode::Direct`).
    pub fn propose(
        &mut self,
        ctx: &CallContext,
        signal: &dyn BullishSignal,
        token: &mut dyn RebalancingToken,
        registry: &mut dyn SetRegistry,
    ) -> Result<ProposalOutcome, ManagerError> {
        self.require_mode(false)?;
        let target = self.check_common(ctx.timestamp, signal, &*token)?;
        self.execute(ctx, target, token, registry, Confirmable::apply)
    }

    /// Open the confirmation window for a proposal (`ProposalMode::Confirmed`).
    pub fn initial_propose(
        &mut self,
        ctx: &CallContext,
        signal: &dyn BullishSignal,
        token: &dyn RebalancingToken,
    ) -> Result<Pending<U256>, ManagerError> {
        self.require_mode(true)?;
        let target = self.check_common(ctx.timestamp, signal, token)?;
        let pending = self.allocation.initiate(ctx.timestamp, target)?;
        self.events.push(ManagerEvent::ProposalInitiated {
            base_asset_allocation: target,
            timestamp: ctx.timestamp,
        });
        info!(
            manager = %self.address,
            target = %target,
            since = ctx.timestamp,
            "proposal initiated"
        );
        Ok(pending)
    }

    /// Re-check the signal inside the window and propose.
    pub fn confirm_propose(
        &mut self,
        ctx: &CallContext,
        signal: &dyn BullishSignal,
        token: &mut dyn RebalancingToken,
        registry: &mut dyn SetRegistry,
    ) -> Result<ProposalOutcome, ManagerError> {
        self.require_mode(true)?;
        let target = self.check_common(ctx.timestamp, signal, &*token)?;
        self.allocation.check_confirm(ctx.timestamp, target)?;
        self.execute(ctx, target, token, registry, Confirmable::confirm)
    }

    fn execute(
        &mut self,
        ctx: &CallContext,
        target: U256,
        token: &mut dyn RebalancingToken,
        registry: &mut dyn SetRegistry,
        commit: Commit,
    ) -> Result<ProposalOutcome, ManagerError> {
        let allocation_snapshot = self.allocation.clone();
        let allocator_snapshot = self.allocator.clone();
        match self.try_execute(ctx, target, token, registry, commit) {
            Ok(outcome) => {
                self.events.push(ManagerEvent::Proposed(outcome));
                info!(
                    manager = %self.address,
                    base_asset_allocation = %outcome.base_asset_allocation,
                    next_set = %outcome.allocation.next_set,
                    start_price = %outcome.auction.start_price,
                    pivot_price = %outcome.auction.pivot_price,
                    "rebalance proposed"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.allocation = allocation_snapshot;
                self.allocator = allocator_snapshot;
                warn!(
                    manager = %self.address,
                    error = %err,
                    category = %err.category(),
                    "proposal reverted"
                );
                Err(err)
            }
        }
    }

    fn try_execute(
        &mut self,
        ctx: &CallContext,
        target: U256,
        token: &mut dyn RebalancingToken,
        registry: &mut dyn SetRegistry,
        commit: Commit,
    ) -> Result<ProposalOutcome, ManagerError> {
        let plan = self.allocator.plan_new_allocation(
            target,
            self.config.allocation_denominator,
            token.current_set(),
            &*registry,
        )?;
        let auction = calculate_auction_price_parameters(
            plan.current_value,
            plan.next_value,
            self.config.auction_time_to_pivot,
            self.config.auction_price_model,
        )?;

        // State is committed before the external call.
        let transition = commit(&mut self.allocation, ctx.timestamp, target)?;
        let allocation = self.allocator.apply_plan(&plan, registry)?;
        let proposed = token.propose(
            &CallContext::new(self.address, ctx.timestamp),
            Proposal {
                next_set: allocation.next_set,
                auction_library: self.config.auction_library,
                auction,
            },
        );
        if let Err(err) = proposed {
            if !allocation.cache_hit {
                if let Err(undo) = registry.remove_created_set(allocation.next_set) {
                    warn!(set = %allocation.next_set, error = %undo, "created set left registered");
                }
            }
            return Err(err.into());
        }

        Ok(ProposalOutcome {
            base_asset_allocation: transition.to,
            flipped_index: transition.flipped_index,
            allocation,
            auction,
            timestamp: ctx.timestamp,
        })
    }

    /// Submit a fee change through the timelock. Owner only.
    pub fn adjust_fee(
        &mut self,
        ctx: &CallContext,
        kind: FeeKind,
        value: U256,
        token: &mut dyn RebalancingToken,
    ) -> Result<TimeLockOutcome, ManagerError> {
        self.only_owner(ctx)?;
        self.bound_token(&*token)?;
        let snapshot = self.time_lock.clone();
        let outcome = self
            .time_lock
            .submit(ctx.timestamp, UpgradeAction::SetFee(kind, value))?;

        match outcome {
            TimeLockOutcome::Registered {
                hash,
                executable_at,
                expires_at,
            } => {
                self.events.push(ManagerEvent::UpgradeRegistered {
                    hash,
                    executable_at,
                    expires_at,
                });
                info!(manager = %self.address, hash = %hash, executable_at, "upgrade registered");
            }
            TimeLockOutcome::Ready(_) => {
                let call = CallContext::new(self.address, ctx.timestamp);
                if let Err(err) = token.adjust_fee(&call, kind, value) {
                    self.time_lock = snapshot;
                    warn!(manager = %self.address, error = %err, "fee adjustment reverted");
                    return Err(err.into());
                }
                self.events.push(ManagerEvent::FeeAdjusted {
                    kind,
                    value,
                    timestamp: ctx.timestamp,
                });
                info!(manager = %self.address, fee = %kind, value = %value, "fee adjusted");
            }
        }
        Ok(outcome)
    }

    pub fn remove_registered_upgrade(
        &mut self,
        ctx: &CallContext,
        hash: &UpgradeHash,
    ) -> Result<UpgradeAction, ManagerError> {
        self.only_owner(ctx)?;
        let action = self.time_lock.remove(hash)?;
        self.events.push(ManagerEvent::UpgradeRemoved {
            hash: *hash,
            timestamp: ctx.timestamp,
        });
        Ok(action)
    }

    pub fn set_time_lock_period(&mut self, ctx: &CallContext, period: u64) -> Result<(), ManagerError> {
        self.only_owner(ctx)?;
        self.time_lock.set_period(period)?;
        self.events.push(ManagerEvent::TimeLockPeriodChanged {
            period,
            timestamp: ctx.timestamp,
        });
        Ok(())
    }
}

fn derive_address(owner: Address) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"basketlab.manager");
    hasher.update(owner.as_slice());
    Address::from_slice(&hasher.finalize().as_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AssetConfig, InMemorySetRegistry};
    use crate::domain::CollateralSet;
    use crate::error::ErrorCategory;
    use crate::feeds::ManualPriceOracle;
    use crate::manager::{AuctionPriceModel, InMemoryRebalancingToken, TimeLockConfig};
    use crate::math::{pow10, usd};
    use crate::triggers::StaticSignal;
    use std::sync::Arc;

    const DAY: u64 = 86_400;
    const HOUR: u64 = 3_600;
    const T0: u64 = 1_700_000_000;

    fn owner() -> Address {
        Address::repeat_byte(0x0f)
    }

    fn weth() -> Address {
        Address::repeat_byte(0xee)
    }

    fn usdc() -> Address {
        Address::repeat_byte(0xcc)
    }

    struct World {
        manager: AssetPairManager,
        token: InMemoryRebalancingToken,
        registry: InMemorySetRegistry,
        eth: Arc<ManualPriceOracle>,
        eth_set: Address,
        usdc_set: Address,
    }

    fn config(mode: ProposalMode) -> ManagerConfig {
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

    fn world(mode: ProposalMode) -> World {
        let eth = Arc::new(ManualPriceOracle::new("ETH", usd("150").unwrap()));
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
            AssetConfig::new(
                weth(),
                "WETH",
                18,
                eth.clone(),
            ),
            AssetConfig::new(
                usdc(),
                "USDC",
                6,
                Arc::new(ManualPriceOracle::new("USDC", usd("1").unwrap())),
            ),
            eth_set,
            usdc_set,
            &registry,
        )
        .unwrap();
        let manager = AssetPairManager::new(owner(), config(mode), allocator).unwrap();
        let token = InMemoryRebalancingToken::new(
            Address::repeat_byte(0x70),
            manager.address(),
            usdc_set,
            DAY,
            T0 - DAY,
        );
        World {
            manager,
            token,
            registry,
            eth,
            eth_set,
            usdc_set,
        }
    }

    fn initialized(mode: ProposalMode) -> World {
        let mut w = world(mode);
        w.manager
            .initialize(&CallContext::new(owner(), T0), &w.token, &w.registry)
            .unwrap();
        w
    }

    fn confirmed_mode() -> ProposalMode {
        ProposalMode::Confirmed {
            min_time: 6 * HOUR,
            max_time: 12 * HOUR,
        }
    }

    #[test]
    fn bullish_signal_rotates_into_base() {
        let mut w = initialized(ProposalMode::Direct);
        let ctx = CallContext::at(T0);
        assert!(w.manager.can_propose(&ctx, &StaticSignal(true), &w.token));

        let outcome = w
            .manager
            .propose(&ctx, &StaticSignal(true), &mut w.token, &mut w.registry)
            .unwrap();
        assert_eq!(outcome.base_asset_allocation, U256::from(100u64));
        assert_eq!(outcome.allocation.next_set, w.eth_set);
        assert_eq!(outcome.auction.start_price, U256::from(960u64));
        assert_eq!(outcome.auction.pivot_price, U256::from(1040u64));
        assert_eq!(w.manager.base_asset_allocation(), U256::from(100u64));
        assert_eq!(w.token.rebalance_state(), RebalanceState::Proposal);
        assert_eq!(w.token.next_set(), Some(w.eth_set));
    }

    #[test]
    fn unpriceable_auction_creates_no_set() {
        let mut w = initialized(ProposalMode::Direct);
        // ETH at $120 needs a fresh set, and a one-second increment cannot be priced
        w.eth.set_price(usd("120").unwrap());
        w.manager.config.auction_price_model = AuctionPriceModel::LinearBand { time_increment: 1 };

        let err = w
            .manager
            .propose(&CallContext::at(T0), &StaticSignal(true), &mut w.token, &mut w.registry)
            .unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Auction(crate::manager::AuctionError::StartPriceUnderflow { .. })
        ));
        assert_eq!(w.registry.created_count(), 0);
        assert_eq!(w.manager.allocator().cached_sets(), 2);
        assert_eq!(w.manager.base_asset_allocation(), U256::ZERO);
        assert_eq!(w.manager.allocation_state().flipped_index(), 0);
        assert_eq!(w.token.rebalance_state(), RebalanceState::Default);
    }

    #[test]
    fn bearish_signal_matching_allocation_is_no_change() {
        let mut w = initialized(ProposalMode::Direct);
        let err = w
            .manager
            .propose(&CallContext::at(T0), &StaticSignal(false), &mut w.token, &mut w.registry)
            .unwrap_err();
        assert_eq!(err, ManagerError::NoChange);
        assert_eq!(w.manager.bearish_base_asset_allocation(), U256::ZERO);
    }

    #[test]
    fn initialization_rules() {
        let mut w = world(ProposalMode::Direct);
        let err = w
            .manager
            .propose(&CallContext::at(T0), &StaticSignal(true), &mut w.token, &mut w.registry)
            .unwrap_err();
        assert_eq!(err, ManagerError::NotInitialized);

        let err = w
            .manager
            .initialize(&CallContext::at(T0), &w.token, &w.registry)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authorization);

        let ctx = CallContext::new(owner(), T0);
        w.manager.initialize(&ctx, &w.token, &w.registry).unwrap();
        assert_eq!(
            w.manager.initialize(&ctx, &w.token, &w.registry),
            Err(ManagerError::AlreadyInitialized)
        );
    }

    #[test]
    fn acts_only_while_token_is_in_default() {
        let mut w = initialized(ProposalMode::Direct);
        let ctx = CallContext::at(T0);
        w.manager
            .propose(&ctx, &StaticSignal(true), &mut w.token, &mut w.registry)
            .unwrap();
        let err = w
            .manager
            .propose(&ctx, &StaticSignal(false), &mut w.token, &mut w.registry)
            .unwrap_err();
        assert_eq!(err, ManagerError::WrongState(RebalanceState::Proposal));
    }

    #[test]
    fn rebalance_interval_is_enforced() {
        let mut w = initialized(ProposalMode::Direct);
        let err = w
            .manager
            .propose(
                &CallContext::at(T0 - 1),
                &StaticSignal(true),
                &mut w.token,
                &mut w.registry,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ManagerError::TooSoon {
                now: T0 - 1,
                available_at: T0
            }
        );
    }

    #[test]
    fn foreign_token_is_rejected() {
        let mut w = initialized(ProposalMode::Direct);
        let mut other = InMemoryRebalancingToken::new(
            Address::repeat_byte(0x71),
            w.manager.address(),
            w.usdc_set,
            DAY,
            0,
        );
        let err = w
            .manager
            .propose(&CallContext::at(T0), &StaticSignal(true), &mut other, &mut w.registry)
            .unwrap_err();
        assert!(matches!(err, ManagerError::TokenMismatch { .. }));
    }

    #[test]
    fn entry_points_follow_proposal_mode() {
        let mut w = initialized(ProposalMode::Direct);
        let err = w
            .manager
            .initial_propose(&CallContext::at(T0), &StaticSignal(true), &w.token)
            .unwrap_err();
        assert_eq!(err, ManagerError::WrongProposalMode { mode: "direct" });

        let mut w = initialized(confirmed_mode());
        let err = w
            .manager
            .propose(&CallContext::at(T0), &StaticSignal(true), &mut w.token, &mut w.registry)
            .unwrap_err();
        assert_eq!(err, ManagerError::WrongProposalMode { mode: "confirmed" });
    }

    #[test]
    fn confirmed_mode_waits_for_the_window() {
        let mut w = initialized(confirmed_mode());
        let bullish = StaticSignal(true);
        let ctx = CallContext::at(T0);

        assert!(w.manager.can_initial_propose(&ctx, &bullish, &w.token));
        w.manager.initial_propose(&ctx, &bullish, &w.token).unwrap();
        assert_eq!(w.manager.base_asset_allocation(), U256::ZERO);

        let early = ctx.advanced(HOUR);
        assert!(!w.manager.can_confirm_propose(&early, &bullish, &w.token));
        let err = w
            .manager
            .confirm_propose(&early, &bullish, &mut w.token, &mut w.registry)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timing);

        let on_time = ctx.advanced(7 * HOUR);
        assert!(w.manager.can_confirm_propose(&on_time, &bullish, &w.token));
        let outcome = w
            .manager
            .confirm_propose(&on_time, &bullish, &mut w.token, &mut w.registry)
            .unwrap();
        assert_eq!(outcome.flipped_index, 1);
        assert_eq!(w.manager.base_asset_allocation(), U256::from(100u64));
        assert_eq!(w.manager.pending_proposal(), None);
    }

    #[test]
    fn reverted_signal_cannot_confirm_proposal() {
        let mut w = initialized(confirmed_mode());
        let ctx = CallContext::at(T0);
        w.manager
            .initial_propose(&ctx, &StaticSignal(true), &w.token)
            .unwrap();
        let err = w
            .manager
            .confirm_propose(
                &ctx.advanced(7 * HOUR),
                &StaticSignal(false),
                &mut w.token,
                &mut w.registry,
            )
            .unwrap_err();
        assert_eq!(err, ManagerError::NoChange);
        assert_eq!(w.token.rebalance_state(), RebalanceState::Default);
    }

    #[test]
    fn fee_changes_go_through_the_timelock() {
        let mut w = initialized(ProposalMode::Direct);
        let owner_ctx = CallContext::new(owner(), T0);
        w.manager.set_time_lock_period(&owner_ctx, DAY).unwrap();

        let fee = U256::from(25u64);
        let outcome = w
            .manager
            .adjust_fee(&owner_ctx, FeeKind::Rebalance, fee, &mut w.token)
            .unwrap();
        assert!(matches!(outcome, TimeLockOutcome::Registered { .. }));
        assert_eq!(w.token.fee(FeeKind::Rebalance), None);

        let err = w
            .manager
            .adjust_fee(&owner_ctx.advanced(HOUR), FeeKind::Rebalance, fee, &mut w.token)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timing);

        w.manager
            .adjust_fee(&owner_ctx.advanced(DAY), FeeKind::Rebalance, fee, &mut w.token)
            .unwrap();
        assert_eq!(w.token.fee(FeeKind::Rebalance), Some(fee));
        assert!(matches!(
            w.manager.events().last(),
            Some(ManagerEvent::FeeAdjusted { .. })
        ));
    }

    #[test]
    fn registered_upgrade_can_be_removed_by_owner_only() {
        let mut w = initialized(ProposalMode::Direct);
        let owner_ctx = CallContext::new(owner(), T0);
        w.manager.set_time_lock_period(&owner_ctx, DAY).unwrap();
        w.manager
            .adjust_fee(&owner_ctx, FeeKind::Streaming, U256::from(1u64), &mut w.token)
            .unwrap();
        let hash = UpgradeAction::SetFee(FeeKind::Streaming, U256::from(1u64)).hash();

        assert!(matches!(
            w.manager.remove_registered_upgrade(&CallContext::at(T0), &hash),
            Err(ManagerError::Unauthorized { .. })
        ));
        w.manager.remove_registered_upgrade(&owner_ctx, &hash).unwrap();
        assert_eq!(w.manager.time_lock().pending(), 0);
        assert!(w.manager.set_time_lock_period(&owner_ctx, 0).is_err());
    }
}
