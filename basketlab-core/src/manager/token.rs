//! The rebalancing token a manager drives.

use crate::domain::{CallContext, FeeKind, Proposal, RebalanceState};
use crate::error::ErrorCategory;
use alloy_primitives::{Address, U256};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("caller {sender} is not the token manager")]
    Unauthorized { sender: Address },

    #[error("token in {actual} state, expected {expected}")]
    WrongState {
        expected: RebalanceState,
        actual: RebalanceState,
    },

    #[error("rebalance interval not elapsed: now {now}, available at {available_at}")]
    TooSoon { now: u64, available_at: u64 },

    #[error("token rejected call: {0}")]
    Rejected(String),
}

impl TokenError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TokenError::Unauthorized { .. } => ErrorCategory::Authorization,
            TokenError::WrongState { .. } | TokenError::Rejected(_) => ErrorCategory::State,
            TokenError::TooSoon { .. } => ErrorCategory::Timing,
        }
    }
}

pub trait RebalancingToken: Send + Sync {
    fn address(&self) -> Address;
    fn rebalance_state(&self) -> RebalanceState;
    fn current_set(&self) -> Address;
    fn next_set(&self) -> Option<Address>;
    fn last_rebalance_timestamp(&self) -> u64;
    fn rebalance_interval(&self) -> u64;

    /// Enter the proposal phase.
    fn propose(&mut self, ctx: &CallContext, proposal: Proposal) -> Result<(), TokenError>;

    fn adjust_fee(&mut self, ctx: &CallContext, kind: FeeKind, value: U256)
        -> Result<(), TokenError>;
}

/// Token phases driven explicitly by the caller: the auction itself is not
/// modelled, `settle` completes it by swapping in the proposed set.
#[derive(Debug, Clone)]
pub struct InMemoryRebalancingToken {
    address: Address,
    manager: Address,
    state: RebalanceState,
    current_set: Address,
    proposal: Option<Proposal>,
    last_rebalance_timestamp: u64,
    rebalance_interval: u64,
    fees: BTreeMap<FeeKind, U256>,
    completed_rebalances: u64,
}

impl InMemoryRebalancingToken {
    pub fn new(
        address: Address,
        manager: Address,
        current_set: Address,
        rebalance_interval: u64,
        last_rebalance_timestamp: u64,
    ) -> Self {
        Self {
            address,
            manager,
            state: RebalanceState::Default,
            current_set,
            proposal: None,
            last_rebalance_timestamp,
            rebalance_interval,
            fees: BTreeMap::new(),
            completed_rebalances: 0,
        }
    }

    pub fn manager(&self) -> Address {
        self.manager
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    pub fn fee(&self, kind: FeeKind) -> Option<U256> {
        self.fees.get(&kind).copied()
    }

    pub fn completed_rebalances(&self) -> u64 {
        self.completed_rebalances
    }

    fn expect_state(&self, expected: RebalanceState) -> Result<(), TokenError> {
        if self.state != expected {
            return Err(TokenError::WrongState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn expect_manager(&self, ctx: &CallContext) -> Result<(), TokenError> {
        if ctx.sender != self.manager {
            return Err(TokenError::Unauthorized { sender: ctx.sender });
        }
        Ok(())
    }

    /// `Proposal → Rebalance`.
    pub fn start_rebalance(&mut self, ctx: &CallContext) -> Result<(), TokenError> {
        self.expect_state(RebalanceState::Proposal)?;
        self.state = RebalanceState::Rebalance;
        info!(token = %self.address, timestamp = ctx.timestamp, "rebalance started");
        Ok(())
    }

    /// `Rebalance → Default`, swapping in the proposed set.
    pub fn settle(&mut self, ctx: &CallContext) -> Result<Address, TokenError> {
        self.expect_state(RebalanceState::Rebalance)?;
        let proposal = self
            .proposal
            .take()
            .ok_or_else(|| TokenError::Rejected("no proposal to settle".into()))?;
        self.current_set = proposal.next_set;
        self.state = RebalanceState::Default;
        self.last_rebalance_timestamp = ctx.timestamp;
        self.completed_rebalances += 1;
        info!(token = %self.address, set = %self.current_set, timestamp = ctx.timestamp, "rebalance settled");
        Ok(self.current_set)
    }

    /// `Rebalance → Drawdown`: the auction failed to complete.
    pub fn enter_drawdown(&mut self, ctx: &CallContext) -> Result<(), TokenError> {
        self.expect_state(RebalanceState::Rebalance)?;
        self.state = RebalanceState::Drawdown;
        info!(token = %self.address, timestamp = ctx.timestamp, "token entered drawdown");
        Ok(())
    }
}

impl RebalancingToken for InMemoryRebalancingToken {
    fn address(&self) -> Address {
        self.address
    }

    fn rebalance_state(&self) -> RebalanceState {
        self.state
    }

    fn current_set(&self) -> Address {
        self.current_set
    }

    fn next_set(&self) -> Option<Address> {
        self.proposal.as_ref().map(|p| p.next_set)
    }

    fn last_rebalance_timestamp(&self) -> u64 {
        self.last_rebalance_timestamp
    }

    fn rebalance_interval(&self) -> u64 {
        self.rebalance_interval
    }

    fn propose(&mut self, ctx: &CallContext, proposal: Proposal) -> Result<(), TokenError> {
        self.expect_manager(ctx)?;
        self.expect_state(RebalanceState::Default)?;
        let available_at = self
            .last_rebalance_timestamp
            .saturating_add(self.rebalance_interval);
        if ctx.timestamp < available_at {
            return Err(TokenError::TooSoon {
                now: ctx.timestamp,
                available_at,
            });
        }
        self.proposal = Some(proposal);
        self.state = RebalanceState::Proposal;
        Ok(())
    }

    fn adjust_fee(
        &mut self,
        ctx: &CallContext,
        kind: FeeKind,
        value: U256,
    ) -> Result<(), TokenError> {
        self.expect_manager(ctx)?;
        self.fees.insert(kind, value);
        Ok(())
    }
}
