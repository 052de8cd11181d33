//! Timelocked upgrades keyed by a content hash.
//!
//! The first submission of an action registers it; submitting the identical
//! action again once `period` has elapsed (and before the registration
//! expires) releases it for execution. A period of zero executes at once.

use crate::domain::FeeKind;
use crate::error::ErrorCategory;
use crate::math::u256_dec;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeLockError {
    #[error("upgrade {hash} executable at {executable_at}, now {now}")]
    TooEarly {
        hash: UpgradeHash,
        now: u64,
        executable_at: u64,
    },

    #[error("no registered upgrade {0}")]
    UnknownUpgrade(UpgradeHash),

    #[error("time lock period may only increase: current {current}, requested {requested}")]
    PeriodDecrease { current: u64, requested: u64 },

    #[error("time lock expiry window must be positive")]
    ZeroExpiryWindow,
}

impl TimeLockError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TimeLockError::TooEarly { .. } => ErrorCategory::Timing,
            TimeLockError::UnknownUpgrade(_) => ErrorCategory::State,
            TimeLockError::PeriodDecrease { .. } | TimeLockError::ZeroExpiryWindow => {
                ErrorCategory::Validation
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeAction {
    SetFee(FeeKind, #[serde(with = "u256_dec")] U256),
}

impl UpgradeAction {
    pub fn hash(&self) -> UpgradeHash {
        let mut hasher = blake3::Hasher::new();
        match self {
            UpgradeAction::SetFee(kind, value) => {
                hasher.update(b"set_fee");
                hasher.update(&[kind.tag()]);
                hasher.update(&value.to_be_bytes::<32>());
            }
        }
        UpgradeHash(*hasher.finalize().as_bytes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpgradeHash([u8; 32]);

impl UpgradeHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for UpgradeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", blake3::Hash::from(self.0).to_hex())
    }
}

impl Serialize for UpgradeHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn default_expiry_window() -> u64 {
    7 * 86_400
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLockConfig {
    #[serde(default)]
    pub period: u64,
    #[serde(default = "default_expiry_window")]
    pub expiry_window: u64,
}

impl Default for TimeLockConfig {
    fn default() -> Self {
        Self {
            period: 0,
            expiry_window: default_expiry_window(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeLockOutcome {
    Registered {
        hash: UpgradeHash,
        executable_at: u64,
        expires_at: u64,
    },
    Ready(UpgradeAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Registration {
    action: UpgradeAction,
    registered_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLock {
    period: u64,
    expiry_window: u64,
    upgrades: HashMap<UpgradeHash, Registration>,
}

impl TimeLock {
    pub fn new(config: TimeLockConfig) -> Result<Self, TimeLockError> {
        if config.expiry_window == 0 {
            return Err(TimeLockError::ZeroExpiryWindow);
        }
        Ok(Self {
            period: config.period,
            expiry_window: config.expiry_window,
            upgrades: HashMap::new(),
        })
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn pending(&self) -> usize {
        self.upgrades.len()
    }

    pub fn registered_action(&self, hash: &UpgradeHash) -> Option<UpgradeAction> {
        self.upgrades.get(hash).map(|r| r.action)
    }

    fn register(&mut self, now: u64, action: UpgradeAction) -> TimeLockOutcome {
        let hash = action.hash();
        self.upgrades.insert(
            hash,
            Registration {
                action,
                registered_at: now,
            },
        );
        let executable_at = now.saturating_add(self.period);
        TimeLockOutcome::Registered {
            hash,
            executable_at,
            expires_at: executable_at.saturating_add(self.expiry_window),
        }
    }

    pub fn submit(&mut self, now: u64, action: UpgradeAction) -> Result<TimeLockOutcome, TimeLockError> {
        if self.period == 0 {
            return Ok(TimeLockOutcome::Ready(action));
        }
        let hash = action.hash();
        let Some(registration) = self.upgrades.get(&hash).copied() else {
            return Ok(self.register(now, action));
        };

        let executable_at = registration.registered_at.saturating_add(self.period);
        let expires_at = executable_at.saturating_add(self.expiry_window);
        if now < executable_at {
            return Err(TimeLockError::TooEarly {
                hash,
                now,
                executable_at,
            });
        }
        if now > expires_at {
            return Ok(self.register(now, action));
        }
        self.upgrades.remove(&hash);
        Ok(TimeLockOutcome::Ready(action))
    }

    pub fn remove(&mut self, hash: &UpgradeHash) -> Result<UpgradeAction, TimeLockError> {
        self.upgrades
            .remove(hash)
            .map(|r| r.action)
            .ok_or(TimeLockError::UnknownUpgrade(*hash))
    }

    pub fn set_period(&mut self, period: u64) -> Result<(), TimeLockError> {
        if period < self.period {
            return Err(TimeLockError::PeriodDecrease {
                current: self.period,
                requested: period,
            });
        }
        self.period = period;
        Ok(())
    }
}
