use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Caller and block timestamp of one serialized call.
///
/// Timestamps are seconds and must never decrease between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub sender: Address,
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }

    /// Anonymous caller, for permissionless entry points.
    pub fn at(timestamp: u64) -> Self {
        Self {
            sender: Address::ZERO,
            timestamp,
        }
    }

    /// Same caller, later timestamp.
    pub fn advanced(&self, seconds: u64) -> Self {
        Self {
            sender: self.sender,
            timestamp: self.timestamp.saturating_add(seconds),
        }
    }
}
