//! Error categories shared by every module.
//!
//! Each module owns its own `thiserror` enum; all of them map onto one of the
//! five categories below so off-chain tooling can decide whether to retry,
//! wait, or page an operator.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad construction or call arguments. Not recoverable.
    Validation,
    /// Wrong phase, not initialized, already initialized, nothing to change.
    State,
    /// Too early, outside a confirmation window, interval not elapsed.
    Timing,
    /// Insufficient history, degenerate prices, malformed collateral.
    Data,
    /// Caller is not allowed to perform the operation.
    Authorization,
}

impl ErrorCategory {
    /// Whether waiting and resubmitting can make the call succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorCategory::State | ErrorCategory::Timing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::State => "state",
            ErrorCategory::Timing => "timing",
            ErrorCategory::Data => "data",
            ErrorCategory::Authorization => "authorization",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
