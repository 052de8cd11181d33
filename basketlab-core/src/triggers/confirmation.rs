//! Two-phase confirmation state machine.
//!
//! `Confirmable<S>` holds a confirmed value and at most one pending candidate.
//! A change is first *initiated* (recording the candidate and a timestamp)
//! and later *confirmed* inside `[since + min_time, since + max_time]`,
//! re-checking the observation at confirmation time. Both the bullish
//! trigger (`S = bool`) and the manager's allocation (`S = U256`) use it.
//!
//! Every `check_*` runs the exact guards of the mutating call, so the
//! `can_*` predicates can never disagree with what the call would do.

use crate::error::ErrorCategory;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    #[error("confirmation window min time {min_time} exceeds max time {max_time}")]
    InvalidWindow { min_time: u64, max_time: u64 },

    #[error("not enough time elapsed since last initiation at {last_initiated_at} (retrigger interval {retrigger_interval}s, now {now})")]
    NotEnoughTimeElapsed {
        now: u64,
        last_initiated_at: u64,
        retrigger_interval: u64,
    },

    #[error("observed state does not differ from the confirmed state")]
    NoChange,

    #[error("no pending signal to confirm")]
    NoPendingSignal,

    #[error("now {now} outside confirmation window [{opens_at}, {closes_at}]")]
    OutsideWindow {
        now: u64,
        opens_at: u64,
        closes_at: u64,
    },
}

impl ConfirmationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConfirmationError::InvalidWindow { .. } => ErrorCategory::Validation,
            ConfirmationError::NoChange => ErrorCategory::State,
            ConfirmationError::NotEnoughTimeElapsed { .. }
            | ConfirmationError::NoPendingSignal
            | ConfirmationError::OutsideWindow { .. } => ErrorCategory::Timing,
        }
    }
}

/// Seconds after initiation during which a confirmation may land (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationWindow {
    pub min_time: u64,
    pub max_time: u64,
}

impl ConfirmationWindow {
    pub fn new(min_time: u64, max_time: u64) -> Result<Self, ConfirmationError> {
        let window = Self { min_time, max_time };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), ConfirmationError> {
        if self.min_time > self.max_time {
            return Err(ConfirmationError::InvalidWindow {
                min_time: self.min_time,
                max_time: self.max_time,
            });
        }
        Ok(())
    }

    pub fn opens_at(&self, since: u64) -> u64 {
        since.saturating_add(self.min_time)
    }

    pub fn closes_at(&self, since: u64) -> u64 {
        since.saturating_add(self.max_time)
    }

    pub fn contains(&self, since: u64, now: u64) -> bool {
        self.opens_at(since) <= now && now <= self.closes_at(since)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pending<S> {
    pub candidate: S,
    pub since: u64,
}

/// A confirmed change of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
    pub flipped_index: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmable<S> {
    confirmed: S,
    pending: Option<Pending<S>>,
    last_initiated_at: Option<u64>,
    flipped_index: u64,
    window: ConfirmationWindow,
    retrigger_interval: u64,
}

impl<S: Copy + PartialEq> Confirmable<S> {
    /// The retrigger interval defaults to the window's `max_time`: a new
    /// initiation is accepted only once the previous one can no longer be
    /// confirmed.
    pub fn new(initial: S, window: ConfirmationWindow) -> Result<Self, ConfirmationError> {
        window.validate()?;
        Ok(Self {
            confirmed: initial,
            pending: None,
            last_initiated_at: None,
            flipped_index: 0,
            window,
            retrigger_interval: window.max_time,
        })
    }

    pub fn with_retrigger_interval(mut self, retrigger_interval: u64) -> Self {
        self.retrigger_interval = retrigger_interval;
        self
    }

    pub fn confirmed(&self) -> S {
        self.confirmed
    }

    pub fn pending(&self) -> Option<Pending<S>> {
        self.pending
    }

    pub fn last_initiated_at(&self) -> Option<u64> {
        self.last_initiated_at
    }

    pub fn flipped_index(&self) -> u64 {
        self.flipped_index
    }

    pub fn window(&self) -> ConfirmationWindow {
        self.window
    }

    pub fn retrigger_interval(&self) -> u64 {
        self.retrigger_interval
    }

    pub fn check_initiate(&self, now: u64, observed: S) -> Result<(), ConfirmationError> {
        if let Some(last) = self.last_initiated_at {
            if now <= last.saturating_add(self.retrigger_interval) {
                return Err(ConfirmationError::NotEnoughTimeElapsed {
                    now,
                    last_initiated_at: last,
                    retrigger_interval: self.retrigger_interval,
                });
            }
        }
        if observed == self.confirmed {
            return Err(ConfirmationError::NoChange);
        }
        Ok(())
    }

    pub fn can_initiate(&self, now: u64, observed: S) -> bool {
        self.check_initiate(now, observed).is_ok()
    }

    /// Record `observed` as the pending candidate. Overwrites a stale
    /// pending candidate.
    pub fn initiate(&mut self, now: u64, observed: S) -> Result<Pending<S>, ConfirmationError> {
        self.check_initiate(now, observed)?;
        let pending = Pending {
            candidate: observed,
            since: now,
        };
        self.pending = Some(pending);
        self.last_initiated_at = Some(now);
        Ok(pending)
    }

    pub fn check_confirm(&self, now: u64, observed: S) -> Result<(), ConfirmationError> {
        let pending = self.pending.ok_or(ConfirmationError::NoPendingSignal)?;
        if !self.window.contains(pending.since, now) {
            return Err(ConfirmationError::OutsideWindow {
                now,
                opens_at: self.window.opens_at(pending.since),
                closes_at: self.window.closes_at(pending.since),
            });
        }
        if observed == self.confirmed {
            return Err(ConfirmationError::NoChange);
        }
        Ok(())
    }

    pub fn can_confirm(&self, now: u64, observed: S) -> bool {
        self.check_confirm(now, observed).is_ok()
    }

    pub fn confirm(&mut self, now: u64, observed: S) -> Result<Transition<S>, ConfirmationError> {
        self.check_confirm(now, observed)?;
        Ok(self.commit(now, observed))
    }

    /// Single-shot change without a confirmation window.
    pub fn apply(&mut self, now: u64, observed: S) -> Result<Transition<S>, ConfirmationError> {
        if observed == self.confirmed {
            return Err(ConfirmationError::NoChange);
        }
        Ok(self.commit(now, observed))
    }

    fn commit(&mut self, now: u64, observed: S) -> Transition<S> {
        let from = self.confirmed;
        self.confirmed = observed;
        self.flipped_index += 1;
        self.pending = None;
        Transition {
            from,
            to: observed,
            flipped_index: self.flipped_index,
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3_600;
    const T0: u64 = 1_700_000_000;

    fn machine() -> Confirmable<bool> {
        Confirmable::new(false, ConfirmationWindow::new(6 * HOUR, 12 * HOUR).unwrap()).unwrap()
    }

    #[test]
    fn window_must_be_ordered() {
        assert_eq!(
            ConfirmationWindow::new(2, 1),
            Err(ConfirmationError::InvalidWindow {
                min_time: 2,
                max_time: 1
            })
        );
        assert!(ConfirmationWindow::new(5, 5).is_ok());
    }

    #[test]
    fn initiate_then_confirm_flips() {
        let mut m = machine();
        let pending = m.initiate(T0, true).unwrap();
        assert_eq!(pending, Pending { candidate: true, since: T0 });
        assert!(!m.confirmed());

        let t = m.confirm(T0 + 7 * HOUR, true).unwrap();
        assert_eq!(
            t,
            Transition {
                from: false,
                to: true,
                flipped_index: 1,
                timestamp: T0 + 7 * HOUR
            }
        );
        assert!(m.confirmed());
        assert_eq!(m.pending(), None);
    }

    #[test]
    fn initiate_without_change_fails() {
        let mut m = machine();
        assert_eq!(m.initiate(T0, false), Err(ConfirmationError::NoChange));
        assert_eq!(m.last_initiated_at(), None);
    }

    #[test]
    fn retrigger_is_gated() {
        let mut m = machine();
        m.initiate(T0, true).unwrap();
        let err = m.initiate(T0 + 12 * HOUR, true).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timing);
        assert!(m.can_initiate(T0 + 12 * HOUR + 1, true));
        m.initiate(T0 + 12 * HOUR + 1, true).unwrap();
        assert_eq!(m.pending().map(|p| p.since), Some(T0 + 12 * HOUR + 1));
    }

    #[test]
    fn custom_retrigger_interval() {
        let mut m = machine().with_retrigger_interval(HOUR);
        m.initiate(T0, true).unwrap();
        assert!(!m.can_initiate(T0 + HOUR, true));
        assert!(m.can_initiate(T0 + HOUR + 1, true));
    }

    #[test]
    fn confirm_without_pending_fails() {
        let mut m = machine();
        assert_eq!(m.confirm(T0, true), Err(ConfirmationError::NoPendingSignal));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let m = {
            let mut m = machine();
            m.initiate(T0, true).unwrap();
            m
        };
        assert!(!m.can_confirm(T0 + 6 * HOUR - 1, true));
        assert!(m.can_confirm(T0 + 6 * HOUR, true));
        assert!(m.can_confirm(T0 + 12 * HOUR, true));
        assert_eq!(
            m.check_confirm(T0 + 12 * HOUR + 1, true),
            Err(ConfirmationError::OutsideWindow {
                now: T0 + 12 * HOUR + 1,
                opens_at: T0 + 6 * HOUR,
                closes_at: T0 + 12 * HOUR
            })
        );
    }

    #[test]
    fn reverted_observation_fails_and_keeps_pending() {
        let mut m = machine();
        m.initiate(T0, true).unwrap();
        let before = m.clone();
        assert_eq!(m.confirm(T0 + 7 * HOUR, false), Err(ConfirmationError::NoChange));
        assert_eq!(m, before);
    }

    #[test]
    fn apply_commits_directly() {
        let mut m: Confirmable<u64> =
            Confirmable::new(0, ConfirmationWindow::new(0, 0).unwrap()).unwrap();
        let t = m.apply(T0, 100).unwrap();
        assert_eq!((t.from, t.to, t.flipped_index), (0, 100, 1));
        assert_eq!(m.apply(T0 + 1, 100), Err(ConfirmationError::NoChange));
    }
}
