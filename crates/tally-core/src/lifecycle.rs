//! Write-attempt lifecycle
//!
//! Exactly one attempt is tracked at a time. The phase graph is:
//!
//! ```text
//! Idle ──► Submitting ──► AwaitingConfirmation ──► Confirmed
//!  ▲           │                   │
//!  │           └──────► Failed ◄───┘
//!  │
//!  └── (terminal phases restart at Submitting on the next attempt)
//! ```
//!
//! Transitions are pure: each method returns the next lifecycle value or an
//! error, leaving `self` untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Result, TallyError};
use crate::types::TxHandle;

/// Phase of the current write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TxPhase {
    /// No write attempted this session
    #[default]
    Idle,
    /// Waiting for the wallet to produce a handle
    Submitting,
    /// Handle obtained; waiting for inclusion
    AwaitingConfirmation,
    /// Included and executed successfully
    Confirmed,
    /// Rejected by the wallet or reverted by the ledger
    Failed,
}

impl TxPhase {
    /// Whether a write is currently in flight
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingConfirmation)
    }

    /// Whether the attempt has a final outcome
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Whether `next` directly follows `self` in the phase graph.
    #[must_use]
    pub fn can_advance_to(self, next: TxPhase) -> bool {
        use TxPhase::*;
        matches!(
            (self, next),
            (Idle | Confirmed | Failed, Submitting)
                | (Submitting, AwaitingConfirmation)
                | (Submitting, Failed)
                | (AwaitingConfirmation, Confirmed)
                | (AwaitingConfirmation, Failed)
        )
    }

    /// Short label for logs and views
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::AwaitingConfirmation => "awaiting-confirmation",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a failed attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Wallet rejected or could not relay the write
    Submission,
    /// Ledger reverted the transaction after inclusion
    Revert,
    /// Confirmation could not be observed to a final outcome
    Observation,
}

/// Failure details for an attempt in [`TxPhase::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxFailure {
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable reason; never empty
    pub reason: String,
}

impl TxFailure {
    /// Reason used when the ledger reverts without one
    pub const DEFAULT_REVERT_REASON: &'static str = "transaction reverted";

    /// Create a failure, substituting a generic reason for an empty one.
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            match kind {
                FailureKind::Submission => "submission failed".to_string(),
                FailureKind::Revert => Self::DEFAULT_REVERT_REASON.to_string(),
                FailureKind::Observation => "confirmation unavailable".to_string(),
            }
        } else {
            reason
        };
        Self { kind, reason }
    }

    /// Failure from a revert, with the ledger's reason when available
    pub fn revert(reason: Option<String>) -> Self {
        Self::new(FailureKind::Revert, reason.unwrap_or_default())
    }

    /// The error a caller waiting on this attempt should see.
    pub fn to_error(&self) -> TallyError {
        match self.kind {
            FailureKind::Submission => TallyError::submission(self.reason.clone()),
            FailureKind::Revert => TallyError::revert(Some(self.reason.clone())),
            FailureKind::Observation => TallyError::read(self.reason.clone()),
        }
    }
}

/// The most recent write attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TransactionLifecycle {
    attempt: u64,
    phase: TxPhase,
    handle: Option<TxHandle>,
    failure: Option<TxFailure>,
}

impl TransactionLifecycle {
    /// The lifecycle before any write
    pub fn idle() -> Self {
        Self::default()
    }

    /// Attempt number; 0 while idle, incremented by each new attempt
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Current phase
    pub fn phase(&self) -> TxPhase {
        self.phase
    }

    /// Handle of the submitted write, once the wallet produced one
    pub fn handle(&self) -> Option<&TxHandle> {
        self.handle.as_ref()
    }

    /// Failure details; present only in [`TxPhase::Failed`]
    pub fn failure(&self) -> Option<&TxFailure> {
        self.failure.as_ref()
    }

    /// Failure reason; present only in [`TxPhase::Failed`]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.reason.as_str())
    }

    /// Start a new attempt, retiring any terminal state.
    ///
    /// Fails with [`TallyError::ConcurrentWrite`] while an attempt is in flight.
    pub fn begin_attempt(&self) -> Result<Self> {
        if self.phase.is_in_flight() {
            return Err(TallyError::ConcurrentWrite);
        }
        self.check(TxPhase::Submitting)?;
        Ok(Self {
            attempt: self.attempt + 1,
            phase: TxPhase::Submitting,
            handle: None,
            failure: None,
        })
    }

    /// Record the handle returned by the wallet.
    pub fn with_handle(&self, handle: TxHandle) -> Result<Self> {
        self.check(TxPhase::AwaitingConfirmation)?;
        Ok(Self {
            attempt: self.attempt,
            phase: TxPhase::AwaitingConfirmation,
            handle: Some(handle),
            failure: None,
        })
    }

    /// Record a successful confirmation.
    pub fn confirmed(&self) -> Result<Self> {
        self.check(TxPhase::Confirmed)?;
        Ok(Self {
            phase: TxPhase::Confirmed,
            ..self.clone()
        })
    }

    /// Record a failure from submission or confirmation.
    pub fn failed(&self, failure: TxFailure) -> Result<Self> {
        self.check(TxPhase::Failed)?;
        Ok(Self {
            phase: TxPhase::Failed,
            failure: Some(failure),
            ..self.clone()
        })
    }

    fn check(&self, next: TxPhase) -> Result<()> {
        if self.phase.can_advance_to(next) {
            Ok(())
        } else {
            Err(TallyError::internal(format!(
                "illegal lifecycle transition {} -> {}",
                self.phase, next
            )))
        }
    }
}
