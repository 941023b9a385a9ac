//! Unified error system for Tally
//!
//! One error enum covers every failure the synchronization core can observe.
//! Variants mirror how each failure is recovered: validation errors never reach
//! the ledger, read errors degrade to stale or empty state, and write errors are
//! folded into the transaction lifecycle.

use serde::{Deserialize, Serialize};

/// Malformed local input for a new expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ValidationError {
    /// The amount field was empty
    #[error("amount is empty")]
    EmptyAmount,

    /// The amount did not parse as an integer greater than zero
    #[error("amount {input:?} is not a positive integer")]
    NotPositiveInteger {
        /// The rejected input, as typed
        input: String,
    },

    /// The description field was empty
    #[error("description is empty")]
    EmptyDescription,
}

/// Unified error type for all Tally operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TallyError {
    /// Local input rejected before contacting the ledger
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A read call failed, or the account has no on-chain footprint
    #[error("Read error: {message}")]
    Read {
        /// Error message from the ledger client
        message: String,
    },

    /// The wallet rejected or failed to relay a write
    #[error("Submission error: {message}")]
    Submission {
        /// Error message from the wallet or relay
        message: String,
    },

    /// A write was requested while another one is still in flight
    #[error("A write is already in flight")]
    ConcurrentWrite,

    /// The ledger rejected the transaction after inclusion
    #[error("Transaction reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Revert {
        /// Revert reason, when the ledger client supplies one
        reason: Option<String>,
    },

    /// No wallet account is connected
    #[error("No wallet account connected")]
    NotConnected,

    /// Configuration could not be loaded or parsed
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl TallyError {
    /// Create a read error
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Create a submission error
    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission {
            message: message.into(),
        }
    }

    /// Create a revert error
    pub fn revert(reason: Option<String>) -> Self {
        Self::Revert { reason }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this is a read failure.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}

/// Standard Result type for Tally operations
pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_display_with_and_without_reason() {
        let with = TallyError::revert(Some("insufficient allowance".into()));
        assert_eq!(
            with.to_string(),
            "Transaction reverted: insufficient allowance"
        );

        let without = TallyError::revert(None);
        assert_eq!(without.to_string(), "Transaction reverted: no reason given");
    }

    #[test]
    fn test_validation_converts_into_tally_error() {
        let err: TallyError = ValidationError::EmptyDescription.into();
        assert!(matches!(
            err,
            TallyError::Validation(ValidationError::EmptyDescription)
        ));
    }

    #[test]
    fn test_read_classification() {
        assert!(TallyError::read("no such account").is_read());
        assert!(!TallyError::submission("user denied").is_read());
    }
}
