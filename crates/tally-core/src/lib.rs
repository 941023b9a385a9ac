//! Tally Core - Ledger-facing foundation
//!
//! This crate holds the types every other Tally crate agrees on. It contains no
//! runtime, no networking, and no application logic.
//!
//! # Contents
//!
//! - [`types`]: `Account`, `TxHandle`, `Amount`, `ExpenseEntry`, `AccountAggregate`
//! - [`ledger`]: the [`LedgerClient`] contract consumed by the application core
//! - [`lifecycle`]: the write-attempt state machine ([`TransactionLifecycle`])
//! - [`snapshot`]: the atomically published read-side state ([`ReadSnapshot`])
//! - [`reactive`]: [`Dynamic<T>`], a versioned value with poll-based subscriptions
//! - [`errors`]: the unified [`TallyError`] taxonomy

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Ledger client contract (external capability)
pub mod ledger;

/// Write-attempt lifecycle state machine
pub mod lifecycle;

/// Reactive primitive for observable state
pub mod reactive;

/// Read-side snapshot type
pub mod snapshot;

/// Addresses, hashes, amounts, and ledger records
pub mod types;

pub use errors::{Result, TallyError, ValidationError};
pub use ledger::{ConfirmationEvent, ConfirmationStream, LedgerClient};
pub use lifecycle::{FailureKind, TransactionLifecycle, TxFailure, TxPhase};
pub use reactive::{Dynamic, Subscription};
pub use snapshot::ReadSnapshot;
pub use types::{Account, AccountAggregate, Amount, AmountParseError, ExpenseEntry, TxHandle};
