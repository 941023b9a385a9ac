//! # LedgerClient: the external ledger capability
//!
//! The synchronization core never talks to a chain directly. It consumes a
//! [`LedgerClient`] supplied by the embedding application, which owns the RPC
//! transport, the contract address and ABI, and the wallet signer.
//!
//! ```text
//! tally-app (pure)              embedding front end
//! ┌──────────────────┐          ┌────────────────────┐
//! │ SyncController   │          │ RPC + wallet glue  │
//! │  ┌────────────┐  │          │   implements       │
//! │  │LedgerClient│◄─┼──────────│   LedgerClient     │
//! │  └────────────┘  │          │                    │
//! └──────────────────┘          └────────────────────┘
//! ```
//!
//! Read calls return a value or a [`TallyError::Read`](crate::TallyError::Read). Write calls yield a
//! [`TxHandle`] whose outcome is observed through a [`ConfirmationStream`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::{Account, AccountAggregate, Amount, ExpenseEntry, TxHandle};

/// A notification about a submitted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationEvent {
    /// Still waiting for inclusion
    Pending,
    /// Included and executed successfully
    Success,
    /// Included but rejected by the ledger
    Reverted {
        /// Revert reason, when the client can decode one
        reason: Option<String>,
    },
}

impl ConfirmationEvent {
    /// Whether this event ends the stream's meaningful content
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Stream of confirmation events: zero or more `Pending`, then one terminal event.
pub type ConfirmationStream = BoxStream<'static, ConfirmationEvent>;

/// Contract consumed by the synchronization core.
///
/// Implementations must be cheap to call concurrently; a single refresh may
/// issue many `read_entry` calls at once.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read the account's entry count and running total.
    ///
    /// Returns [`TallyError::Read`](crate::TallyError::Read) when the account has never written.
    async fn read_aggregate(&self, account: &Account) -> Result<AccountAggregate>;

    /// Read the entry at `index` for the account.
    ///
    /// Returns [`TallyError::Read`](crate::TallyError::Read) when `index` is out of range at call time.
    async fn read_entry(&self, account: &Account, index: u64) -> Result<ExpenseEntry>;

    /// Read the first `count` entries in a single call, if the ledger can.
    ///
    /// `None` means no batch capability; callers fall back to `read_entry`.
    async fn read_entries(
        &self,
        _account: &Account,
        _count: u64,
    ) -> Option<Result<Vec<ExpenseEntry>>> {
        None
    }

    /// Ask the wallet to sign and relay an `addExpense` call from `from`.
    ///
    /// Returns [`TallyError::Submission`](crate::TallyError::Submission) if no handle was produced.
    async fn submit_write(
        &self,
        from: &Account,
        amount: Amount,
        description: &str,
    ) -> Result<TxHandle>;

    /// Subscribe to the confirmation outcome of a submitted write.
    async fn observe_confirmation(&self, handle: &TxHandle) -> Result<ConfirmationStream>;
}
