//! Read-side snapshot
//!
//! A snapshot is built off to the side and published in one step. Consumers
//! hold it behind an `Arc` and never see a half-updated list.

use serde::{Deserialize, Serialize};

use crate::types::{AccountAggregate, Amount, ExpenseEntry};

/// Aggregate totals and ordered entries for one account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReadSnapshot {
    aggregate: AccountAggregate,
    entries: Vec<ExpenseEntry>,
}

impl ReadSnapshot {
    /// The snapshot for a disconnected session or a fresh account
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assemble a snapshot from a completed read cycle.
    ///
    /// `entries` must already be in ledger index order.
    pub fn new(aggregate: AccountAggregate, entries: Vec<ExpenseEntry>) -> Self {
        Self { aggregate, entries }
    }

    /// Ledger-maintained totals
    pub fn aggregate(&self) -> &AccountAggregate {
        &self.aggregate
    }

    /// Entries in ledger index order
    pub fn entries(&self) -> &[ExpenseEntry] {
        &self.entries
    }

    /// Entry count as reported by the ledger
    pub fn entry_count(&self) -> u64 {
        self.aggregate.entry_count
    }

    /// Total amount as reported by the ledger
    pub fn total_amount(&self) -> Amount {
        self.aggregate.total_amount
    }

    /// Whether the snapshot has no entries and a zero aggregate
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.aggregate == AccountAggregate::EMPTY
    }
}
