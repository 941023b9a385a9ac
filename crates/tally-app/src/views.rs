//! Presentation view model
//!
//! Plain, serializable structs a front end can render directly. Views are
//! derived from one snapshot and one lifecycle, so a single render never
//! mixes two refresh generations.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tally_core::{ExpenseEntry, ReadSnapshot, TransactionLifecycle, TxPhase};

/// Button label while a write is in flight
pub const SAVING_LABEL: &str = "Saving...";
/// Button label when the form is ready
pub const SUBMIT_LABEL: &str = "Add Expense";
/// Status line while waiting for inclusion
pub const AWAITING_MESSAGE: &str = "Waiting for confirmation...";
/// Status line after a successful write
pub const CONFIRMED_MESSAGE: &str = "Transaction confirmed!";
/// Shown when the account has no entries
pub const EMPTY_LIST_MESSAGE: &str =
    "No expenses recorded yet. Add your first expense to see it here.";
/// Shown instead of the dashboard when no wallet is connected
pub const CONNECT_PROMPT: &str =
    "Please connect your wallet to start tracking your on-chain expenses.";

/// Everything needed to render the expense dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    /// Whether an account is active
    pub connected: bool,
    /// Ledger total as a decimal string
    pub total_expenses: String,
    /// Ledger entry count
    pub entry_count: u64,
    /// Entries in ledger order
    pub rows: Vec<ExpenseRow>,
    /// Write status panel
    pub status: StatusView,
}

impl DashboardView {
    /// Build the dashboard from a published snapshot and the current lifecycle.
    ///
    /// `error_dismissed` hides the failure reason without touching the
    /// lifecycle itself.
    pub fn build(
        connected: bool,
        snapshot: &ReadSnapshot,
        lifecycle: &TransactionLifecycle,
        error_dismissed: bool,
    ) -> Self {
        let rows = snapshot
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| ExpenseRow::new(index, entry))
            .collect();
        Self {
            connected,
            total_expenses: snapshot.total_amount().to_string(),
            entry_count: snapshot.entry_count(),
            rows,
            status: StatusView::from_lifecycle(lifecycle, error_dismissed),
        }
    }

    /// Text to show in place of the list, if any
    pub fn placeholder(&self) -> Option<&'static str> {
        if !self.connected {
            Some(CONNECT_PROMPT)
        } else if self.rows.is_empty() {
            Some(EMPTY_LIST_MESSAGE)
        } else {
            None
        }
    }
}

/// One rendered ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRow {
    /// Stable list key: `"{timestamp}-{index}"`
    pub key: String,
    /// Amount as a decimal string
    pub amount: String,
    /// Free-text description
    pub description: String,
    /// Block time in UTC
    pub recorded_at: String,
}

impl ExpenseRow {
    fn new(index: usize, entry: &ExpenseEntry) -> Self {
        Self {
            key: format!("{}-{index}", entry.timestamp),
            amount: entry.amount.to_string(),
            description: entry.description.clone(),
            recorded_at: format_timestamp(entry.timestamp),
        }
    }
}

/// Write status panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    /// A write is in flight; the form should be disabled
    pub busy: bool,
    /// Submit button label
    pub submit_label: String,
    /// Handle of the current attempt, once known
    pub tx_hash: Option<String>,
    /// Progress message
    pub message: Option<String>,
    /// Failure reason of the current attempt
    pub error: Option<String>,
}

impl StatusView {
    /// Derive the panel from a lifecycle.
    pub fn from_lifecycle(lifecycle: &TransactionLifecycle, error_dismissed: bool) -> Self {
        let phase = lifecycle.phase();
        let busy = phase.is_in_flight();
        let message = match phase {
            TxPhase::AwaitingConfirmation => Some(AWAITING_MESSAGE.to_string()),
            TxPhase::Confirmed => Some(CONFIRMED_MESSAGE.to_string()),
            _ => None,
        };
        let error = if error_dismissed {
            None
        } else {
            lifecycle.failure_reason().map(str::to_string)
        };
        Self {
            busy,
            submit_label: if busy { SAVING_LABEL } else { SUBMIT_LABEL }.to_string(),
            tx_hash: lifecycle.handle().map(ToString::to_string),
            message,
            error,
        }
    }
}

/// Whether the form has something to submit.
///
/// This only gates the button; full validation happens on submit.
pub fn can_submit(amount: &str, description: &str) -> bool {
    !amount.trim().is_empty() && !description.trim().is_empty()
}

/// Format a block timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("@{timestamp}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{AccountAggregate, Amount, TxFailure, TxHandle};

    fn snapshot() -> ReadSnapshot {
        ReadSnapshot::new(
            AccountAggregate::new(2, Amount::from(30)),
            vec![
                ExpenseEntry::new(Amount::from(10), "bus", 1_700_000_000),
                ExpenseEntry::new(Amount::from(20), "book", 1_700_000_060),
            ],
        )
    }

    #[test]
    fn test_rows() {
        let view = DashboardView::build(true, &snapshot(), &TransactionLifecycle::idle(), false);
        assert_eq!(view.total_expenses, "30");
        assert_eq!(view.entry_count, 2);
        assert_eq!(view.rows[1].key, "1700000060-1");
        assert_eq!(view.rows[0].recorded_at, "2023-11-14 22:13:20 UTC");
        assert_eq!(view.placeholder(), None);
    }

    #[test]
    fn test_placeholders() {
        let empty = ReadSnapshot::empty();
        let idle = TransactionLifecycle::idle();
        assert_eq!(
            DashboardView::build(false, &empty, &idle, false).placeholder(),
            Some(CONNECT_PROMPT)
        );
        assert_eq!(
            DashboardView::build(true, &empty, &idle, false).placeholder(),
            Some(EMPTY_LIST_MESSAGE)
        );
    }

    #[test]
    fn test_status_progression() {
        let idle = TransactionLifecycle::idle();
        let status = StatusView::from_lifecycle(&idle, false);
        assert!(!status.busy);
        assert_eq!(status.submit_label, SUBMIT_LABEL);

        let submitting = idle.begin_attempt().unwrap();
        let status = StatusView::from_lifecycle(&submitting, false);
        assert!(status.busy);
        assert_eq!(status.submit_label, SAVING_LABEL);
        assert_eq!(status.tx_hash, None);

        let handle = TxHandle::from_bytes([1; 32]);
        let awaiting = submitting.with_handle(handle).unwrap();
        let status = StatusView::from_lifecycle(&awaiting, false);
        assert_eq!(status.message.as_deref(), Some(AWAITING_MESSAGE));
        assert_eq!(status.tx_hash, Some(handle.to_string()));

        let confirmed = awaiting.confirmed().unwrap();
        let status = StatusView::from_lifecycle(&confirmed, false);
        assert!(!status.busy);
        assert_eq!(status.message.as_deref(), Some(CONFIRMED_MESSAGE));
    }

    #[test]
    fn test_dismissed_error_hidden() {
        let failed = TransactionLifecycle::idle()
            .begin_attempt()
            .unwrap()
            .failed(TxFailure::revert(Some("out of gas".into())))
            .unwrap();
        assert_eq!(
            StatusView::from_lifecycle(&failed, false).error.as_deref(),
            Some("out of gas")
        );
        assert_eq!(StatusView::from_lifecycle(&failed, true).error, None);
    }

    #[test]
    fn test_can_submit() {
        assert!(can_submit("5", "tea"));
        assert!(!can_submit("", "tea"));
        assert!(!can_submit("5", "  "));
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert_eq!(format_timestamp(u64::MAX), format!("@{}", u64::MAX));
    }
}
