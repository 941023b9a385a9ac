//! Scripted in-memory ledger
//!
//! `MockLedger` implements [`LedgerClient`] over a map of per-account entry
//! lists. Every knob a test needs to provoke a race or a failure is exposed:
//!
//! - per-call delays for aggregate reads (consumed in FIFO order)
//! - per-index delays and injected failures for entry reads
//! - optional batch-read capability
//! - submission delay and one-shot submission rejection
//! - confirmation scripts for the next submission
//! - call counters
//!
//! Reads compute their result when the call starts and only then sleep, so a
//! delayed read returns the ledger state as of issuance. A confirmed write is
//! appended to the ledger when its `Success` event is yielded.
//!
//! Delays use `tokio::time`, so tests can run with a paused clock.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tally_core::{
    Account, AccountAggregate, Amount, ConfirmationEvent, ConfirmationStream, ExpenseEntry,
    LedgerClient, Result, TallyError, TxHandle,
};

use crate::fixtures::GENESIS_TIMESTAMP;

/// Number of calls the mock has served, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `read_aggregate` calls
    pub aggregate_reads: usize,
    /// `read_entry` calls
    pub entry_reads: usize,
    /// `read_entries` calls answered in batch mode
    pub batch_reads: usize,
    /// `submit_write` calls, including rejected ones
    pub submissions: usize,
    /// `observe_confirmation` calls
    pub observations: usize,
}

impl CallCounts {
    /// Total number of ledger calls of any kind
    pub fn total(&self) -> usize {
        self.aggregate_reads
            + self.entry_reads
            + self.batch_reads
            + self.submissions
            + self.observations
    }
}

#[derive(Debug, Clone)]
struct PendingWrite {
    from: Account,
    amount: Amount,
    description: String,
    script: Vec<ConfirmationEvent>,
}

#[derive(Debug)]
struct MockState {
    ledger: HashMap<Account, Vec<ExpenseEntry>>,
    aggregate_delays: VecDeque<Duration>,
    entry_delays: HashMap<u64, Duration>,
    failing_entries: HashSet<u64>,
    batch_reads: bool,
    rejection: Option<String>,
    submission_delay: Duration,
    next_script: Option<Vec<ConfirmationEvent>>,
    confirmation_step: Duration,
    pending: HashMap<TxHandle, PendingWrite>,
    tx_counter: u64,
    clock: u64,
    calls: CallCounts,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            ledger: HashMap::new(),
            aggregate_delays: VecDeque::new(),
            entry_delays: HashMap::new(),
            failing_entries: HashSet::new(),
            batch_reads: false,
            rejection: None,
            submission_delay: Duration::ZERO,
            next_script: None,
            confirmation_step: Duration::from_millis(10),
            pending: HashMap::new(),
            tx_counter: 0,
            clock: GENESIS_TIMESTAMP,
            calls: CallCounts::default(),
        }
    }
}

impl MockState {
    fn append(&mut self, write: &PendingWrite) {
        self.clock += 12;
        let entry = ExpenseEntry::new(write.amount, write.description.clone(), self.clock);
        self.ledger.entry(write.from).or_default().push(entry);
    }
}

/// In-memory [`LedgerClient`] with scripted behavior.
///
/// Clones share state, so a test can keep a handle for scripting while the
/// controller owns another.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
}

impl MockLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Append entries for an account as if they had been confirmed earlier
    pub fn seed_entries(&self, account: Account, entries: Vec<ExpenseEntry>) {
        self.state
            .lock()
            .ledger
            .entry(account)
            .or_default()
            .extend(entries);
    }

    /// Entries currently stored for an account
    pub fn entries_of(&self, account: &Account) -> Vec<ExpenseEntry> {
        self.state
            .lock()
            .ledger
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    /// Queue a delay for the next `read_aggregate` call
    pub fn push_aggregate_delay(&self, delay: Duration) {
        self.state.lock().aggregate_delays.push_back(delay);
    }

    /// Delay every `read_entry` call for `index`
    pub fn set_entry_delay(&self, index: u64, delay: Duration) {
        self.state.lock().entry_delays.insert(index, delay);
    }

    /// Make every `read_entry` call for `index` fail
    pub fn fail_entry(&self, index: u64) {
        self.state.lock().failing_entries.insert(index);
    }

    /// Remove all injected entry failures
    pub fn clear_entry_failures(&self) {
        self.state.lock().failing_entries.clear();
    }

    /// Enable or disable the batch-read capability
    pub fn set_batch_reads(&self, enabled: bool) {
        self.state.lock().batch_reads = enabled;
    }

    /// Delay every `submit_write` before it reports back
    pub fn set_submission_delay(&self, delay: Duration) {
        self.state.lock().submission_delay = delay;
    }

    /// Make the next `submit_write` fail with the given wallet message
    pub fn reject_next_submission(&self, message: impl Into<String>) {
        self.state.lock().rejection = Some(message.into());
    }

    /// Confirmation events for the next submitted write.
    ///
    /// Without a script, writes confirm as `[Pending, Success]`.
    pub fn script_next_confirmation(&self, events: Vec<ConfirmationEvent>) {
        self.state.lock().next_script = Some(events);
    }

    /// Delay between consecutive confirmation events
    pub fn set_confirmation_step(&self, step: Duration) {
        self.state.lock().confirmation_step = step;
    }

    /// Snapshot of call counters
    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    fn entry_read(&self, account: &Account, index: u64) -> (Result<ExpenseEntry>, Duration) {
        let mut state = self.state.lock();
        state.calls.entry_reads += 1;
        let delay = state.entry_delays.get(&index).copied().unwrap_or_default();
        if state.failing_entries.contains(&index) {
            return (
                Err(TallyError::read(format!("injected failure at index {index}"))),
                delay,
            );
        }
        let result = state
            .ledger
            .get(account)
            .and_then(|entries| usize::try_from(index).ok().and_then(|i| entries.get(i)))
            .cloned()
            .ok_or_else(|| TallyError::read(format!("index {index} out of range for {account}")));
        (result, delay)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn read_aggregate(&self, account: &Account) -> Result<AccountAggregate> {
        let (result, delay) = {
            let mut state = self.state.lock();
            state.calls.aggregate_reads += 1;
            let delay = state.aggregate_delays.pop_front().unwrap_or_default();
            let result = match state.ledger.get(account) {
                Some(entries) if !entries.is_empty() => {
                    let total = entries
                        .iter()
                        .fold(Amount::ZERO, |acc, e| acc.checked_add(e.amount).unwrap());
                    Ok(AccountAggregate::new(entries.len() as u64, total))
                }
                _ => Err(TallyError::read(format!("{account} has no expenses"))),
            };
            (result, delay)
        };
        pause(delay).await;
        result
    }

    async fn read_entry(&self, account: &Account, index: u64) -> Result<ExpenseEntry> {
        let (result, delay) = self.entry_read(account, index);
        pause(delay).await;
        result
    }

    async fn read_entries(
        &self,
        account: &Account,
        count: u64,
    ) -> Option<Result<Vec<ExpenseEntry>>> {
        let mut state = self.state.lock();
        if !state.batch_reads {
            return None;
        }
        state.calls.batch_reads += 1;
        let entries = state.ledger.get(account).cloned().unwrap_or_default();
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        if count > entries.len() {
            return Some(Err(TallyError::read(format!(
                "batch of {count} exceeds {} entries",
                entries.len()
            ))));
        }
        Some(Ok(entries[..count].to_vec()))
    }

    async fn submit_write(
        &self,
        from: &Account,
        amount: Amount,
        description: &str,
    ) -> Result<TxHandle> {
        let (result, delay) = {
            let mut state = self.state.lock();
            state.calls.submissions += 1;
            let delay = state.submission_delay;
            if let Some(message) = state.rejection.take() {
                (Err(TallyError::submission(message)), delay)
            } else {
                state.tx_counter += 1;
                let mut bytes = [0u8; 32];
                bytes[24..].copy_from_slice(&state.tx_counter.to_be_bytes());
                let handle = TxHandle::from_bytes(bytes);
                let script = state
                    .next_script
                    .take()
                    .unwrap_or_else(|| vec![ConfirmationEvent::Pending, ConfirmationEvent::Success]);
                state.pending.insert(
                    handle,
                    PendingWrite {
                        from: *from,
                        amount,
                        description: description.to_string(),
                        script,
                    },
                );
                tracing::debug!(%handle, %from, "mock ledger accepted write");
                (Ok(handle), delay)
            }
        };
        pause(delay).await;
        result
    }

    async fn observe_confirmation(&self, handle: &TxHandle) -> Result<ConfirmationStream> {
        let (write, step) = {
            let mut state = self.state.lock();
            state.calls.observations += 1;
            let write = state
                .pending
                .remove(handle)
                .ok_or_else(|| TallyError::read(format!("unknown transaction {handle}")))?;
            (write, state.confirmation_step)
        };
        let shared = Arc::clone(&self.state);
        let events = write.script.clone().into_iter();
        let stream = stream::unfold(events, move |mut events| {
            let shared = Arc::clone(&shared);
            let write = write.clone();
            async move {
                pause(step).await;
                let event = events.next()?;
                if event == ConfirmationEvent::Success {
                    shared.lock().append(&write);
                }
                Some((event, events))
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{abc_entries, alice, bob, entry};

    #[tokio::test]
    async fn test_unknown_account_read_fails() {
        let ledger = MockLedger::new();
        let err = ledger.read_aggregate(&alice()).await.unwrap_err();
        assert!(err.is_read());
    }

    #[tokio::test]
    async fn test_aggregate_sums_entries() {
        let ledger = MockLedger::new();
        ledger.seed_entries(alice(), abc_entries());
        let aggregate = ledger.read_aggregate(&alice()).await.unwrap();
        assert_eq!(aggregate.entry_count, 3);
        assert_eq!(aggregate.total_amount, Amount::from(1289));
    }

    #[tokio::test]
    async fn test_batch_reads_disabled_by_default() {
        let ledger = MockLedger::new();
        ledger.seed_entries(alice(), abc_entries());
        assert!(ledger.read_entries(&alice(), 3).await.is_none());

        ledger.set_batch_reads(true);
        let entries = ledger.read_entries(&alice(), 2).await.unwrap().unwrap();
        assert_eq!(entries, abc_entries()[..2].to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_appends_entry() {
        let ledger = MockLedger::new();
        let handle = ledger
            .submit_write(&bob(), Amount::from(9), "lunch")
            .await
            .unwrap();
        let events: Vec<_> = ledger
            .observe_confirmation(&handle)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            events,
            vec![ConfirmationEvent::Pending, ConfirmationEvent::Success]
        );
        let stored = ledger.entries_of(&bob());
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].description, "lunch");
    }

    #[tokio::test]
    async fn test_rejection_is_one_shot() {
        let ledger = MockLedger::new();
        ledger.reject_next_submission("user rejected the request");
        let err = ledger
            .submit_write(&alice(), Amount::from(1), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Submission { .. }));
        assert!(ledger
            .submit_write(&alice(), Amount::from(1), "x")
            .await
            .is_ok());
        assert_eq!(ledger.calls().submissions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_delay() {
        let ledger = MockLedger::new();
        ledger.set_submission_delay(Duration::from_millis(200));
        let started = tokio::time::Instant::now();
        ledger
            .submit_write(&alice(), Amount::from(1), "x")
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(ledger.calls().submissions, 1);
    }

    #[tokio::test]
    async fn test_entry_failure_injection() {
        let ledger = MockLedger::new();
        ledger.seed_entries(alice(), vec![entry(1, "a", 1)]);
        ledger.fail_entry(0);
        assert!(ledger.read_entry(&alice(), 0).await.is_err());
        ledger.clear_entry_failures();
        assert!(ledger.read_entry(&alice(), 0).await.is_ok());
    }
}
