//! Read-side state cache
//!
//! Every refresh is stamped with a generation token taken from a monotonic
//! counter. When a refresh finishes it may publish only if its token is still
//! the latest one issued; otherwise its result is dropped. The comparison and
//! the publish happen under the same lock, so a superseded refresh can never
//! overwrite a newer snapshot.
//!
//! Entries are read with bounded concurrency and reassembled in index order
//! before the snapshot is built. A failure anywhere in the cycle leaves the
//! previous snapshot in place.

use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tally_core::{
    Account, AccountAggregate, Dynamic, LedgerClient, ReadSnapshot, Result, Subscription,
    TallyError,
};
use tracing::{debug, warn};

use crate::observer::{SyncEvent, SyncObserver};

/// What happened to a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The refresh was the latest issued; its snapshot is now visible
    Published(Arc<ReadSnapshot>),
    /// A newer refresh was issued while this one ran
    Discarded,
    /// The read cycle failed; the previous snapshot is unchanged
    Failed(TallyError),
}

impl RefreshOutcome {
    /// Whether the snapshot was published
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Holds the latest consistent snapshot.
pub struct ReadStateCache {
    snapshot: Dynamic<Arc<ReadSnapshot>>,
    generation: Mutex<u64>,
    concurrency: usize,
    observer: Arc<dyn SyncObserver>,
}

impl ReadStateCache {
    /// Create a cache holding the empty snapshot.
    ///
    /// `concurrency` bounds the number of entry reads in flight; zero is
    /// treated as one.
    pub fn new(concurrency: usize, observer: Arc<dyn SyncObserver>) -> Self {
        Self {
            snapshot: Dynamic::new(Arc::new(ReadSnapshot::empty())),
            generation: Mutex::new(0),
            concurrency: concurrency.max(1),
            observer,
        }
    }

    /// The latest published snapshot
    pub fn current(&self) -> Arc<ReadSnapshot> {
        self.snapshot.get()
    }

    /// Poll subscription to published snapshots
    pub fn subscribe(&self) -> Subscription<Arc<ReadSnapshot>> {
        self.snapshot.subscribe()
    }

    /// Latest generation token issued
    pub fn latest_generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Run one read cycle for `account`.
    ///
    /// With no account the empty snapshot is published without touching the
    /// ledger.
    pub async fn refresh(
        &self,
        client: &dyn LedgerClient,
        account: Option<&Account>,
    ) -> RefreshOutcome {
        let generation = self.issue_generation();
        self.refresh_issued(generation, client, account).await
    }

    /// Issue the next generation token.
    ///
    /// Callers that must order a refresh against another state change (an
    /// account switch, say) issue the token while holding that state's lock
    /// and then run [`Self::refresh_issued`].
    pub fn issue_generation(&self) -> u64 {
        let mut latest = self.generation.lock();
        *latest += 1;
        *latest
    }

    /// Run a read cycle under a token from [`Self::issue_generation`].
    pub async fn refresh_issued(
        &self,
        generation: u64,
        client: &dyn LedgerClient,
        account: Option<&Account>,
    ) -> RefreshOutcome {
        debug!(generation, account = ?account.map(ToString::to_string), "refresh issued");

        let result = match account {
            Some(account) => read_snapshot(client, account, self.concurrency).await,
            None => Ok(ReadSnapshot::empty()),
        };

        match result {
            Ok(snapshot) => self.publish(generation, snapshot),
            Err(error) => {
                warn!(generation, %error, "refresh failed");
                self.observer
                    .on_sync_event(&SyncEvent::RefreshFailed { generation, error: error.clone() });
                RefreshOutcome::Failed(error)
            }
        }
    }

    fn publish(&self, generation: u64, snapshot: ReadSnapshot) -> RefreshOutcome {
        let snapshot = Arc::new(snapshot);
        {
            let latest = self.generation.lock();
            if *latest != generation {
                debug!(generation, latest = *latest, "discarding stale refresh");
                drop(latest);
                self.observer
                    .on_sync_event(&SyncEvent::RefreshDiscarded { generation });
                return RefreshOutcome::Discarded;
            }
            self.snapshot.set(Arc::clone(&snapshot));
        }
        self.observer.on_sync_event(&SyncEvent::SnapshotPublished {
            generation,
            snapshot: Arc::clone(&snapshot),
        });
        RefreshOutcome::Published(snapshot)
    }
}

/// Read the aggregate and all entries for one account.
///
/// An account the ledger has never seen reads as the empty aggregate.
pub async fn read_snapshot(
    client: &dyn LedgerClient,
    account: &Account,
    concurrency: usize,
) -> Result<ReadSnapshot> {
    let aggregate = match client.read_aggregate(account).await {
        Ok(aggregate) => aggregate,
        Err(error) if error.is_read() => {
            debug!(%account, %error, "aggregate unavailable; treating account as new");
            AccountAggregate::EMPTY
        }
        Err(error) => return Err(error),
    };

    let count = aggregate.entry_count;
    if count == 0 {
        return Ok(ReadSnapshot::new(aggregate, Vec::new()));
    }

    let entries = match client.read_entries(account, count).await {
        Some(batch) => {
            let entries = batch?;
            if entries.len() as u64 != count {
                return Err(TallyError::read(format!(
                    "batch read returned {} entries, expected {count}",
                    entries.len()
                )));
            }
            entries
        }
        None => {
            stream::iter(0..count)
                .map(|index| client.read_entry(account, index))
                .buffered(concurrency.max(1))
                .try_collect::<Vec<_>>()
                .await?
        }
    };

    Ok(ReadSnapshot::new(aggregate, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoOpObserver;
    use std::time::Duration;
    use tally_core::Amount;
    use tally_testkit::{fixtures, MockLedger};

    fn cache() -> ReadStateCache {
        ReadStateCache::new(4, Arc::new(NoOpObserver))
    }

    #[tokio::test]
    async fn test_no_account_publishes_empty() {
        let ledger = MockLedger::new();
        let cache = cache();
        let outcome = cache.refresh(&ledger, None).await;
        assert!(outcome.is_published());
        assert!(cache.current().is_empty());
        assert_eq!(ledger.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_new_account_reads_empty() {
        let ledger = MockLedger::new();
        let cache = cache();
        let outcome = cache.refresh(&ledger, Some(&fixtures::alice())).await;
        assert!(outcome.is_published());
        let snapshot = cache.current();
        assert_eq!(snapshot.entry_count(), 0);
        assert_eq!(snapshot.total_amount(), Amount::ZERO);
        assert_eq!(ledger.calls().entry_reads, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_keep_index_order() {
        let ledger = MockLedger::new();
        ledger.seed_entries(fixtures::alice(), fixtures::abc_entries());
        ledger.set_entry_delay(0, Duration::from_millis(30));
        ledger.set_entry_delay(1, Duration::from_millis(20));
        ledger.set_entry_delay(2, Duration::from_millis(10));

        let snapshot = read_snapshot(&ledger, &fixtures::alice(), 3).await.unwrap();
        assert_eq!(snapshot.entries(), fixtures::abc_entries().as_slice());
        assert_eq!(snapshot.total_amount(), Amount::from(1289));
    }

    #[tokio::test]
    async fn test_entry_failure_keeps_previous_snapshot() {
        let ledger = MockLedger::new();
        ledger.seed_entries(fixtures::alice(), fixtures::abc_entries());
        let cache = cache();
        assert!(cache.refresh(&ledger, Some(&fixtures::alice())).await.is_published());
        let before = cache.current();

        ledger.fail_entry(1);
        let outcome = cache.refresh(&ledger, Some(&fixtures::alice())).await;
        assert!(matches!(outcome, RefreshOutcome::Failed(TallyError::Read { .. })));
        assert_eq!(cache.current(), before);
    }

    #[tokio::test]
    async fn test_batch_read_preferred() {
        let ledger = MockLedger::new();
        ledger.seed_entries(fixtures::alice(), fixtures::abc_entries());
        ledger.set_batch_reads(true);

        let snapshot = read_snapshot(&ledger, &fixtures::alice(), 2).await.unwrap();
        assert_eq!(snapshot.entries().len(), 3);
        let calls = ledger.calls();
        assert_eq!(calls.batch_reads, 1);
        assert_eq!(calls.entry_reads, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_refresh_is_discarded() {
        let ledger = MockLedger::new();
        ledger.seed_entries(fixtures::alice(), fixtures::abc_entries());
        ledger.seed_entries(fixtures::bob(), vec![fixtures::entry(7, "tea", 1)]);
        ledger.push_aggregate_delay(Duration::from_millis(100));
        let cache = cache();

        let alice = fixtures::alice();
        let slow = cache.refresh(&ledger, Some(&alice));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.refresh(&ledger, Some(&fixtures::bob())).await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow, RefreshOutcome::Discarded);
        assert!(fast.is_published());
        assert_eq!(cache.current().entries()[0].description, "tea");
        assert_eq!(cache.latest_generation(), 2);
    }
}
