//! Synchronization controller
//!
//! `SyncController` is the single entry point a front end talks to. It owns
//! the active account, the read-state cache, and the write tracker, and it
//! decides when a refresh runs. Refreshes have exactly three triggers:
//!
//! - the active account changed ([`SyncController::on_wallet_changed`])
//! - a write from the active account was confirmed
//! - the caller asked for one ([`SyncController::refresh`])
//!
//! Writes are confirmed on a spawned task so `create_expense` returns as soon
//! as the wallet hands back a transaction handle.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tally_core::{
    Account, LedgerClient, ReadSnapshot, Result, Subscription, TallyError, TransactionLifecycle,
    TxHandle, TxPhase,
};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::cache::{ReadStateCache, RefreshOutcome};
use crate::config::SyncConfig;
use crate::observer::{NoOpObserver, SyncObserver};
use crate::tracker::TransactionTracker;
use crate::validation::ExpenseInput;
use crate::views::DashboardView;
use crate::wallet::WalletStatus;

/// Handle to the synchronization core.
///
/// Clones share state.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    client: Arc<dyn LedgerClient>,
    config: SyncConfig,
    account: RwLock<Option<Account>>,
    cache: ReadStateCache,
    tracker: TransactionTracker,
    watcher: Mutex<Option<JoinHandle<()>>>,
    watcher_abort: Mutex<Option<(u64, AbortHandle)>>,
    dismissed_attempt: AtomicU64,
}

impl SyncController {
    /// Create a controller with no observer.
    pub fn new(client: Arc<dyn LedgerClient>, config: SyncConfig) -> Self {
        Self::with_observer(client, config, Arc::new(NoOpObserver))
    }

    /// Create a controller that reports every state change to `observer`.
    pub fn with_observer(
        client: Arc<dyn LedgerClient>,
        config: SyncConfig,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        let cache = ReadStateCache::new(config.effective_read_concurrency(), Arc::clone(&observer));
        let tracker = TransactionTracker::new(observer);
        Self {
            inner: Arc::new(ControllerInner {
                client,
                config,
                account: RwLock::new(None),
                cache,
                tracker,
                watcher: Mutex::new(None),
                watcher_abort: Mutex::new(None),
                dismissed_attempt: AtomicU64::new(0),
            }),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Account reads and writes currently target
    pub fn active_account(&self) -> Option<Account> {
        *self.inner.account.read()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<ReadSnapshot> {
        self.inner.cache.current()
    }

    /// Current write lifecycle
    pub fn lifecycle(&self) -> TransactionLifecycle {
        self.inner.tracker.current()
    }

    /// Poll subscription to published snapshots
    pub fn subscribe_snapshot(&self) -> Subscription<Arc<ReadSnapshot>> {
        self.inner.cache.subscribe()
    }

    /// Poll subscription to lifecycle changes
    pub fn subscribe_lifecycle(&self) -> Subscription<TransactionLifecycle> {
        self.inner.tracker.subscribe()
    }

    // =========================================================================
    // Refresh triggers
    // =========================================================================

    /// Apply a wallet update.
    ///
    /// Refreshes only when the active account actually changed; returns
    /// `None` otherwise. Disconnecting publishes the empty snapshot.
    pub async fn on_wallet_changed(&self, status: WalletStatus) -> Option<RefreshOutcome> {
        let next = status.active_account();
        let generation = {
            let mut account = self.inner.account.write();
            if *account == next {
                debug!(account = ?next, "wallet update without account change");
                return None;
            }
            info!(from = ?*account, to = ?next, "active account changed");
            *account = next;
            self.inner.cache.issue_generation()
        };
        Some(self.inner.run_refresh(generation, next).await)
    }

    /// Refresh the active account on demand.
    pub async fn refresh(&self) -> RefreshOutcome {
        let (generation, account) = {
            let account = self.inner.account.read();
            (self.inner.cache.issue_generation(), *account)
        };
        self.inner.run_refresh(generation, account).await
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Submit a new expense for the active account.
    ///
    /// Input is validated before anything else; a rejected input leaves all
    /// state untouched and makes no ledger call. On success the write is
    /// awaiting confirmation when this returns. Use [`Self::settled`] to wait
    /// for the outcome.
    pub async fn create_expense(&self, amount: &str, description: &str) -> Result<()> {
        let input = ExpenseInput::parse(amount, description)?;
        let account = self.active_account().ok_or(TallyError::NotConnected)?;
        let attempt = self.inner.tracker.begin()?.attempt();
        info!(
            attempt,
            %account,
            amount = %input.amount(),
            "submitting expense"
        );

        let handle = match self
            .inner
            .client
            .submit_write(&account, input.amount(), input.description())
            .await
        {
            Ok(handle) => handle,
            Err(error) => {
                let reason = match &error {
                    TallyError::Submission { message } => message.clone(),
                    other => other.to_string(),
                };
                warn!(attempt, %reason, "submission failed");
                self.inner.tracker.submission_failed(attempt, reason.clone())?;
                return Err(match error {
                    TallyError::Submission { .. } => error,
                    _ => TallyError::submission(reason),
                });
            }
        };

        self.inner.tracker.submitted(attempt, handle)?;
        let task = tokio::spawn(
            Arc::clone(&self.inner).watch_confirmation(attempt, handle, account),
        );
        *self.inner.watcher_abort.lock() = Some((attempt, task.abort_handle()));
        // A previous watcher, if any, is past its terminal transition and can
        // no longer touch the lifecycle.
        *self.inner.watcher.lock() = Some(task);
        Ok(())
    }

    /// Wait for the current confirmation task, if any, and return the
    /// resulting lifecycle.
    pub async fn settled(&self) -> TransactionLifecycle {
        let task = self.inner.watcher.lock().take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                if !error.is_cancelled() {
                    warn!(%error, "confirmation task panicked");
                }
            }
        }
        self.lifecycle()
    }

    /// Stop observing the write that is awaiting confirmation.
    ///
    /// The write itself may still land on the ledger; locally it is recorded
    /// as failed and no refresh follows. Returns `None` if no attempt holds a
    /// handle without an outcome. A write still in `Submitting` cannot be
    /// abandoned.
    pub fn abandon_confirmation(&self) -> Option<TransactionLifecycle> {
        let abandoned = self.inner.tracker.abandon()?;
        let watcher = self.inner.watcher_abort.lock().take();
        if let Some((attempt, abort)) = watcher {
            if attempt == abandoned.attempt() {
                abort.abort();
            }
        }
        warn!(attempt = abandoned.attempt(), "confirmation observation abandoned");
        Some(abandoned)
    }

    // =========================================================================
    // Presentation
    // =========================================================================

    /// Render the dashboard from the current snapshot and lifecycle.
    pub fn view(&self) -> DashboardView {
        let lifecycle = self.lifecycle();
        let dismissed = lifecycle.phase() == TxPhase::Failed
            && self.inner.dismissed_attempt.load(Ordering::Acquire) == lifecycle.attempt();
        DashboardView::build(
            self.active_account().is_some(),
            &self.snapshot(),
            &lifecycle,
            dismissed,
        )
    }

    /// Hide the current failure in [`Self::view`].
    ///
    /// The lifecycle keeps its failure; the next attempt shows errors again.
    pub fn dismiss_failure(&self) {
        let lifecycle = self.lifecycle();
        if lifecycle.phase() == TxPhase::Failed {
            self.inner
                .dismissed_attempt
                .store(lifecycle.attempt(), Ordering::Release);
        }
    }
}

impl ControllerInner {
    async fn run_refresh(&self, generation: u64, account: Option<Account>) -> RefreshOutcome {
        self.cache
            .refresh_issued(generation, self.client.as_ref(), account.as_ref())
            .await
    }

    async fn watch_confirmation(
        self: Arc<Self>,
        attempt: u64,
        handle: TxHandle,
        account: Account,
    ) {
        let outcome = match self.client.observe_confirmation(&handle).await {
            Ok(events) => self.tracker.track(attempt, events).await,
            Err(error) => self.tracker.observation_failed(attempt, error.to_string()),
        };

        let lifecycle = match outcome {
            Ok(lifecycle) => lifecycle,
            Err(error) => {
                warn!(attempt, %handle, %error, "confirmation tracking stopped");
                return;
            }
        };

        match lifecycle.phase() {
            TxPhase::Confirmed => {
                let generation = {
                    let active = self.account.read();
                    if *active != Some(account) {
                        debug!(%handle, %account, "sender no longer active; skipping refresh");
                        return;
                    }
                    self.cache.issue_generation()
                };
                self.run_refresh(generation, Some(account)).await;
            }
            _ => {
                if let Some(failure) = lifecycle.failure() {
                    let error = failure.to_error();
                    warn!(attempt, %handle, %error, "write failed");
                }
            }
        }
    }
}
