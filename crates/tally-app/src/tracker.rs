//! Write lifecycle tracking
//!
//! `TransactionTracker` owns the observable [`TransactionLifecycle`] and is
//! the only code that advances it. Each transition is validated against the
//! phase graph, logged, and forwarded to the controller's observer.

use futures::StreamExt;
use std::sync::Arc;
use tally_core::{
    ConfirmationEvent, ConfirmationStream, Dynamic, FailureKind, Result, Subscription,
    TallyError, TransactionLifecycle, TxFailure, TxHandle, TxPhase,
};
use tracing::{debug, info, warn};

use crate::observer::{SyncEvent, SyncObserver};

/// Reason recorded when the confirmation stream ends without a final event
pub const STREAM_ENDED_REASON: &str = "confirmation stream ended without a result";

/// Reason recorded when observation is abandoned before a final event
pub const ABANDONED_REASON: &str = "confirmation observation abandoned";

/// Tracks the most recent write attempt.
pub struct TransactionTracker {
    lifecycle: Dynamic<TransactionLifecycle>,
    observer: Arc<dyn SyncObserver>,
}

impl TransactionTracker {
    /// Create a tracker in [`TxPhase::Idle`](tally_core::TxPhase::Idle)
    pub fn new(observer: Arc<dyn SyncObserver>) -> Self {
        Self {
            lifecycle: Dynamic::new(TransactionLifecycle::idle()),
            observer,
        }
    }

    /// Current lifecycle
    pub fn current(&self) -> TransactionLifecycle {
        self.lifecycle.get()
    }

    /// Poll subscription to lifecycle changes
    pub fn subscribe(&self) -> Subscription<TransactionLifecycle> {
        self.lifecycle.subscribe()
    }

    /// Start a new attempt.
    ///
    /// Fails with `ConcurrentWrite` if an attempt is already in flight. The
    /// check and the transition happen under one lock, so two concurrent
    /// callers can never both succeed. Later transitions for this attempt
    /// take the returned lifecycle's [`attempt`](TransactionLifecycle::attempt).
    pub fn begin(&self) -> Result<TransactionLifecycle> {
        self.apply(|current| current.begin_attempt())
    }

    /// The wallet produced a handle for `attempt`.
    pub fn submitted(&self, attempt: u64, handle: TxHandle) -> Result<TransactionLifecycle> {
        self.apply_for(attempt, |current| current.with_handle(handle))
    }

    /// The wallet refused or failed to relay `attempt`.
    pub fn submission_failed(
        &self,
        attempt: u64,
        reason: impl Into<String>,
    ) -> Result<TransactionLifecycle> {
        let failure = TxFailure::new(FailureKind::Submission, reason);
        self.apply_for(attempt, |current| current.failed(failure))
    }

    /// Follow the confirmation stream of `attempt` to its final outcome.
    ///
    /// `Pending` events are informational. The first terminal event decides
    /// the outcome; a stream that ends before one is a failed observation.
    /// Once a newer attempt has started, the stream is dropped and the
    /// lifecycle is left alone.
    pub async fn track(
        &self,
        attempt: u64,
        mut events: ConfirmationStream,
    ) -> Result<TransactionLifecycle> {
        while let Some(event) = events.next().await {
            match event {
                ConfirmationEvent::Pending => {
                    let current = self.current();
                    if current.attempt() != attempt || !current.phase().is_in_flight() {
                        let error = superseded(attempt, &current);
                        warn!(attempt, %error, "dropping confirmation stream");
                        return Err(error);
                    }
                    debug!(attempt, "write still pending");
                }
                ConfirmationEvent::Success => {
                    return self.apply_for(attempt, |current| current.confirmed());
                }
                ConfirmationEvent::Reverted { reason } => {
                    let failure = TxFailure::revert(reason);
                    return self.apply_for(attempt, |current| current.failed(failure));
                }
            }
        }
        self.observation_failed(attempt, STREAM_ENDED_REASON)
    }

    /// Confirmation of `attempt` could not be observed to a final outcome.
    pub fn observation_failed(
        &self,
        attempt: u64,
        reason: impl Into<String>,
    ) -> Result<TransactionLifecycle> {
        let failure = TxFailure::new(FailureKind::Observation, reason);
        self.apply_for(attempt, |current| current.failed(failure))
    }

    /// Stop waiting on the attempt that is awaiting confirmation.
    ///
    /// Returns `None` unless the current attempt holds a handle and has no
    /// outcome yet. An attempt still in `Submitting` cannot be abandoned: its
    /// wallet call is outstanding and will report back.
    pub fn abandon(&self) -> Option<TransactionLifecycle> {
        let failure = TxFailure::new(FailureKind::Observation, ABANDONED_REASON);
        self.apply(|current| {
            if current.phase() != TxPhase::AwaitingConfirmation {
                return Err(TallyError::internal(format!(
                    "nothing to abandon in phase {}",
                    current.phase()
                )));
            }
            current.failed(failure)
        })
        .ok()
    }

    /// Apply a transition only if `attempt` is still the current attempt.
    ///
    /// The attempt check and the transition run under the same lock.
    /// Rejected updates are logged and leave the lifecycle unchanged.
    fn apply_for<F>(&self, attempt: u64, transition: F) -> Result<TransactionLifecycle>
    where
        F: FnOnce(&TransactionLifecycle) -> Result<TransactionLifecycle>,
    {
        self.apply(|current| {
            if current.attempt() != attempt {
                return Err(superseded(attempt, current));
            }
            transition(current)
        })
        .map_err(|error| {
            warn!(attempt, %error, "lifecycle update dropped");
            error
        })
    }

    fn apply<F>(&self, transition: F) -> Result<TransactionLifecycle>
    where
        F: FnOnce(&TransactionLifecycle) -> Result<TransactionLifecycle>,
    {
        let next = self.lifecycle.try_update(transition)?;
        info!(
            attempt = next.attempt(),
            phase = %next.phase(),
            "write lifecycle advanced"
        );
        self.observer
            .on_sync_event(&SyncEvent::LifecycleChanged(next.clone()));
        Ok(next)
    }
}

fn superseded(attempt: u64, current: &TransactionLifecycle) -> TallyError {
    TallyError::internal(format!(
        "attempt {attempt} superseded (current attempt {}, phase {})",
        current.attempt(),
        current.phase()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{FnObserver, NoOpObserver};
    use futures::stream;
    use parking_lot::Mutex;

    fn handle() -> TxHandle {
        TxHandle::from_bytes([7; 32])
    }

    fn recording() -> (Arc<Mutex<Vec<TxPhase>>>, Arc<dyn SyncObserver>) {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);
        let observer = FnObserver::new(move |event| {
            if let SyncEvent::LifecycleChanged(lifecycle) = event {
                sink.lock().push(lifecycle.phase());
            }
        });
        (phases, Arc::new(observer))
    }

    #[tokio::test]
    async fn test_success_path() {
        let (phases, observer) = recording();
        let tracker = TransactionTracker::new(observer);
        tracker.begin().unwrap();
        tracker.submitted(1, handle()).unwrap();
        let events = stream::iter(vec![ConfirmationEvent::Pending, ConfirmationEvent::Success]);
        let final_state = tracker.track(1, events.boxed()).await.unwrap();

        assert_eq!(final_state.phase(), TxPhase::Confirmed);
        assert_eq!(final_state.handle(), Some(&handle()));
        assert_eq!(
            *phases.lock(),
            vec![
                TxPhase::Submitting,
                TxPhase::AwaitingConfirmation,
                TxPhase::Confirmed
            ]
        );
    }

    #[tokio::test]
    async fn test_revert_without_reason() {
        let tracker = TransactionTracker::new(Arc::new(NoOpObserver));
        tracker.begin().unwrap();
        tracker.submitted(1, handle()).unwrap();
        let events = stream::iter(vec![ConfirmationEvent::Reverted { reason: None }]);
        let final_state = tracker.track(1, events.boxed()).await.unwrap();

        assert_eq!(final_state.phase(), TxPhase::Failed);
        assert_eq!(
            final_state.failure_reason(),
            Some(TxFailure::DEFAULT_REVERT_REASON)
        );
    }

    #[tokio::test]
    async fn test_stream_end_is_observation_failure() {
        let tracker = TransactionTracker::new(Arc::new(NoOpObserver));
        tracker.begin().unwrap();
        tracker.submitted(1, handle()).unwrap();
        let events = stream::iter(vec![ConfirmationEvent::Pending]);
        let final_state = tracker.track(1, events.boxed()).await.unwrap();

        let failure = final_state.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Observation);
        assert_eq!(failure.reason, STREAM_ENDED_REASON);
    }

    #[tokio::test]
    async fn test_events_after_terminal_are_ignored() {
        let tracker = TransactionTracker::new(Arc::new(NoOpObserver));
        tracker.begin().unwrap();
        tracker.submitted(1, handle()).unwrap();
        let events = stream::iter(vec![
            ConfirmationEvent::Success,
            ConfirmationEvent::Reverted {
                reason: Some("late".into()),
            },
        ]);
        let final_state = tracker.track(1, events.boxed()).await.unwrap();
        assert_eq!(final_state.phase(), TxPhase::Confirmed);
        assert_eq!(tracker.current().phase(), TxPhase::Confirmed);
    }

    #[test]
    fn test_begin_rejects_in_flight() {
        let tracker = TransactionTracker::new(Arc::new(NoOpObserver));
        tracker.begin().unwrap();
        assert_eq!(tracker.begin(), Err(TallyError::ConcurrentWrite));
        assert_eq!(tracker.current().attempt(), 1);
    }

    #[test]
    fn test_abandon() {
        let tracker = TransactionTracker::new(Arc::new(NoOpObserver));
        assert!(tracker.abandon().is_none());
        tracker.begin().unwrap();
        tracker.submitted(1, handle()).unwrap();
        let abandoned = tracker.abandon().unwrap();
        assert_eq!(abandoned.failure_reason(), Some(ABANDONED_REASON));
        assert!(tracker.abandon().is_none());
    }

    #[test]
    fn test_abandon_requires_handle() {
        let tracker = TransactionTracker::new(Arc::new(NoOpObserver));
        tracker.begin().unwrap();
        assert!(tracker.abandon().is_none());
        assert_eq!(tracker.current().phase(), TxPhase::Submitting);
        assert_eq!(tracker.begin(), Err(TallyError::ConcurrentWrite));

        let awaiting = tracker.submitted(1, handle()).unwrap();
        assert_eq!(awaiting.handle(), Some(&handle()));
    }

    #[tokio::test]
    async fn test_stale_attempt_cannot_touch_new_attempt() {
        let tracker = TransactionTracker::new(Arc::new(NoOpObserver));
        tracker.begin().unwrap();
        tracker.submitted(1, handle()).unwrap();
        tracker.abandon().unwrap();
        let second = tracker.begin().unwrap();
        assert_eq!(second.attempt(), 2);

        let late = stream::iter(vec![ConfirmationEvent::Success]);
        assert!(tracker.track(1, late.boxed()).await.is_err());
        assert!(tracker.submitted(1, handle()).is_err());
        assert!(tracker.observation_failed(1, "late").is_err());
        assert_eq!(tracker.current(), second);

        let other = TxHandle::from_bytes([8; 32]);
        tracker.submitted(2, other).unwrap();
        let pending = stream::iter(vec![ConfirmationEvent::Pending]);
        assert!(tracker.track(1, pending.boxed()).await.is_err());
        assert_eq!(tracker.current().phase(), TxPhase::AwaitingConfirmation);
        assert_eq!(tracker.current().handle(), Some(&other));
    }
}
