//! Push notifications for controller state changes.
//!
//! Every lifecycle transition and every refresh outcome is delivered, in
//! order, to the controller's [`SyncObserver`]. Unlike a poll subscription,
//! nothing is coalesced.
//!
//! # Usage
//!
//! ```rust,ignore
//! let observer = Arc::new(FnObserver::new(|event| {
//!     if let SyncEvent::LifecycleChanged(lifecycle) = event {
//!         render_status(lifecycle);
//!     }
//! }));
//! let controller = SyncController::with_observer(client, config, observer);
//! ```

use std::sync::Arc;
use tally_core::{ReadSnapshot, TallyError, TransactionLifecycle};

// =============================================================================
// Sync Events
// =============================================================================

/// Something observable changed inside the controller.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The write lifecycle advanced
    LifecycleChanged(TransactionLifecycle),

    /// A refresh completed and its snapshot is now visible
    SnapshotPublished {
        /// Generation token of the refresh
        generation: u64,
        /// The published snapshot
        snapshot: Arc<ReadSnapshot>,
    },

    /// A refresh completed after a newer one was triggered; its result was dropped
    RefreshDiscarded {
        /// Generation token of the superseded refresh
        generation: u64,
    },

    /// A refresh failed; the previous snapshot stays visible
    RefreshFailed {
        /// Generation token of the failed refresh
        generation: u64,
        /// Why the refresh failed
        error: TallyError,
    },
}

// =============================================================================
// Observer Callback
// =============================================================================

/// Callback trait for receiving sync events.
pub trait SyncObserver: Send + Sync {
    /// Called after each state change
    fn on_sync_event(&self, event: &SyncEvent);
}

/// No-op implementation
pub struct NoOpObserver;

impl SyncObserver for NoOpObserver {
    fn on_sync_event(&self, _event: &SyncEvent) {}
}

/// Logging implementation
pub struct LoggingObserver;

impl SyncObserver for LoggingObserver {
    fn on_sync_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::LifecycleChanged(lifecycle) => {
                tracing::info!(
                    attempt = lifecycle.attempt(),
                    phase = %lifecycle.phase(),
                    handle = ?lifecycle.handle(),
                    reason = lifecycle.failure_reason().unwrap_or(""),
                    "write lifecycle changed"
                );
            }
            SyncEvent::SnapshotPublished {
                generation,
                snapshot,
            } => {
                tracing::info!(
                    generation,
                    entries = snapshot.entries().len(),
                    total = %snapshot.total_amount(),
                    "snapshot published"
                );
            }
            SyncEvent::RefreshDiscarded { generation } => {
                tracing::debug!(generation, "stale refresh discarded");
            }
            SyncEvent::RefreshFailed { generation, error } => {
                tracing::warn!(generation, %error, "refresh failed; keeping previous snapshot");
            }
        }
    }
}

/// Function-based callback wrapper
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    /// Create a new function-based observer
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> SyncObserver for FnObserver<F>
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn on_sync_event(&self, event: &SyncEvent) {
        (self.0)(event);
    }
}
