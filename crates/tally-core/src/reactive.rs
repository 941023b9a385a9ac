//! Dynamic<T> - A versioned value with change notifications
//!
//! `Dynamic<T>` wraps a value and provides poll-based subscriptions. The
//! controller owns one `Dynamic` per piece of observable state; front ends
//! either poll a [`Subscription`] or read the current value on demand.
//!
//! # Runtime Agnostic Design
//!
//! Only a lock and an atomic version counter are used, so the same type works
//! on a multi-threaded runtime, a single-threaded executor, or in sync code.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct DynamicInner<T> {
    value: RwLock<T>,
    /// Incremented on each update.
    version: AtomicU64,
}

/// A reactive value that can be observed for changes.
///
/// Cloning a `Dynamic` shares the underlying value.
///
/// # Example
///
/// ```rust
/// use tally_core::reactive::Dynamic;
///
/// let counter = Dynamic::new(0);
/// let mut sub = counter.subscribe();
///
/// counter.set(1);
/// assert_eq!(counter.get(), 1);
/// assert_eq!(sub.poll(), Some(1));
/// assert_eq!(sub.poll(), None);
/// ```
pub struct Dynamic<T> {
    inner: Arc<DynamicInner<T>>,
}

impl<T> Clone for Dynamic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Dynamic<T> {
    /// Create a new Dynamic with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(DynamicInner {
                value: RwLock::new(value),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Get the current version number.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replace the value and bump the version.
    pub fn set(&self, value: T) {
        let mut guard = self.inner.value.write();
        *guard = value;
        self.inner.version.fetch_add(1, Ordering::Release);
    }

    /// Compute the next value from the current one under the write lock.
    ///
    /// If `f` fails the value and version are left unchanged. The check and
    /// the write are atomic with respect to every other `Dynamic` operation.
    pub fn try_update<E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&T) -> Result<T, E>,
    {
        let mut guard = self.inner.value.write();
        let next = f(&guard)?;
        *guard = next.clone();
        self.inner.version.fetch_add(1, Ordering::Release);
        Ok(next)
    }

    /// Subscribe to value changes.
    ///
    /// The subscription starts at the current version, so the first `poll`
    /// returns `None` until the next update.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            source: Arc::clone(&self.inner),
            last_version: self.inner.version.load(Ordering::Acquire),
        }
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Dynamic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + std::fmt::Debug + 'static> std::fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dynamic")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

/// A subscription to a Dynamic value for polling changes.
///
/// Updates coalesce: a poll after several sets returns only the latest value.
pub struct Subscription<T> {
    source: Arc<DynamicInner<T>>,
    last_version: u64,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    /// Check if the source has changed since the last poll.
    pub fn has_changed(&self) -> bool {
        self.source.version.load(Ordering::Acquire) > self.last_version
    }

    /// Return the new value if the source changed since the last poll.
    pub fn poll(&mut self) -> Option<T> {
        let guard = self.source.value.read();
        let current_version = self.source.version.load(Ordering::Acquire);
        if current_version > self.last_version {
            self.last_version = current_version;
            Some(guard.clone())
        } else {
            None
        }
    }

    /// Get the current value regardless of whether it changed.
    pub fn get(&self) -> T {
        self.source.value.read().clone()
    }

    /// Get the last version this subscription observed.
    pub fn last_observed_version(&self) -> u64 {
        self.last_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_set_bumps_version() {
        let d = Dynamic::new(0);
        assert_eq!(d.version(), 0);

        d.set(1);
        d.set(2);
        assert_eq!(d.get(), 2);
        assert_eq!(d.version(), 2);
    }

    #[test]
    fn test_dynamic_clone_shares_state() {
        let d1 = Dynamic::new(0);
        let d2 = d1.clone();

        d1.set(42);
        assert_eq!(d2.get(), 42);
    }

    #[test]
    fn test_try_update_failure_leaves_value() {
        let d = Dynamic::new(10);
        let result: Result<i32, &str> = d.try_update(|_| Err("nope"));
        assert!(result.is_err());
        assert_eq!(d.get(), 10);
        assert_eq!(d.version(), 0);

        let result: Result<i32, &str> = d.try_update(|v| Ok(v + 1));
        assert_eq!(result, Ok(11));
        assert_eq!(d.version(), 1);
    }

    #[test]
    fn test_subscription_poll() {
        let d = Dynamic::new(0);
        let mut sub = d.subscribe();

        assert_eq!(sub.poll(), None);

        d.set(1);
        assert!(sub.has_changed());
        assert_eq!(sub.poll(), Some(1));
        assert_eq!(sub.poll(), None);
        assert_eq!(sub.last_observed_version(), 1);
    }

    #[test]
    fn test_subscription_coalesces_updates() {
        let d = Dynamic::new(0);
        let mut sub = d.subscribe();

        d.set(1);
        d.set(2);
        d.set(3);

        assert_eq!(sub.poll(), Some(3));
        assert_eq!(sub.poll(), None);
    }

    #[test]
    fn test_dynamic_debug() {
        let d = Dynamic::new(42);
        let debug_str = format!("{d:?}");
        assert!(debug_str.contains("Dynamic"));
        assert!(debug_str.contains("42"));
    }
}
