//! Per-portfolio rebalance lock with TTL takeover.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Result of a lock acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    /// The caller holds the lock and must release it on every exit path.
    Acquired,
    /// A rebalance is already in flight; the caller returns with no side
    /// effects. The in-flight rebalance subsumes this one.
    Skip,
}

impl LockAttempt {
    /// Returns true if the lock was acquired.
    #[must_use]
    pub const fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// State of the rebalance lock: whether a rebalance is in flight and when
/// it started.
#[derive(Debug, Default)]
struct LockState {
    is_rebalancing: bool,
    started_at: Option<Instant>,
}

/// The per-portfolio mutual-exclusion lock for rebalancing.
///
/// This is lock-as-state, not a scoped guard: the pair
/// `(is_rebalancing, started_at)` is observable across tasks and carries a
/// TTL. The internal mutex protects only transitions of those two fields
/// and is held briefly, never across broker calls.
///
/// A lock held longer than the TTL is considered stuck (a crashed or
/// abandoned rebalance) and is taken over by the next caller. The TTL is a
/// liveness property only; no correctness depends on it.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ballast_engine::{LockAttempt, RebalanceLock};
///
/// let lock = RebalanceLock::new(Duration::from_secs(6 * 60 * 60));
/// assert_eq!(lock.try_acquire(), LockAttempt::Acquired);
/// assert_eq!(lock.try_acquire(), LockAttempt::Skip);
/// lock.release();
/// assert_eq!(lock.try_acquire(), LockAttempt::Acquired);
/// ```
#[derive(Debug)]
pub struct RebalanceLock {
    ttl: Duration,
    state: Mutex<LockState>,
}

impl RebalanceLock {
    /// Creates a new lock with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(LockState::default()),
        }
    }

    /// Attempts to acquire the lock.
    ///
    /// Returns [`LockAttempt::Acquired`] when the lock was free or its
    /// holder exceeded the TTL (takeover); [`LockAttempt::Skip`] when a
    /// rebalance is in flight and unexpired.
    pub fn try_acquire(&self) -> LockAttempt {
        let mut state = self.state.lock();
        let now = Instant::now();

        if !state.is_rebalancing {
            state.is_rebalancing = true;
            state.started_at = Some(now);
            return LockAttempt::Acquired;
        }

        let held_for = state
            .started_at
            .map_or(Duration::ZERO, |started| now.duration_since(started));

        if held_for < self.ttl {
            debug!(held_for = ?held_for, "Rebalance already in flight, skipping");
            return LockAttempt::Skip;
        }

        // The holder exceeded the TTL: take over the stuck lock.
        warn!(held_for = ?held_for, ttl = ?self.ttl, "Taking over stuck rebalance lock");
        state.started_at = Some(now);
        LockAttempt::Acquired
    }

    /// Releases the lock.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.is_rebalancing = false;
        state.started_at = None;
    }

    /// Returns true if a rebalance currently holds the lock (expired or
    /// not).
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.state.lock().is_rebalancing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let lock = RebalanceLock::new(Duration::from_secs(60));
        assert_eq!(lock.try_acquire(), LockAttempt::Acquired);
        assert!(lock.is_held());
        lock.release();
        assert!(!lock.is_held());
        assert_eq!(lock.try_acquire(), LockAttempt::Acquired);
    }

    #[test]
    fn test_second_acquire_skips() {
        let lock = RebalanceLock::new(Duration::from_secs(60));
        assert_eq!(lock.try_acquire(), LockAttempt::Acquired);
        assert_eq!(lock.try_acquire(), LockAttempt::Skip);
        assert_eq!(lock.try_acquire(), LockAttempt::Skip);
    }

    #[test]
    fn test_ttl_takeover() {
        let lock = RebalanceLock::new(Duration::from_millis(10));
        assert_eq!(lock.try_acquire(), LockAttempt::Acquired);

        // Within the TTL the lock protects its holder.
        assert_eq!(lock.try_acquire(), LockAttempt::Skip);

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(lock.try_acquire(), LockAttempt::Acquired);
        // The takeover refreshed started_at, so the lock is held again.
        assert_eq!(lock.try_acquire(), LockAttempt::Skip);
    }

    #[test]
    fn test_release_after_takeover() {
        let lock = RebalanceLock::new(Duration::from_millis(5));
        lock.try_acquire();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(lock.try_acquire(), LockAttempt::Acquired);
        lock.release();
        assert!(!lock.is_held());
    }

    #[test]
    fn test_exactly_one_concurrent_acquire() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let lock = Arc::new(RebalanceLock::new(Duration::from_secs(60)));
        let acquired = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let acquired = Arc::clone(&acquired);
                std::thread::spawn(move || {
                    if lock.try_acquire().is_acquired() {
                        acquired.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(acquired.load(Ordering::SeqCst), 1);
    }
}
