//! Per-user single-flight admission into guest-to-account merges.
//!
//! One lock instance exists per [`MergeDomain`]. A granted acquisition must be
//! followed by a release; if the caller never releases, the hold is forced
//! off after the configured timeout and logged as a stale-lock anomaly.
//! After every release the same user is refused for a cooldown period.
//!
//! [`InMemoryMergeLock`] gives exclusion within one process only. Deployments
//! running several API instances should use a shared backend implementing
//! [`MergeLock`] (see `storefront_db::merge_lock::PgMergeLock`).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::CoreError;
use crate::types::UserId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum wait after a release before the same user may acquire again.
pub const COOLDOWN_PERIOD: Duration = Duration::from_millis(5_000);

/// Maximum time a hold may last before it is forcibly released.
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(10_000);

// ---------------------------------------------------------------------------
// Domain & config
// ---------------------------------------------------------------------------

/// Which item set a lock instance guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeDomain {
    Cart,
    Wishlist,
}

impl MergeDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Wishlist => "wishlist",
        }
    }
}

impl fmt::Display for MergeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timing parameters for a merge lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeLockConfig {
    pub cooldown: Duration,
    pub lock_timeout: Duration,
}

impl Default for MergeLockConfig {
    fn default() -> Self {
        Self {
            cooldown: COOLDOWN_PERIOD,
            lock_timeout: LOCK_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Coordination contract for merge admission.
///
/// A denied acquisition is `Ok(false)`: callers skip the merge. `Err` means
/// the backend itself could not be consulted.
#[async_trait]
pub trait MergeLock: Send + Sync {
    /// The item set this lock guards.
    fn domain(&self) -> MergeDomain;

    /// Try to take the lock for `user_id`. Never waits.
    async fn acquire(&self, user_id: UserId) -> Result<bool, CoreError>;

    /// Clear the hold (if any) and start the cooldown. Idempotent.
    async fn release(&self, user_id: UserId) -> Result<(), CoreError>;

    /// Whether a merge is currently in flight for `user_id`.
    async fn is_locked(&self, user_id: UserId) -> Result<bool, CoreError>;

    /// Clear every hold. Cooldown history is kept.
    async fn release_all(&self) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

struct HeldLock {
    generation: u64,
    acquired_at: Instant,
    timeout_task: Option<JoinHandle<()>>,
}

impl HeldLock {
    fn cancel_timeout(&mut self) {
        if let Some(task) = self.timeout_task.take() {
            task.abort();
        }
    }
}

#[derive(Default)]
struct LockTable {
    locks: DashMap<UserId, HeldLock>,
    /// Last release per user. Never pruned.
    merge_timestamps: DashMap<UserId, Instant>,
    next_generation: AtomicU64,
}

impl LockTable {
    fn stamp_release(&self, user_id: UserId) {
        self.merge_timestamps.insert(user_id, Instant::now());
    }

    /// Forced release scheduled at acquisition time. Only clears the hold it
    /// was scheduled for.
    fn expire(&self, domain: MergeDomain, user_id: UserId, generation: u64, timeout: Duration) {
        let removed = self
            .locks
            .remove_if(&user_id, |_, held| held.generation == generation);
        if removed.is_some() {
            self.stamp_release(user_id);
            tracing::warn!(
                %domain,
                user_id,
                timeout_ms = timeout.as_millis() as u64,
                "Merge lock held past timeout, forcing release"
            );
        }
    }
}

/// Process-local [`MergeLock`] backed by a sharded per-user table.
///
/// Different users never contend on the same entry. Must be shared (e.g. via
/// `Arc`) to be useful; each instance has its own table.
pub struct InMemoryMergeLock {
    domain: MergeDomain,
    config: MergeLockConfig,
    table: Arc<LockTable>,
}

impl InMemoryMergeLock {
    pub fn new(domain: MergeDomain) -> Self {
        Self::with_config(domain, MergeLockConfig::default())
    }

    pub fn with_config(domain: MergeDomain, config: MergeLockConfig) -> Self {
        Self {
            domain,
            config,
            table: Arc::new(LockTable::default()),
        }
    }

    /// Synchronous form of [`MergeLock::acquire`].
    ///
    /// When called inside a tokio runtime, a timer is spawned to force the
    /// release after `lock_timeout`. Outside a runtime, stale holds are
    /// expired on the next `try_acquire` / `is_held` for that user instead.
    pub fn try_acquire(&self, user_id: UserId) -> bool {
        self.expire_if_stale(user_id);

        // The vacant entry keeps the user's shard write-locked, so two
        // concurrent acquisitions cannot both observe "unheld".
        let vacant = match self.table.locks.entry(user_id) {
            Entry::Occupied(_) => {
                tracing::debug!(domain = %self.domain, user_id, "Merge lock denied: already held");
                return false;
            }
            Entry::Vacant(vacant) => vacant,
        };

        let cooling_down = self
            .table
            .merge_timestamps
            .get(&user_id)
            .is_some_and(|last| last.elapsed() < self.config.cooldown);
        if cooling_down {
            tracing::debug!(domain = %self.domain, user_id, "Merge lock denied: cooldown active");
            return false;
        }

        let generation = self.table.next_generation.fetch_add(1, Ordering::Relaxed);
        let timeout_task = self.schedule_timeout(user_id, generation);
        vacant.insert(HeldLock {
            generation,
            acquired_at: Instant::now(),
            timeout_task,
        });
        tracing::debug!(domain = %self.domain, user_id, "Merge lock acquired");
        true
    }

    /// Synchronous form of [`MergeLock::release`].
    pub fn release_now(&self, user_id: UserId) {
        if let Some((_, mut held)) = self.table.locks.remove(&user_id) {
            held.cancel_timeout();
            tracing::debug!(domain = %self.domain, user_id, "Merge lock released");
        }
        self.table.stamp_release(user_id);
    }

    /// Synchronous form of [`MergeLock::is_locked`].
    pub fn is_held(&self, user_id: UserId) -> bool {
        self.expire_if_stale(user_id);
        self.table.locks.contains_key(&user_id)
    }

    /// Synchronous form of [`MergeLock::release_all`].
    pub fn clear_holds(&self) {
        let mut count = 0usize;
        self.table.locks.retain(|_, held| {
            held.cancel_timeout();
            count += 1;
            false
        });
        tracing::info!(domain = %self.domain, count, "Released all merge locks");
    }

    fn schedule_timeout(&self, user_id: UserId, generation: u64) -> Option<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let table = Arc::clone(&self.table);
        let domain = self.domain;
        let timeout = self.config.lock_timeout;

        Some(runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            table.expire(domain, user_id, generation, timeout);
        }))
    }

    fn expire_if_stale(&self, user_id: UserId) {
        let timeout = self.config.lock_timeout;
        let removed = self
            .table
            .locks
            .remove_if(&user_id, |_, held| held.acquired_at.elapsed() >= timeout);
        if let Some((_, mut held)) = removed {
            held.cancel_timeout();
            self.table.stamp_release(user_id);
            tracing::warn!(
                domain = %self.domain,
                user_id,
                timeout_ms = timeout.as_millis() as u64,
                "Merge lock held past timeout, forcing release"
            );
        }
    }
}

#[async_trait]
impl MergeLock for InMemoryMergeLock {
    fn domain(&self) -> MergeDomain {
        self.domain
    }

    async fn acquire(&self, user_id: UserId) -> Result<bool, CoreError> {
        Ok(self.try_acquire(user_id))
    }

    async fn release(&self, user_id: UserId) -> Result<(), CoreError> {
        self.release_now(user_id);
        Ok(())
    }

    async fn is_locked(&self, user_id: UserId) -> Result<bool, CoreError> {
        Ok(self.is_held(user_id))
    }

    async fn release_all(&self) -> Result<(), CoreError> {
        self.clear_holds();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    // -- mutual exclusion -----------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn second_acquire_while_held_is_denied() {
        let lock = InMemoryMergeLock::new(MergeDomain::Cart);
        assert!(lock.acquire(1).await.unwrap());
        assert!(!lock.acquire(1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn different_users_do_not_contend() {
        let lock = InMemoryMergeLock::new(MergeDomain::Cart);
        assert!(lock.acquire(1).await.unwrap());
        assert!(lock.acquire(2).await.unwrap());
        assert!(lock.is_locked(1).await.unwrap());
        assert!(lock.is_locked(2).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_acquires_grant_exactly_one() {
        let lock = Arc::new(InMemoryMergeLock::new(MergeDomain::Wishlist));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let lock = Arc::clone(&lock);
                tokio::spawn(async move { lock.acquire(7).await.unwrap() })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }

    // -- cooldown -------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn reacquire_within_cooldown_is_denied() {
        let lock = InMemoryMergeLock::new(MergeDomain::Cart);
        assert!(lock.acquire(1).await.unwrap());
        lock.release(1).await.unwrap();

        assert!(!lock.acquire(1).await.unwrap());
        tokio::time::advance(COOLDOWN_PERIOD - MS).await;
        assert!(!lock.acquire(1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn reacquire_after_cooldown_is_granted() {
        let lock = InMemoryMergeLock::new(MergeDomain::Cart);
        assert!(lock.acquire(1).await.unwrap());
        lock.release(1).await.unwrap();

        tokio::time::advance(COOLDOWN_PERIOD).await;
        assert!(lock.acquire(1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn release_without_hold_still_starts_cooldown() {
        let lock = InMemoryMergeLock::new(MergeDomain::Cart);
        lock.release(9).await.unwrap();
        assert!(!lock.is_locked(9).await.unwrap());
        assert!(!lock.acquire(9).await.unwrap());
    }

    // -- timeout --------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn unreleased_lock_is_forced_off_after_timeout() {
        let lock = InMemoryMergeLock::new(MergeDomain::Cart);
        assert!(lock.acquire(1).await.unwrap());

        tokio::time::sleep(LOCK_TIMEOUT - MS).await;
        assert!(lock.is_locked(1).await.unwrap());

        tokio::time::sleep(2 * MS).await;
        assert!(!lock.is_locked(1).await.unwrap());

        // The forced release stamps the cooldown clock like a normal release.
        assert!(!lock.acquire(1).await.unwrap());
        tokio::time::advance(COOLDOWN_PERIOD).await;
        assert!(lock.acquire(1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_release_newer_hold() {
        let config = MergeLockConfig {
            cooldown: Duration::ZERO,
            lock_timeout: LOCK_TIMEOUT,
        };
        let lock = InMemoryMergeLock::with_config(MergeDomain::Cart, config);

        assert!(lock.acquire(1).await.unwrap());
        tokio::time::sleep(LOCK_TIMEOUT / 2).await;
        lock.release(1).await.unwrap();
        assert!(lock.acquire(1).await.unwrap());

        // First acquisition's deadline passes; the second hold survives.
        tokio::time::sleep(LOCK_TIMEOUT / 2 + MS).await;
        assert!(lock.is_locked(1).await.unwrap());
    }

    #[test]
    fn stale_hold_expires_lazily_without_runtime() {
        let config = MergeLockConfig {
            cooldown: Duration::ZERO,
            lock_timeout: Duration::ZERO,
        };
        let lock = InMemoryMergeLock::with_config(MergeDomain::Wishlist, config);

        assert!(lock.try_acquire(3));
        assert!(!lock.is_held(3));
        assert!(lock.try_acquire(3));
    }

    // -- release_all ----------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn release_all_clears_holds_but_keeps_cooldowns() {
        let lock = InMemoryMergeLock::new(MergeDomain::Cart);
        assert!(lock.acquire(1).await.unwrap());
        assert!(lock.acquire(2).await.unwrap());
        lock.release(3).await.unwrap();

        lock.release_all().await.unwrap();
        assert!(!lock.is_locked(1).await.unwrap());
        assert!(!lock.is_locked(2).await.unwrap());

        // Holds cleared administratively do not start a cooldown...
        assert!(lock.acquire(1).await.unwrap());
        // ...but existing cooldown history is untouched.
        assert!(!lock.acquire(3).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_user_is_not_locked() {
        let lock = InMemoryMergeLock::new(MergeDomain::Wishlist);
        assert!(!lock.is_locked(42).await.unwrap());
        assert_eq!(lock.domain(), MergeDomain::Wishlist);
    }
}
