//! Merge lock backed by the `merge_locks` table.
//!
//! Gives the same admission semantics as
//! [`InMemoryMergeLock`](storefront_core::merge_lock::InMemoryMergeLock)
//! across every API instance sharing the database. Forced release is lazy:
//! a hold whose `locked_until` has passed is treated as released by the next
//! query that looks at it, so no timer task is needed.

use async_trait::async_trait;
use storefront_core::error::CoreError;
use storefront_core::merge_lock::{MergeDomain, MergeLock, MergeLockConfig};
use storefront_core::types::UserId;

use crate::repositories::MergeLockRepo;
use crate::DbPool;

fn unavailable(domain: MergeDomain, err: sqlx::Error) -> CoreError {
    tracing::error!(%domain, error = %err, "Merge lock backend query failed");
    CoreError::LockUnavailable(format!("{domain} merge lock: {err}"))
}

/// Shared merge lock for one [`MergeDomain`].
#[derive(Clone)]
pub struct PgMergeLock {
    pool: DbPool,
    domain: MergeDomain,
    config: MergeLockConfig,
}

impl PgMergeLock {
    pub fn new(pool: DbPool, domain: MergeDomain) -> Self {
        Self::with_config(pool, domain, MergeLockConfig::default())
    }

    pub fn with_config(pool: DbPool, domain: MergeDomain, config: MergeLockConfig) -> Self {
        Self {
            pool,
            domain,
            config,
        }
    }
}

#[async_trait]
impl MergeLock for PgMergeLock {
    fn domain(&self) -> MergeDomain {
        self.domain
    }

    async fn acquire(&self, user_id: UserId) -> Result<bool, CoreError> {
        let granted = MergeLockRepo::try_acquire(
            &self.pool,
            self.domain,
            user_id,
            self.config.cooldown,
            self.config.lock_timeout,
        )
        .await
        .map_err(|e| unavailable(self.domain, e))?;

        if granted {
            tracing::debug!(domain = %self.domain, user_id, "Merge lock acquired");
        }
        Ok(granted)
    }

    async fn release(&self, user_id: UserId) -> Result<(), CoreError> {
        MergeLockRepo::release(&self.pool, self.domain, user_id)
            .await
            .map_err(|e| unavailable(self.domain, e))?;
        tracing::debug!(domain = %self.domain, user_id, "Merge lock released");
        Ok(())
    }

    async fn is_locked(&self, user_id: UserId) -> Result<bool, CoreError> {
        MergeLockRepo::is_locked(&self.pool, self.domain, user_id)
            .await
            .map_err(|e| unavailable(self.domain, e))
    }

    async fn release_all(&self) -> Result<(), CoreError> {
        let cleared = MergeLockRepo::release_all(&self.pool, self.domain)
            .await
            .map_err(|e| unavailable(self.domain, e))?;
        tracing::info!(domain = %self.domain, cleared, "Released all merge locks");
        Ok(())
    }
}
