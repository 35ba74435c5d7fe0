//! Repository for the `merge_locks` table.
//!
//! A row is held while `locked_until` is in the future. A hold that ran past
//! `locked_until` counts as released at that instant, so the cooldown is
//! measured from `GREATEST(last_released_at, locked_until)`.

use std::time::Duration;

use sqlx::PgPool;
use storefront_core::merge_lock::MergeDomain;
use storefront_core::types::UserId;

/// Provides data access for shared merge-lock state.
pub struct MergeLockRepo;

impl MergeLockRepo {
    /// Take the hold for `(domain, user_id)` if it is free and out of
    /// cooldown. Returns `true` when granted.
    pub async fn try_acquire(
        pool: &PgPool,
        domain: MergeDomain,
        user_id: UserId,
        cooldown: Duration,
        lock_timeout: Duration,
    ) -> Result<bool, sqlx::Error> {
        let granted: Option<(UserId,)> = sqlx::query_as(
            "INSERT INTO merge_locks (domain, user_id, locked_until) \
             VALUES ($1, $2, NOW() + make_interval(secs => $4)) \
             ON CONFLICT (domain, user_id) DO UPDATE SET \
                 locked_until = EXCLUDED.locked_until, \
                 last_released_at = GREATEST(merge_locks.last_released_at, merge_locks.locked_until) \
             WHERE (merge_locks.locked_until IS NULL OR merge_locks.locked_until <= NOW()) \
               AND COALESCE( \
                       GREATEST(merge_locks.last_released_at, merge_locks.locked_until), \
                       '-infinity'::timestamptz \
                   ) <= NOW() - make_interval(secs => $3) \
             RETURNING user_id",
        )
        .bind(domain.as_str())
        .bind(user_id)
        .bind(cooldown.as_secs_f64())
        .bind(lock_timeout.as_secs_f64())
        .fetch_optional(pool)
        .await?;
        Ok(granted.is_some())
    }

    /// Clear the hold and stamp the release time. Idempotent.
    pub async fn release(
        pool: &PgPool,
        domain: MergeDomain,
        user_id: UserId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO merge_locks (domain, user_id, locked_until, last_released_at) \
             VALUES ($1, $2, NULL, NOW()) \
             ON CONFLICT (domain, user_id) DO UPDATE SET \
                 locked_until = NULL, last_released_at = NOW()",
        )
        .bind(domain.as_str())
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether an unexpired hold exists for `(domain, user_id)`.
    pub async fn is_locked(
        pool: &PgPool,
        domain: MergeDomain,
        user_id: UserId,
    ) -> Result<bool, sqlx::Error> {
        let (locked,): (bool,) = sqlx::query_as(
            "SELECT EXISTS( \
                 SELECT 1 FROM merge_locks \
                 WHERE domain = $1 AND user_id = $2 AND locked_until > NOW() \
             )",
        )
        .bind(domain.as_str())
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(locked)
    }

    /// Clear every hold in `domain` without touching cooldown history.
    /// Returns the number of rows that were holding.
    pub async fn release_all(pool: &PgPool, domain: MergeDomain) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE merge_locks SET \
                 last_released_at = CASE \
                     WHEN locked_until <= NOW() \
                         THEN GREATEST(last_released_at, locked_until) \
                     ELSE last_released_at \
                 END, \
                 locked_until = NULL \
             WHERE domain = $1 AND locked_until IS NOT NULL",
        )
        .bind(domain.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
