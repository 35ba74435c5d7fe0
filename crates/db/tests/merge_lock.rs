//! Integration tests for the shared, table-backed merge lock.

use std::time::Duration;

use sqlx::PgPool;
use storefront_core::merge_lock::{MergeDomain, MergeLock, MergeLockConfig};
use storefront_db::merge_lock::PgMergeLock;

fn no_cooldown(lock_timeout: Duration) -> MergeLockConfig {
    MergeLockConfig {
        cooldown: Duration::ZERO,
        lock_timeout,
    }
}

// ---------------------------------------------------------------------------
// Test: single-flight and cooldown
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_acquire_is_denied_until_cooldown(pool: PgPool) {
    let lock = PgMergeLock::new(pool, MergeDomain::Cart);

    assert!(lock.acquire(1).await.unwrap());
    assert!(lock.is_locked(1).await.unwrap());
    assert!(!lock.acquire(1).await.unwrap());

    lock.release(1).await.unwrap();
    assert!(!lock.is_locked(1).await.unwrap());

    // Default cooldown is five seconds.
    assert!(!lock.acquire(1).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn acquire_is_granted_again_after_cooldown(pool: PgPool) {
    let lock = PgMergeLock::with_config(
        pool,
        MergeDomain::Cart,
        MergeLockConfig {
            cooldown: Duration::from_millis(100),
            lock_timeout: Duration::from_secs(10),
        },
    );

    assert!(lock.acquire(1).await.unwrap());
    lock.release(1).await.unwrap();
    assert!(!lock.acquire(1).await.unwrap());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(lock.acquire(1).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn users_and_domains_are_independent(pool: PgPool) {
    let cart = PgMergeLock::new(pool.clone(), MergeDomain::Cart);
    let wishlist = PgMergeLock::new(pool, MergeDomain::Wishlist);

    assert!(cart.acquire(1).await.unwrap());
    assert!(cart.acquire(2).await.unwrap());
    assert!(wishlist.acquire(1).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_without_hold_is_harmless(pool: PgPool) {
    let lock = PgMergeLock::with_config(pool, MergeDomain::Cart, no_cooldown(Duration::from_secs(10)));

    lock.release(5).await.unwrap();
    lock.release(5).await.unwrap();
    assert!(!lock.is_locked(5).await.unwrap());
    assert!(lock.acquire(5).await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: expired holds
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_hold_no_longer_blocks(pool: PgPool) {
    let lock = PgMergeLock::with_config(
        pool,
        MergeDomain::Wishlist,
        no_cooldown(Duration::from_millis(50)),
    );

    assert!(lock.acquire(1).await.unwrap());
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!lock.is_locked(1).await.unwrap());
    assert!(lock.acquire(1).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cooldown_after_expiry_runs_from_expiry(pool: PgPool) {
    let lock = PgMergeLock::with_config(
        pool,
        MergeDomain::Cart,
        MergeLockConfig {
            cooldown: Duration::from_millis(500),
            lock_timeout: Duration::from_millis(100),
        },
    );

    assert!(lock.acquire(1).await.unwrap());
    tokio::time::sleep(Duration::from_millis(250)).await;

    // The hold expired but was never released; it still starts a cooldown.
    assert!(!lock.is_locked(1).await.unwrap());
    assert!(!lock.acquire(1).await.unwrap());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(lock.acquire(1).await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: release_all
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_all_clears_holds_but_not_history(pool: PgPool) {
    let lock = PgMergeLock::new(pool.clone(), MergeDomain::Cart);
    let other = PgMergeLock::new(pool, MergeDomain::Wishlist);

    assert!(lock.acquire(1).await.unwrap());
    lock.release(1).await.unwrap();
    assert!(lock.acquire(2).await.unwrap());
    assert!(other.acquire(2).await.unwrap());

    lock.release_all().await.unwrap();

    assert!(!lock.is_locked(2).await.unwrap());
    assert!(other.is_locked(2).await.unwrap());
    // User 2 was never released normally, so no cooldown applies.
    assert!(lock.acquire(2).await.unwrap());
    // User 1 is still cooling down from the earlier release.
    assert!(!lock.acquire(1).await.unwrap());
}
