//! PostgreSQL-backed [`ItemStore`] implementations for the merge routine.

use async_trait::async_trait;
use storefront_core::error::CoreError;
use storefront_core::merge::{AccountItem, ItemStore, MergeSummary};
use storefront_core::types::UserId;

use crate::repositories::{CartRepo, WishlistRepo};
use crate::DbPool;

fn store_error(domain: &'static str, op: &'static str, err: sqlx::Error) -> CoreError {
    tracing::error!(domain, op, error = %err, "Item store query failed");
    CoreError::Internal(format!("{domain} {op} failed: {err}"))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// Account carts. Merged quantities are clamped at `max_quantity`.
#[derive(Clone)]
pub struct PgCartStore {
    pool: DbPool,
    max_quantity: u32,
}

impl PgCartStore {
    pub fn new(pool: DbPool, max_quantity: u32) -> Self {
        Self { pool, max_quantity }
    }
}

#[async_trait]
impl ItemStore for PgCartStore {
    async fn account_items(&self, user_id: UserId) -> Result<Vec<AccountItem>, CoreError> {
        CartRepo::account_items(&self.pool, user_id)
            .await
            .map_err(|e| store_error("cart", "read", e))
    }

    async fn merge_items(
        &self,
        user_id: UserId,
        guest: &[AccountItem],
    ) -> Result<MergeSummary, CoreError> {
        CartRepo::merge_items(&self.pool, user_id, guest, self.max_quantity)
            .await
            .map_err(|e| store_error("cart", "merge", e))
    }

    async fn replace_account_items(
        &self,
        user_id: UserId,
        items: &[AccountItem],
    ) -> Result<(), CoreError> {
        CartRepo::replace_items(&self.pool, user_id, items)
            .await
            .map_err(|e| store_error("cart", "replace", e))
    }

    async fn clear_account_items(&self, user_id: UserId) -> Result<(), CoreError> {
        CartRepo::clear(&self.pool, user_id)
            .await
            .map(|_| ())
            .map_err(|e| store_error("cart", "clear", e))
    }
}

// ---------------------------------------------------------------------------
// Wishlist
// ---------------------------------------------------------------------------

/// Account wishlists. Quantities are ignored; every line counts once.
#[derive(Clone)]
pub struct PgWishlistStore {
    pool: DbPool,
}

impl PgWishlistStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PgWishlistStore {
    async fn account_items(&self, user_id: UserId) -> Result<Vec<AccountItem>, CoreError> {
        WishlistRepo::account_items(&self.pool, user_id)
            .await
            .map_err(|e| store_error("wishlist", "read", e))
    }

    async fn merge_items(
        &self,
        user_id: UserId,
        guest: &[AccountItem],
    ) -> Result<MergeSummary, CoreError> {
        WishlistRepo::merge_items(&self.pool, user_id, guest)
            .await
            .map_err(|e| store_error("wishlist", "merge", e))
    }

    async fn replace_account_items(
        &self,
        user_id: UserId,
        items: &[AccountItem],
    ) -> Result<(), CoreError> {
        WishlistRepo::replace_items(&self.pool, user_id, items)
            .await
            .map_err(|e| store_error("wishlist", "replace", e))
    }

    async fn clear_account_items(&self, user_id: UserId) -> Result<(), CoreError> {
        WishlistRepo::clear(&self.pool, user_id)
            .await
            .map(|_| ())
            .map_err(|e| store_error("wishlist", "clear", e))
    }
}
