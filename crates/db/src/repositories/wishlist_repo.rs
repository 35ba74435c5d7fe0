//! Repository for the `wishlist_items` table.

use sqlx::PgPool;
use storefront_core::merge::{plan_merge, AccountItem, MergeRule, MergeSummary};
use storefront_core::types::DbId;

use crate::models::wishlist::WishlistLine;
use crate::repositories::ProductRepo;

/// Column list for wishlist lines joined with `products`.
const LINE_COLUMNS: &str = "\
    wi.product_id, p.name, p.price::float8 AS price, p.discount_type, \
    p.discount_value::float8 AS discount_value, p.is_active, wi.created_at";

/// Provides data access for account wishlists.
pub struct WishlistRepo;

impl WishlistRepo {
    /// List a user's wishlist with product pricing, oldest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<WishlistLine>, sqlx::Error> {
        let query = format!(
            "SELECT {LINE_COLUMNS} \
             FROM wishlist_items wi \
             JOIN products p ON p.id = wi.product_id \
             WHERE wi.user_id = $1 \
             ORDER BY wi.id"
        );
        sqlx::query_as::<_, WishlistLine>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// List a user's wishlisted product ids as quantity-1 lines, oldest first.
    pub async fn account_items(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<AccountItem>, sqlx::Error> {
        let ids: Vec<(DbId,)> =
            sqlx::query_as("SELECT product_id FROM wishlist_items WHERE user_id = $1 ORDER BY id")
                .bind(user_id)
                .fetch_all(pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| wishlist_line(id)).collect())
    }

    /// Add a product. Returns `false` if it was already wishlisted.
    pub async fn add_item(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a product. Returns `true` if a row was deleted.
    pub async fn remove_item(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every product from a user's wishlist.
    pub async fn clear(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Union guest products into the account wishlist in one transaction.
    /// Unknown or inactive products are ignored.
    pub async fn merge_items(
        pool: &PgPool,
        user_id: DbId,
        guest: &[AccountItem],
    ) -> Result<MergeSummary, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let ids: Vec<DbId> = guest.iter().map(|line| line.product_id).collect();
        let active = ProductRepo::active_ids(&mut *tx, &ids).await?;
        let guest: Vec<AccountItem> = guest
            .iter()
            .filter(|line| active.contains(&line.product_id))
            .copied()
            .collect();

        let existing: Vec<(DbId,)> = sqlx::query_as(
            "SELECT product_id FROM wishlist_items WHERE user_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        let account: Vec<AccountItem> = existing.into_iter().map(|(id,)| wishlist_line(id)).collect();

        let plan = plan_merge(&account, &guest, MergeRule::Union);
        for line in &plan.changed {
            sqlx::query(
                "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) \
                 ON CONFLICT (user_id, product_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(line.product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(plan.summary)
    }

    /// Replace the whole wishlist with `items`. Unknown or inactive products
    /// are dropped.
    pub async fn replace_items(
        pool: &PgPool,
        user_id: DbId,
        items: &[AccountItem],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let ids: Vec<DbId> = items.iter().map(|line| line.product_id).collect();
        let active = ProductRepo::active_ids(&mut *tx, &ids).await?;
        for product_id in ids.into_iter().filter(|id| active.contains(id)) {
            sqlx::query(
                "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) \
                 ON CONFLICT (user_id, product_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn wishlist_line(product_id: DbId) -> AccountItem {
    AccountItem {
        product_id,
        quantity: 1,
    }
}
