//! Repository for the `cart_items` table.
//!
//! Quantities are validated by the caller; the repository only enforces the
//! per-line cap passed in. Writes that read-modify-write a user's cart take
//! a transaction-scoped advisory lock on the user id first.

use std::collections::HashSet;

use sqlx::{PgConnection, PgPool};
use storefront_core::merge::{plan_merge, AccountItem, MergeRule, MergeSummary};
use storefront_core::types::DbId;

use crate::models::cart::{CartItem, CartLine};
use crate::models::{quantity_from_db, quantity_to_db};
use crate::repositories::ProductRepo;

/// Column list for `cart_items` queries.
const COLUMNS: &str = "id, user_id, product_id, quantity, created_at, updated_at";

/// Column list for cart lines joined with `products`.
const LINE_COLUMNS: &str = "\
    ci.product_id, p.name, ci.quantity, p.price::float8 AS price, \
    p.discount_type, p.discount_value::float8 AS discount_value, \
    p.stock, p.is_active";

/// Provides data access for account carts.
pub struct CartRepo;

impl CartRepo {
    /// List a user's cart lines with product pricing, oldest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<CartLine>, sqlx::Error> {
        let query = format!(
            "SELECT {LINE_COLUMNS} \
             FROM cart_items ci \
             JOIN products p ON p.id = ci.product_id \
             WHERE ci.user_id = $1 \
             ORDER BY ci.id"
        );
        sqlx::query_as::<_, CartLine>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// List a user's raw `(product_id, quantity)` lines, oldest first.
    pub async fn account_items(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<AccountItem>, sqlx::Error> {
        let rows: Vec<(DbId, i32)> = sqlx::query_as(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(to_account_item).collect())
    }

    /// Add `quantity` of a product, summing with any existing line and
    /// clamping the result at `max_quantity`.
    pub async fn add_item(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
        quantity: u32,
        max_quantity: u32,
    ) -> Result<CartItem, sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_user_cart(&mut *tx, user_id).await?;

        let query = format!(
            "INSERT INTO cart_items (user_id, product_id, quantity) \
             VALUES ($1, $2, LEAST($3, $4)) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET \
                 quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $4) \
             RETURNING {COLUMNS}"
        );
        let item = sqlx::query_as::<_, CartItem>(&query)
            .bind(user_id)
            .bind(product_id)
            .bind(quantity_to_db(quantity))
            .bind(quantity_to_db(max_quantity))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Set the quantity of an existing line. Returns `None` if the product is
    /// not in the user's cart.
    pub async fn set_quantity(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
        quantity: u32,
    ) -> Result<Option<CartItem>, sqlx::Error> {
        let query = format!(
            "UPDATE cart_items SET quantity = $3 \
             WHERE user_id = $1 AND product_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CartItem>(&query)
            .bind(user_id)
            .bind(product_id)
            .bind(quantity_to_db(quantity))
            .fetch_optional(pool)
            .await
    }

    /// Remove a product from the cart. Returns `true` if a line was deleted.
    pub async fn remove_item(
        pool: &PgPool,
        user_id: DbId,
        product_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every line from a user's cart. Returns the number of lines removed.
    pub async fn clear(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Fold guest lines into the account cart in one transaction.
    ///
    /// Guest lines naming unknown or inactive products are ignored. Concurrent
    /// [`CartRepo::add_item`] calls serialise behind the merge. A line that
    /// appears after the snapshot is added onto rather than overwritten.
    pub async fn merge_items(
        pool: &PgPool,
        user_id: DbId,
        guest: &[AccountItem],
        max_quantity: u32,
    ) -> Result<MergeSummary, sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_user_cart(&mut *tx, user_id).await?;

        let ids: Vec<DbId> = guest.iter().map(|line| line.product_id).collect();
        let active = ProductRepo::active_ids(&mut *tx, &ids).await?;
        let guest: Vec<AccountItem> = guest
            .iter()
            .filter(|line| active.contains(&line.product_id))
            .copied()
            .collect();

        let rows: Vec<(DbId, i32)> = sqlx::query_as(
            "SELECT product_id, quantity FROM cart_items \
             WHERE user_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        let account: Vec<AccountItem> = rows.into_iter().map(to_account_item).collect();

        let plan = plan_merge(&account, &guest, MergeRule::SumQuantities { max_quantity });
        let locked: HashSet<DbId> = account.iter().map(|line| line.product_id).collect();
        for line in &plan.changed {
            if locked.contains(&line.product_id) {
                sqlx::query(
                    "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
                )
                .bind(user_id)
                .bind(line.product_id)
                .bind(quantity_to_db(line.quantity))
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(
                    "INSERT INTO cart_items (user_id, product_id, quantity) \
                     VALUES ($1, $2, $3) \
                     ON CONFLICT (user_id, product_id) DO UPDATE SET \
                         quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $4)",
                )
                .bind(user_id)
                .bind(line.product_id)
                .bind(quantity_to_db(line.quantity))
                .bind(quantity_to_db(max_quantity))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(plan.summary)
    }

    /// Replace the whole cart with `items` in one transaction. Lines naming
    /// unknown or inactive products are dropped.
    pub async fn replace_items(
        pool: &PgPool,
        user_id: DbId,
        items: &[AccountItem],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_user_cart(&mut *tx, user_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let ids: Vec<DbId> = items.iter().map(|line| line.product_id).collect();
        let active = ProductRepo::active_ids(&mut *tx, &ids).await?;
        for line in items.iter().filter(|line| active.contains(&line.product_id)) {
            sqlx::query("INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(line.product_id)
                .bind(quantity_to_db(line.quantity))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Serialise cart writers for one user until the transaction ends.
async fn lock_user_cart(conn: &mut PgConnection, user_id: DbId) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

fn to_account_item((product_id, quantity): (DbId, i32)) -> AccountItem {
    AccountItem {
        product_id,
        quantity: quantity_from_db(quantity),
    }
}
