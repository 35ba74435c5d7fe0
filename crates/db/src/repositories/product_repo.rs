//! Repository for the `products` table.

use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use storefront_core::types::DbId;

use crate::models::product::Product;

/// Column list for `products` queries. NUMERIC columns are read as `float8`.
const COLUMNS: &str = "\
    id, name, price::float8 AS price, discount_type, \
    discount_value::float8 AS discount_value, stock, is_active, \
    created_at, updated_at";

/// Provides data access for catalogue products.
pub struct ProductRepo;

impl ProductRepo {
    /// Find a product by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load the active products among `ids`. Order is unspecified.
    pub async fn find_active_by_ids(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = ANY($1) AND is_active");
        sqlx::query_as::<_, Product>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Return the subset of `ids` naming active products.
    ///
    /// Accepts any executor so it can run inside a merge transaction.
    pub async fn active_ids<'e, E>(executor: E, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(DbId,)> =
            sqlx::query_as("SELECT id FROM products WHERE id = ANY($1) AND is_active")
                .bind(ids)
                .fetch_all(executor)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
