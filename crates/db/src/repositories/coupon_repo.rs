//! Repository for the `coupons` table.

use sqlx::PgPool;

use crate::models::coupon::Coupon;

/// Column list for `coupons` queries.
const COLUMNS: &str = "\
    id, code, discount_type, discount_value::float8 AS discount_value, \
    is_active, created_at, updated_at";

/// Provides data access for coupons.
pub struct CouponRepo;

impl CouponRepo {
    /// Look up a coupon by code, case-insensitively. Inactive coupons are
    /// returned too; the pricing rules ignore them.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Coupon>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM coupons WHERE LOWER(code) = LOWER($1)");
        sqlx::query_as::<_, Coupon>(&query)
            .bind(code.trim())
            .fetch_optional(pool)
            .await
    }
}
