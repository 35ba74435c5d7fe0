//! Coupon rows.

use serde::Serialize;
use sqlx::FromRow;
use storefront_core::pricing::{CouponPricing, DiscountType, Numeric};
use storefront_core::types::{DbId, Timestamp};

/// A row from the `coupons` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Coupon {
    pub id: DbId,
    pub code: String,
    pub discount_type: String,
    pub discount_value: f64,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Coupon {
    pub fn pricing(&self) -> CouponPricing {
        CouponPricing {
            discount_type: DiscountType::from_db(&self.discount_type),
            discount_value: Some(Numeric::Number(self.discount_value)),
            is_active: self.is_active,
        }
    }
}
