//! Catalogue product rows.

use serde::Serialize;
use sqlx::FromRow;
use storefront_core::pricing::{calculate_product_price, DiscountType, ProductPricing};
use storefront_core::types::{DbId, Timestamp};

/// A row from the `products` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: DbId,
    pub name: String,
    pub price: f64,
    pub discount_type: String,
    pub discount_value: f64,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Product {
    pub fn pricing(&self) -> ProductPricing {
        ProductPricing::new(
            self.price,
            DiscountType::from_db(&self.discount_type),
            self.discount_value,
        )
    }

    /// Unit price after the product-level discount.
    pub fn effective_price(&self) -> f64 {
        calculate_product_price(&self.pricing())
    }

    /// Largest quantity a single cart line may hold: current stock, capped
    /// at `cap`.
    pub fn orderable_limit(&self, cap: u32) -> u32 {
        u32::try_from(self.stock).unwrap_or(0).min(cap)
    }
}
