//! Wishlist line models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storefront_core::pricing::{calculate_product_price, DiscountType, ProductPricing};
use storefront_core::types::{DbId, Timestamp};

/// A wishlist row joined with the product's pricing columns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WishlistLine {
    pub product_id: DbId,
    pub name: String,
    pub price: f64,
    pub discount_type: String,
    pub discount_value: f64,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl WishlistLine {
    pub fn pricing(&self) -> ProductPricing {
        ProductPricing::new(
            self.price,
            DiscountType::from_db(&self.discount_type),
            self.discount_value,
        )
    }

    pub fn unit_price(&self) -> f64 {
        calculate_product_price(&self.pricing())
    }
}

/// DTO for adding a product to the wishlist.
#[derive(Debug, Clone, Deserialize)]
pub struct AddWishlistItem {
    pub product_id: DbId,
}
