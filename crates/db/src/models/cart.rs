//! Cart line models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storefront_core::pricing::{calculate_product_price, DiscountType, LineItem, ProductPricing};
use storefront_core::types::{DbId, Timestamp};

use super::quantity_from_db;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `cart_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartItem {
    pub id: DbId,
    pub user_id: DbId,
    pub product_id: DbId,
    pub quantity: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A cart line joined with the product's pricing columns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub product_id: DbId,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    pub discount_type: String,
    pub discount_value: f64,
    pub stock: i32,
    pub is_active: bool,
}

impl CartLine {
    pub fn pricing(&self) -> ProductPricing {
        ProductPricing::new(
            self.price,
            DiscountType::from_db(&self.discount_type),
            self.discount_value,
        )
    }

    pub fn line_item(&self) -> LineItem {
        LineItem {
            product: self.pricing(),
            quantity: quantity_from_db(self.quantity),
        }
    }

    pub fn unit_price(&self) -> f64 {
        calculate_product_price(&self.pricing())
    }
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

fn default_quantity() -> f64 {
    1.0
}

/// DTO for adding a product to the cart. Quantity adds to any existing line.
#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItem {
    pub product_id: DbId,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
}

/// DTO for setting the quantity of an existing cart line.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItem {
    pub quantity: f64,
}
