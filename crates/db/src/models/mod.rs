//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` struct matching the database row (NUMERIC
//!   columns are selected as `float8`)
//! - `Deserialize` DTOs for request payloads, where the resource takes any

pub mod cart;
pub mod coupon;
pub mod product;
pub mod wishlist;

/// Convert a positive INTEGER quantity column to `u32`.
///
/// The schema's `CHECK (quantity > 0)` makes the fallback unreachable in practice.
pub(crate) fn quantity_from_db(quantity: i32) -> u32 {
    u32::try_from(quantity).unwrap_or(0)
}

/// Convert a validated quantity to the INTEGER column type.
pub(crate) fn quantity_to_db(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}
