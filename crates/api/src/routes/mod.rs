pub mod admin;
pub mod cart;
pub mod health;
pub mod wishlist;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /cart/preview                       guest totals (public)
/// /cart                               get (?coupon=), clear
/// /cart/items                         add
/// /cart/items/{product_id}            update, remove
/// /cart/merge                         merge guest cart
///
/// /wishlist                           list, clear
/// /wishlist/items                     add
/// /wishlist/items/{product_id}        remove
/// /wishlist/merge                     merge guest wishlist
///
/// /admin/merge-locks/{user_id}        lock status (admin only)
/// /admin/merge-locks/release-all      force release (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .nest("/admin", admin::router())
}
