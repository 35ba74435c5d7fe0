//! Route definitions for the `/cart` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::cart;
use crate::state::AppState;

/// Routes mounted at `/cart`.
///
/// ```text
/// GET    /                        -> get_cart (?coupon=CODE)
/// DELETE /                        -> clear
/// POST   /preview                 -> preview (no auth)
/// POST   /items                   -> add_item
/// PUT    /items/{product_id}      -> update_item
/// DELETE /items/{product_id}      -> remove_item
/// POST   /merge                   -> merge
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::get_cart).delete(cart::clear))
        .route("/preview", post(cart::preview))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/merge", post(cart::merge))
}
