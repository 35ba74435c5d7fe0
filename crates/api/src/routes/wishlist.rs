//! Route definitions for the `/wishlist` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::wishlist;
use crate::state::AppState;

/// Routes mounted at `/wishlist`.
///
/// ```text
/// GET    /                        -> list
/// DELETE /                        -> clear
/// POST   /items                   -> add_item
/// DELETE /items/{product_id}      -> remove_item
/// POST   /merge                   -> merge
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::list).delete(wishlist::clear))
        .route("/items", post(wishlist::add_item))
        .route("/items/{product_id}", delete(wishlist::remove_item))
        .route("/merge", post(wishlist::merge))
}
