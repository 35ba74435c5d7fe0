//! Handlers for the `/wishlist` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use storefront_core::error::CoreError;
use storefront_core::merge::{run_merge, ItemStore};
use storefront_core::types::ProductId;
use storefront_db::models::wishlist::AddWishlistItem;
use storefront_db::repositories::{ProductRepo, WishlistRepo};

use crate::error::{AppError, AppResult};
use crate::handlers::merge::{MergeRequest, MergeResponse};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// One wishlisted product with its current price.
#[derive(Debug, Serialize)]
pub struct WishlistLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: f64,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct WishlistAdded {
    pub product_id: ProductId,
    /// `false` when the product was already on the wishlist.
    pub added: bool,
}

/// GET /api/v1/wishlist
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<WishlistLineView>>>> {
    let lines = WishlistRepo::list_for_user(&state.pool, user.user_id).await?;
    let items = lines
        .into_iter()
        .map(|line| WishlistLineView {
            product_id: line.product_id,
            unit_price: line.unit_price(),
            available: line.is_active,
            name: line.name,
        })
        .collect();
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/wishlist/items
///
/// Idempotent: adding a product twice keeps one entry.
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<AddWishlistItem>,
) -> AppResult<(StatusCode, Json<DataResponse<WishlistAdded>>)> {
    let product = ProductRepo::find_by_id(&state.pool, input.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id: input.product_id,
        }))?;

    let added = WishlistRepo::add_item(&state.pool, user.user_id, product.id).await?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(DataResponse {
            data: WishlistAdded {
                product_id: product.id,
                added,
            },
        }),
    ))
}

/// DELETE /api/v1/wishlist/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<ProductId>,
) -> AppResult<StatusCode> {
    if WishlistRepo::remove_item(&state.pool, user.user_id, product_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "WishlistItem",
            id: product_id,
        }))
    }
}

/// DELETE /api/v1/wishlist
pub async fn clear(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    state.wishlist_store().clear_account_items(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/wishlist/merge
///
/// Union the client's guest wishlist into the account after sign-in.
pub async fn merge(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<MergeRequest>,
) -> AppResult<Json<DataResponse<MergeResponse>>> {
    let store = state.wishlist_store();
    let outcome = run_merge(
        state.wishlist_lock.as_ref(),
        &store,
        user.user_id,
        &input.items,
        input.mode,
        state.config.merge.max_item_quantity,
    )
    .await?;

    Ok(Json(DataResponse {
        data: outcome.into(),
    }))
}
