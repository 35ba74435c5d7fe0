//! Handlers for the `/cart` resource.
//!
//! Account carts live in `cart_items`; guest carts live on the client and are
//! only seen here through the preview and merge endpoints. Both views are
//! priced by `storefront_core::pricing::calculate_cart_total`.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use storefront_core::error::CoreError;
use storefront_core::merge::{normalize_guest_items, run_merge, GuestItem, ItemStore};
use storefront_core::pricing::{
    calculate_cart_total, require_valid_quantity, round_currency, CartTotals, CouponPricing,
    LineItem,
};
use storefront_core::types::ProductId;
use storefront_db::models::cart::{AddCartItem, CartItem, UpdateCartItem};
use storefront_db::models::product::Product;
use storefront_db::repositories::{CartRepo, CouponRepo, ProductRepo};
use storefront_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::handlers::merge::{MergeRequest, MergeResponse};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response / request shapes
// ---------------------------------------------------------------------------

/// One priced cart line.
#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    /// Unit price after the product discount.
    pub unit_price: f64,
    pub line_total: f64,
    /// `false` once the product is retired; such lines are excluded from totals.
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct CouponView {
    pub code: String,
    pub applied: bool,
}

/// A cart with its totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub coupon: Option<CouponView>,
    #[serde(flatten)]
    pub totals: CartTotals,
}

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub coupon: Option<String>,
}

/// Body of `POST /cart/preview`.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub items: Vec<GuestItem>,
    pub coupon: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/cart/preview
///
/// Price a guest cart held on the client. Prices come from the catalogue, not
/// from the product snapshots in the payload; unknown or retired products are
/// dropped.
pub async fn preview(
    State(state): State<AppState>,
    Json(input): Json<PreviewRequest>,
) -> AppResult<Json<DataResponse<CartView>>> {
    let lines = normalize_guest_items(&input.items, state.config.merge.max_item_quantity);
    let ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
    let products: HashMap<ProductId, Product> =
        ProductRepo::find_active_by_ids(&state.pool, &ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

    let mut items = Vec::with_capacity(lines.len());
    let mut priced = Vec::with_capacity(lines.len());
    for line in &lines {
        let Some(product) = products.get(&line.product_id) else {
            continue;
        };
        let unit_price = product.effective_price();
        items.push(CartLineView {
            product_id: product.id,
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price,
            line_total: round_currency(unit_price * f64::from(line.quantity)),
            available: true,
        });
        priced.push(LineItem {
            product: product.pricing(),
            quantity: line.quantity,
        });
    }

    let (coupon, coupon_view) = resolve_coupon(&state.pool, input.coupon.as_deref()).await?;
    let totals = calculate_cart_total(&priced, coupon.as_ref());

    Ok(Json(DataResponse {
        data: CartView {
            items,
            coupon: coupon_view,
            totals,
        },
    }))
}

/// GET /api/v1/cart?coupon=CODE
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<CartQuery>,
) -> AppResult<Json<DataResponse<CartView>>> {
    let lines = CartRepo::list_for_user(&state.pool, user.user_id).await?;

    let priced: Vec<LineItem> = lines
        .iter()
        .filter(|line| line.is_active)
        .map(|line| line.line_item())
        .collect();

    let items = lines
        .into_iter()
        .map(|line| {
            let unit_price = line.unit_price();
            let item = line.line_item();
            CartLineView {
                product_id: line.product_id,
                line_total: round_currency(unit_price * f64::from(item.quantity)),
                quantity: item.quantity,
                unit_price,
                available: line.is_active,
                name: line.name,
            }
        })
        .collect();

    let (coupon, coupon_view) = resolve_coupon(&state.pool, params.coupon.as_deref()).await?;
    let totals = calculate_cart_total(&priced, coupon.as_ref());

    Ok(Json(DataResponse {
        data: CartView {
            items,
            coupon: coupon_view,
            totals,
        },
    }))
}

/// POST /api/v1/cart/items
///
/// Adds to any existing line. The resulting line is clamped at the product's
/// stock (capped at the configured maximum).
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<AddCartItem>,
) -> AppResult<(StatusCode, Json<DataResponse<CartItem>>)> {
    let product = find_active_product(&state.pool, input.product_id).await?;
    let limit = product.orderable_limit(state.config.merge.max_item_quantity);
    let quantity = require_valid_quantity(input.quantity, limit)?;

    let item = CartRepo::add_item(&state.pool, user.user_id, product.id, quantity, limit).await?;
    tracing::info!(
        user_id = user.user_id,
        product_id = product.id,
        quantity = item.quantity,
        "Cart item added"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// PUT /api/v1/cart/items/{product_id}
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<ProductId>,
    Json(input): Json<UpdateCartItem>,
) -> AppResult<Json<DataResponse<CartItem>>> {
    let product = find_active_product(&state.pool, product_id).await?;
    let limit = product.orderable_limit(state.config.merge.max_item_quantity);
    let quantity = require_valid_quantity(input.quantity, limit)?;

    let item = CartRepo::set_quantity(&state.pool, user.user_id, product_id, quantity)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "CartItem",
            id: product_id,
        }))?;

    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/cart/items/{product_id}
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<ProductId>,
) -> AppResult<StatusCode> {
    let deleted = CartRepo::remove_item(&state.pool, user.user_id, product_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "CartItem",
            id: product_id,
        }))
    }
}

/// DELETE /api/v1/cart
pub async fn clear(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    state.cart_store().clear_account_items(user.user_id).await?;
    tracing::info!(user_id = user.user_id, "Cart cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/cart/merge
///
/// Fold the client's guest cart into the account after sign-in. Repeated calls
/// for the same user inside the cooldown window report `skipped`.
pub async fn merge(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<MergeRequest>,
) -> AppResult<Json<DataResponse<MergeResponse>>> {
    let store = state.cart_store();
    let outcome = run_merge(
        state.cart_lock.as_ref(),
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

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

async fn find_active_product(pool: &DbPool, product_id: ProductId) -> AppResult<Product> {
    ProductRepo::find_by_id(pool, product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id: product_id,
        }))
}

/// Look up a coupon code. Unknown or inactive codes yield no discount and are
/// reported back as not applied.
async fn resolve_coupon(
    pool: &DbPool,
    code: Option<&str>,
) -> AppResult<(Option<CouponPricing>, Option<CouponView>)> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok((None, None));
    };

    let coupon = CouponRepo::find_by_code(pool, code).await?;
    let applied = coupon.as_ref().is_some_and(|c| c.is_active);
    if !applied {
        tracing::debug!(code, "Coupon not applied");
    }

    Ok((
        coupon.map(|c| c.pricing()),
        Some(CouponView {
            code: code.to_string(),
            applied,
        }),
    ))
}
