//! Admin handlers for merge-lock inspection and recovery.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use storefront_core::merge_lock::MergeDomain;
use storefront_core::types::UserId;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Whether a merge is in flight for a user, per domain.
#[derive(Debug, Serialize)]
pub struct MergeLockStatus {
    pub user_id: UserId,
    pub cart: bool,
    pub wishlist: bool,
}

#[derive(Debug, Serialize)]
pub struct ReleasedLocks {
    pub released: Vec<MergeDomain>,
}

/// GET /api/v1/admin/merge-locks/{user_id}
pub async fn lock_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<DataResponse<MergeLockStatus>>> {
    let cart = state.cart_lock.is_locked(user_id).await?;
    let wishlist = state.wishlist_lock.is_locked(user_id).await?;

    Ok(Json(DataResponse {
        data: MergeLockStatus {
            user_id,
            cart,
            wishlist,
        },
    }))
}

/// POST /api/v1/admin/merge-locks/release-all
///
/// Clears every in-flight hold in both domains. Cooldowns already running
/// are left in place.
pub async fn release_all(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ReleasedLocks>>> {
    let mut released = Vec::with_capacity(2);
    for lock in state.merge_locks() {
        lock.release_all().await?;
        released.push(lock.domain());
    }
    tracing::warn!(admin_id = admin.user_id, ?released, "Merge locks force-released");

    Ok(Json(DataResponse {
        data: ReleasedLocks { released },
    }))
}
