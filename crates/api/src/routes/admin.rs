//! Route definitions for admin merge-lock endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every handler requires the `admin` role.
///
/// ```text
/// GET    /merge-locks/{user_id}       -> lock_status
/// POST   /merge-locks/release-all     -> release_all
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/merge-locks/{user_id}", get(admin::lock_status))
        .route("/merge-locks/release-all", post(admin::release_all))
}
