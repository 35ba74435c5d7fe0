//! Domain error type shared by the storefront crates.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The merge-lock backend could not be consulted (e.g. the lock table
    /// is unreachable). Distinct from a denied acquisition, which is `Ok(false)`.
    #[error("Merge lock unavailable: {0}")]
    LockUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
