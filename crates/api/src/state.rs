use std::sync::Arc;

use storefront_core::merge_lock::{InMemoryMergeLock, MergeDomain, MergeLock};
use storefront_db::merge_lock::PgMergeLock;
use storefront_db::store::{PgCartStore, PgWishlistStore};

use crate::config::{LockBackend, ServerConfig};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: storefront_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Admission lock for guest cart merges.
    pub cart_lock: Arc<dyn MergeLock>,
    /// Admission lock for guest wishlist merges.
    pub wishlist_lock: Arc<dyn MergeLock>,
}

impl AppState {
    /// Build state with one merge lock per domain on the configured backend.
    pub fn new(pool: storefront_db::DbPool, config: ServerConfig) -> Self {
        let settings = config.merge.lock;
        let (cart_lock, wishlist_lock): (Arc<dyn MergeLock>, Arc<dyn MergeLock>) =
            match config.merge.backend {
                LockBackend::Memory => (
                    Arc::new(InMemoryMergeLock::with_config(MergeDomain::Cart, settings)),
                    Arc::new(InMemoryMergeLock::with_config(MergeDomain::Wishlist, settings)),
                ),
                LockBackend::Postgres => (
                    Arc::new(PgMergeLock::with_config(pool.clone(), MergeDomain::Cart, settings)),
                    Arc::new(PgMergeLock::with_config(
                        pool.clone(),
                        MergeDomain::Wishlist,
                        settings,
                    )),
                ),
            };

        Self {
            pool,
            config: Arc::new(config),
            cart_lock,
            wishlist_lock,
        }
    }

    pub fn cart_store(&self) -> PgCartStore {
        PgCartStore::new(self.pool.clone(), self.config.merge.max_item_quantity)
    }

    pub fn wishlist_store(&self) -> PgWishlistStore {
        PgWishlistStore::new(self.pool.clone())
    }

    /// Both locks, for admin endpoints that act on every domain.
    pub fn merge_locks(&self) -> [&Arc<dyn MergeLock>; 2] {
        [&self.cart_lock, &self.wishlist_lock]
    }
}
