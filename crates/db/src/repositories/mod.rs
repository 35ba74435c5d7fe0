//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod cart_repo;
pub mod coupon_repo;
pub mod merge_lock_repo;
pub mod product_repo;
pub mod wishlist_repo;

pub use cart_repo::CartRepo;
pub use coupon_repo::CouponRepo;
pub use merge_lock_repo::MergeLockRepo;
pub use product_repo::ProductRepo;
pub use wishlist_repo::WishlistRepo;
