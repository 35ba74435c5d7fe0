//! Storefront domain logic.
//!
//! Pure pricing math, quantity validation and the guest-to-account merge
//! machinery. Has no database dependency; persistence is reached through the
//! [`merge::ItemStore`] and [`merge_lock::MergeLock`] traits.

pub mod error;
pub mod merge;
pub mod merge_lock;
pub mod pricing;
pub mod roles;
pub mod types;
