pub mod admin;
pub mod cart;
pub mod merge;
pub mod wishlist;
