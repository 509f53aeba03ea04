//! Core types for Storecart.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{CART_SNAPSHOT_VERSION, CartEntry, CartSnapshot, CartSummary, SnapshotError};
pub use id::*;
pub use price::format_price;
pub use product::{Product, StockRecord};
