//! Storecart Core - Shared types library.
//!
//! This crate provides the domain types used across all Storecart components:
//! - `client` - Cart store, stock service client and local storage backends
//! - `cli` - Command-line front end for inspecting and editing a cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage access. Serialization of the persisted cart blob lives
//! here because it is a pure transformation of these types.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, products, stock records and cart entries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
