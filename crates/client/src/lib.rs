//! Storecart client library.
//!
//! Holds a shopper's cart in memory, checks requested quantities against a
//! remote stock API, and persists the cart to device-local key-value storage.
//!
//! # Architecture
//!
//! - [`cart::CartStore`] owns the cart and is the only thing that mutates it
//! - [`stock::StockService`] answers stock and product lookups
//!   ([`stock::HttpStockService`] over REST)
//! - [`storage::KeyValueStore`] keeps the cart blob across restarts
//!   ([`storage::MemoryStore`], [`storage::JsonFileStore`])
//! - [`notify::Notifier`] receives user-facing failure messages
//!
//! Collaborators are injected when the store is built; there is no global
//! state.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storecart_client::{CartStore, HttpStockService, JsonFileStore, TracingNotifier};
//!
//! let stock = Arc::new(HttpStockService::new(&config.api)?);
//! let storage = Arc::new(JsonFileStore::open(&config.storage_path).await?);
//! let cart = CartStore::load(stock, storage, Arc::new(TracingNotifier)).await?;
//!
//! cart.add_product(ProductId::new(7)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod notify;
pub mod stock;
pub mod storage;

pub use cart::CartStore;
pub use config::{ClientConfig, ConfigError, StockApiConfig};
pub use error::{CartError, TransientError};
pub use notify::{Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use stock::{HttpStockService, StockError, StockService};
pub use storage::{CART_STORAGE_KEY, JsonFileStore, KeyValueStore, MemoryStore, StorageError};
