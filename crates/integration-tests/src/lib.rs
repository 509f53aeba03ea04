//! Integration tests for Storecart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storecart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_store` - Store behavior end to end against fake collaborators
//! - `cart_properties` - Property tests over random operation sequences
//! - `http_stock_service` - REST client against a local stock API
//!
//! This library holds the fakes those tests share.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use storecart_client::{
    CartStore, KeyValueStore, MemoryStore, RecordingNotifier, StockError, StockService,
    StorageError,
};
use storecart_core::{Product, ProductId, StockRecord};

/// Stock service backed by a mutable map of stock levels.
///
/// Unknown products are `NotFound`. Lookups can be made to fail on demand.
#[derive(Default)]
pub struct FakeStock {
    levels: Mutex<HashMap<ProductId, u32>>,
    failing: AtomicBool,
    product_lookups: AtomicUsize,
}

impl FakeStock {
    pub fn with_levels(levels: &[(i32, u32)]) -> Arc<Self> {
        let fake = Self::default();
        for (id, amount) in levels {
            fake.set_stock(*id, *amount);
        }
        Arc::new(fake)
    }

    pub fn set_stock(&self, id: i32, amount: u32) {
        self.levels
            .lock()
            .unwrap()
            .insert(ProductId::new(id), amount);
    }

    /// Make every subsequent lookup fail with an API error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of catalog lookups served.
    pub fn product_lookups(&self) -> usize {
        self.product_lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StockError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StockError::Api {
                status: 503,
                message: "stock service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Catalog entry the fake serves for every known product.
pub fn sample_product(product_id: ProductId) -> Product {
    Product {
        id: product_id,
        title: format!("Sneaker {product_id}"),
        price: Decimal::from_str("139.90").unwrap(),
        image_url: format!("https://example.com/shoes/{product_id}.jpg"),
    }
}

#[async_trait]
impl StockService for FakeStock {
    async fn stock(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
        self.check_available()?;
        let levels = self.levels.lock().unwrap();
        levels
            .get(&product_id)
            .map(|amount| StockRecord::new(product_id, *amount))
            .ok_or_else(|| StockError::NotFound(format!("/stock/{product_id}")))
    }

    async fn product(&self, product_id: ProductId) -> Result<Product, StockError> {
        self.check_available()?;
        if !self.levels.lock().unwrap().contains_key(&product_id) {
            return Err(StockError::NotFound(format!("/products/{product_id}")));
        }
        self.product_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(sample_product(product_id))
    }
}

/// Memory store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        self.inner.set(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A store wired to the given collaborators plus a recording notifier.
pub async fn cart_store(
    stock: Arc<dyn StockService>,
    storage: Arc<dyn KeyValueStore>,
) -> (CartStore, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let store = CartStore::load(stock, storage, notifier.clone())
        .await
        .unwrap();
    (store, notifier)
}

/// Unique path under the system temp dir, in its own directory.
pub fn temp_storage_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("storecart_it_{}", uuid::Uuid::new_v4()))
        .join("storage.json")
}

/// `(id, amount)` pairs of the current cart.
pub fn amounts(store: &CartStore) -> Vec<(i32, u32)> {
    store
        .cart()
        .iter()
        .map(|entry| (entry.id.as_i32(), entry.amount))
        .collect()
}
