//! The cart store.
//!
//! [`CartStore`] owns the shopper's cart. Every mutation follows the same
//! steps: check stock, compute the next cart, persist it, then commit it in
//! memory and publish it to subscribers. The next cart is written before it
//! is committed, so a failed write leaves memory and storage agreeing on the
//! previous cart.
//!
//! Mutations hold the store's lock for their whole duration, including the
//! awaits on the stock API and storage, so concurrent callers are serialized.

use std::sync::Arc;

use storecart_core::{CartEntry, CartSnapshot, CartSummary, ProductId, SnapshotError, StockRecord};
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use crate::error::CartError;
use crate::notify::{Notification, Notifier};
use crate::stock::{StockError, StockService};
use crate::storage::{CART_STORAGE_KEY, KeyValueStore, StorageError};

/// Shopping-cart state container.
///
/// Cheaply cloneable; clones share the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    stock: Arc<dyn StockService>,
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    entries: Mutex<Vec<CartEntry>>,
    published: watch::Sender<Vec<CartEntry>>,
}

impl CartStore {
    /// Build a store, restoring the cart persisted in `storage`.
    ///
    /// A missing blob gives an empty cart. So does a blob that cannot be
    /// decoded; that case is logged and the blob is overwritten by the next
    /// successful mutation.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage backend cannot be read.
    #[instrument(skip_all)]
    pub async fn load(
        stock: Arc<dyn StockService>,
        storage: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, StorageError> {
        let entries = match storage.get(CART_STORAGE_KEY).await? {
            Some(blob) => decode_cart(&blob),
            None => Vec::new(),
        };
        debug!(entries = entries.len(), "Cart loaded");

        let (published, _) = watch::channel(entries.clone());

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                stock,
                storage,
                notifier,
                entries: Mutex::new(entries),
                published,
            }),
        })
    }

    /// Current cart entries, in insertion order.
    #[must_use]
    pub fn cart(&self) -> Vec<CartEntry> {
        self.inner.published.borrow().clone()
    }

    /// Current cart with item count and subtotal.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::from_entries(&self.inner.published.borrow())
    }

    /// Total units across all entries.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.summary().item_count
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.published.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observe every committed cart, starting with the current one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartEntry>> {
        self.inner.published.subscribe()
    }

    /// Add one unit of a product.
    ///
    /// A product already in the cart has its amount raised by one; a new
    /// product is fetched from the catalog and appended with amount 1.
    ///
    /// # Errors
    ///
    /// - `CartError::OutOfStock` if the new amount exceeds available stock
    /// - `CartError::Transient` if the stock API or storage fails
    #[instrument(skip(self))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let result = self.try_add(product_id).await;
        self.report(&result, Notification::AddFailed);
        result
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// - `CartError::NotFound` if the product is not in the cart
    /// - `CartError::Transient` if storage fails
    #[instrument(skip(self))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let result = self.try_remove(product_id).await;
        self.report(&result, Notification::RemoveFailed);
        result
    }

    /// Set a product's amount.
    ///
    /// Amounts of zero or below are ignored: the call succeeds without
    /// touching the cart or notifying.
    ///
    /// # Errors
    ///
    /// - `CartError::OutOfStock` if `amount` exceeds available stock
    /// - `CartError::NotFound` if the product is not in the cart
    /// - `CartError::Transient` if the stock API or storage fails
    #[instrument(skip(self))]
    pub async fn update_product_amount(
        &self,
        product_id: ProductId,
        amount: i64,
    ) -> Result<(), CartError> {
        if amount <= 0 {
            debug!("Ignoring non-positive amount");
            return Ok(());
        }

        let result = self.try_update(product_id, amount).await;
        self.report(&result, Notification::UpdateFailed);
        result
    }

    async fn try_add(&self, product_id: ProductId) -> Result<(), CartError> {
        let mut entries = self.inner.entries.lock().await;

        let current = entries
            .iter()
            .find(|entry| entry.id == product_id)
            .map_or(0, |entry| entry.amount);
        let desired = current.saturating_add(1);

        let stock = self.fetch_stock(product_id).await?;
        if !stock.covers(desired) {
            return Err(CartError::OutOfStock {
                product_id,
                requested: u64::from(desired),
                available: stock.amount,
            });
        }

        let mut next = entries.clone();
        if let Some(entry) = next.iter_mut().find(|entry| entry.id == product_id) {
            entry.amount = desired;
        } else {
            let product = self.inner.stock.product(product_id).await?;
            if product.id != product_id {
                return Err(StockError::Parse(format!(
                    "requested product {product_id}, catalog returned {}",
                    product.id
                ))
                .into());
            }
            next.push(CartEntry::from_product(product, 1));
        }

        self.commit(&mut entries, next).await
    }

    async fn try_remove(&self, product_id: ProductId) -> Result<(), CartError> {
        let mut entries = self.inner.entries.lock().await;

        let index = entries
            .iter()
            .position(|entry| entry.id == product_id)
            .ok_or(CartError::NotFound(product_id))?;

        let mut next = entries.clone();
        next.remove(index);

        self.commit(&mut entries, next).await
    }

    async fn try_update(&self, product_id: ProductId, amount: i64) -> Result<(), CartError> {
        let mut entries = self.inner.entries.lock().await;

        let stock = self.fetch_stock(product_id).await?;
        let amount = match u32::try_from(amount) {
            Ok(amount) if stock.covers(amount) => amount,
            _ => {
                return Err(CartError::OutOfStock {
                    product_id,
                    requested: amount.unsigned_abs(),
                    available: stock.amount,
                });
            }
        };

        let mut next = entries.clone();
        let entry = next
            .iter_mut()
            .find(|entry| entry.id == product_id)
            .ok_or(CartError::NotFound(product_id))?;
        entry.amount = amount;

        self.commit(&mut entries, next).await
    }

    /// Stock level for `product_id`, rejecting records that describe another product.
    async fn fetch_stock(&self, product_id: ProductId) -> Result<StockRecord, CartError> {
        let stock = self.inner.stock.stock(product_id).await?;
        match stock.product_id {
            Some(id) if id != product_id => Err(StockError::Parse(format!(
                "requested stock for product {product_id}, API returned {id}"
            ))
            .into()),
            _ => Ok(stock),
        }
    }

    /// Persist `next`, then make it the current cart and publish it.
    async fn commit(
        &self,
        entries: &mut Vec<CartEntry>,
        next: Vec<CartEntry>,
    ) -> Result<(), CartError> {
        let snapshot = CartSnapshot::new(next);
        let blob = snapshot.to_json()?;
        self.inner.storage.set(CART_STORAGE_KEY, blob).await?;

        *entries = snapshot.entries;
        self.inner.published.send_replace(entries.clone());
        debug!(entries = entries.len(), "Cart committed");
        Ok(())
    }

    fn report(&self, result: &Result<(), CartError>, failure: Notification) {
        let Err(err) = result else {
            return;
        };

        let notification = match err {
            CartError::OutOfStock { .. } => Notification::OutOfStock,
            CartError::NotFound(_) => failure,
            CartError::Transient(_) => {
                tracing::error!(error = %err, "Cart operation failed");
                failure
            }
        };
        self.inner.notifier.notify(notification);
    }
}

/// Decode a persisted cart, falling back to empty on anything unreadable.
fn decode_cart(blob: &str) -> Vec<CartEntry> {
    match CartSnapshot::from_json(blob) {
        Ok(snapshot) => {
            let (entries, dropped) = snapshot.into_valid_entries();
            if dropped > 0 {
                warn!(dropped, "Dropped invalid entries from persisted cart");
            }
            entries
        }
        Err(SnapshotError::UnsupportedVersion { found, supported }) => {
            warn!(found, supported, "Persisted cart is from a newer client; starting empty");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Persisted cart is unreadable; starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use storecart_core::{Product, StockRecord};

    use super::*;
    use crate::error::TransientError;
    use crate::notify::RecordingNotifier;
    use crate::storage::MemoryStore;

    struct FixedStock {
        levels: HashMap<i32, u32>,
    }

    impl FixedStock {
        fn new(levels: &[(i32, u32)]) -> Arc<Self> {
            Arc::new(Self {
                levels: levels.iter().copied().collect(),
            })
        }
    }

    #[async_trait]
    impl StockService for FixedStock {
        async fn stock(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
            self.levels
                .get(&product_id.as_i32())
                .map(|amount| StockRecord::new(product_id, *amount))
                .ok_or_else(|| StockError::NotFound(format!("/stock/{product_id}")))
        }

        async fn product(&self, product_id: ProductId) -> Result<Product, StockError> {
            Ok(Product {
                id: product_id,
                title: format!("Sneaker {product_id}"),
                price: Decimal::from_str("139.90").unwrap(),
                image_url: format!("https://example.com/{product_id}.jpg"),
            })
        }
    }

    /// Answers every stock query with the record of the next product id.
    struct MislabeledStock;

    #[async_trait]
    impl StockService for MislabeledStock {
        async fn stock(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
            Ok(StockRecord::new(ProductId::new(product_id.as_i32() + 1), 5))
        }

        async fn product(&self, product_id: ProductId) -> Result<Product, StockError> {
            FixedStock::new(&[]).product(product_id).await
        }
    }

    async fn store_with(
        levels: &[(i32, u32)],
    ) -> (CartStore, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let storage = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let store = CartStore::load(FixedStock::new(levels), storage.clone(), notifier.clone())
            .await
            .unwrap();
        (store, storage, notifier)
    }

    fn amounts(store: &CartStore) -> Vec<(i32, u32)> {
        store
            .cart()
            .iter()
            .map(|entry| (entry.id.as_i32(), entry.amount))
            .collect()
    }

    #[tokio::test]
    async fn add_appends_new_product_with_amount_one() {
        let (store, _, notifier) = store_with(&[(1, 5)]).await;

        store.add_product(ProductId::new(1)).await.unwrap();

        let cart = store.cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].amount, 1);
        assert_eq!(cart[0].title, "Sneaker 1");
        assert!(notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn add_increments_existing_product() {
        let (store, _, _) = store_with(&[(1, 5), (2, 5)]).await;

        store.add_product(ProductId::new(1)).await.unwrap();
        store.add_product(ProductId::new(2)).await.unwrap();
        store.add_product(ProductId::new(1)).await.unwrap();

        assert_eq!(amounts(&store), vec![(1, 2), (2, 1)]);
    }

    #[tokio::test]
    async fn add_beyond_stock_is_rejected() {
        let (store, _, notifier) = store_with(&[(7, 1)]).await;

        store.add_product(ProductId::new(7)).await.unwrap();
        let err = store.add_product(ProductId::new(7)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::OutOfStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(amounts(&store), vec![(7, 1)]);
        assert_eq!(notifier.notifications(), vec![Notification::OutOfStock]);
    }

    #[tokio::test]
    async fn add_with_zero_stock_never_appends() {
        let (store, storage, notifier) = store_with(&[(3, 0)]).await;

        assert!(store.add_product(ProductId::new(3)).await.is_err());
        assert!(store.is_empty());
        assert_eq!(storage.get(CART_STORAGE_KEY).await.unwrap(), None);
        assert_eq!(notifier.notifications(), vec![Notification::OutOfStock]);
    }

    #[tokio::test]
    async fn add_unknown_product_reports_add_failure() {
        let (store, _, notifier) = store_with(&[]).await;

        let err = store.add_product(ProductId::new(99)).await.unwrap_err();

        assert!(matches!(
            err,
            CartError::Transient(TransientError::Stock(StockError::NotFound(_)))
        ));
        assert!(store.is_empty());
        assert_eq!(notifier.notifications(), vec![Notification::AddFailed]);
    }

    #[tokio::test]
    async fn stock_record_for_another_product_is_rejected() {
        let blob = CartSnapshot::new(vec![CartEntry {
            id: ProductId::new(1),
            title: "Sneaker 1".to_string(),
            price: Decimal::from_str("139.90").unwrap(),
            image_url: "https://example.com/1.jpg".to_string(),
            amount: 1,
        }])
        .to_json()
        .unwrap();
        let storage = Arc::new(MemoryStore::with_value(CART_STORAGE_KEY, blob));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = CartStore::load(Arc::new(MislabeledStock), storage, notifier.clone())
            .await
            .unwrap();

        let add = store.add_product(ProductId::new(2)).await.unwrap_err();
        let update = store
            .update_product_amount(ProductId::new(1), 3)
            .await
            .unwrap_err();

        for err in [add, update] {
            assert!(matches!(
                err,
                CartError::Transient(TransientError::Stock(StockError::Parse(_)))
            ));
        }
        assert_eq!(amounts(&store), vec![(1, 1)]);
        assert_eq!(
            notifier.notifications(),
            vec![Notification::AddFailed, Notification::UpdateFailed]
        );
    }

    #[tokio::test]
    async fn remove_existing_product() {
        let (store, storage, _) = store_with(&[(1, 5), (2, 5)]).await;
        store.add_product(ProductId::new(1)).await.unwrap();
        store.add_product(ProductId::new(2)).await.unwrap();

        store.remove_product(ProductId::new(1)).await.unwrap();

        assert_eq!(amounts(&store), vec![(2, 1)]);
        let blob = storage.get(CART_STORAGE_KEY).await.unwrap().unwrap();
        let persisted = CartSnapshot::from_json(&blob).unwrap();
        assert_eq!(persisted.entries, store.cart());
    }

    #[tokio::test]
    async fn remove_missing_product_reports_remove_failure() {
        let (store, _, notifier) = store_with(&[(1, 5)]).await;
        store.add_product(ProductId::new(1)).await.unwrap();

        let err = store.remove_product(ProductId::new(2)).await.unwrap_err();

        assert!(matches!(err, CartError::NotFound(id) if id == ProductId::new(2)));
        assert_eq!(amounts(&store), vec![(1, 1)]);
        assert_eq!(notifier.notifications(), vec![Notification::RemoveFailed]);
    }

    #[tokio::test]
    async fn update_sets_exact_amount() {
        let (store, _, _) = store_with(&[(1, 5)]).await;
        store.add_product(ProductId::new(1)).await.unwrap();

        store.update_product_amount(ProductId::new(1), 4).await.unwrap();

        assert_eq!(amounts(&store), vec![(1, 4)]);
    }

    #[tokio::test]
    async fn update_non_positive_is_silent_noop() {
        let (store, _, notifier) = store_with(&[(1, 5)]).await;
        store.add_product(ProductId::new(1)).await.unwrap();

        store.update_product_amount(ProductId::new(1), 0).await.unwrap();
        store.update_product_amount(ProductId::new(1), -3).await.unwrap();
        store.update_product_amount(ProductId::new(42), 0).await.unwrap();

        assert_eq!(amounts(&store), vec![(1, 1)]);
        assert!(notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn update_beyond_stock_is_rejected() {
        let (store, _, notifier) = store_with(&[(1, 5)]).await;
        store.add_product(ProductId::new(1)).await.unwrap();

        let err = store
            .update_product_amount(ProductId::new(1), 6)
            .await
            .unwrap_err();

        assert!(err.is_out_of_stock());
        assert_eq!(amounts(&store), vec![(1, 1)]);
        assert_eq!(notifier.notifications(), vec![Notification::OutOfStock]);
    }

    #[tokio::test]
    async fn update_amount_larger_than_u32_is_out_of_stock() {
        let (store, _, _) = store_with(&[(1, 5)]).await;
        store.add_product(ProductId::new(1)).await.unwrap();

        let err = store
            .update_product_amount(ProductId::new(1), i64::from(u32::MAX) + 1)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::OutOfStock { requested, .. } if requested == u64::from(u32::MAX) + 1));
    }

    #[tokio::test]
    async fn update_missing_product_reports_update_failure() {
        let (store, _, notifier) = store_with(&[(1, 5), (2, 5)]).await;
        store.add_product(ProductId::new(1)).await.unwrap();

        let err = store
            .update_product_amount(ProductId::new(2), 2)
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::NotFound(_)));
        assert_eq!(notifier.notifications(), vec![Notification::UpdateFailed]);
    }

    #[tokio::test]
    async fn subscribers_see_committed_carts() {
        let (store, _, _) = store_with(&[(1, 5)]).await;
        let mut rx = store.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        store.add_product(ProductId::new(1)).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].amount, 1);

        // Rejected operations publish nothing.
        let _ = store.update_product_amount(ProductId::new(1), 10).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn decode_cart_falls_back_to_empty() {
        assert!(decode_cart("garbage").is_empty());
        assert!(decode_cart(r#"{"version":99,"entries":[]}"#).is_empty());
    }
}
