//! Cart entries and the persisted cart blob.
//!
//! # Persistence format
//!
//! A cart is stored as a versioned JSON envelope:
//!
//! ```json
//! {"version":1,"entries":[{"id":7,"title":"Sneaker","price":"139.90","imageUrl":"https://…","amount":2}]}
//! ```
//!
//! Older clients wrote a bare array of entries with an `image` field. That
//! form still loads and is rewritten as an envelope on the next save.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::format_price;
use super::product::Product;

/// Current version of the persisted cart envelope.
pub const CART_SNAPSHOT_VERSION: u32 = 1;

/// One product's presence in the cart plus its desired quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    #[serde(alias = "image")]
    pub image_url: String,
    /// Desired quantity, always at least 1 inside a cart.
    pub amount: u32,
}

impl CartEntry {
    /// Build an entry from catalog metadata.
    #[must_use]
    pub fn from_product(product: Product, amount: u32) -> Self {
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            image_url: product.image_url,
            amount,
        }
    }

    /// Price multiplied by the desired quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.amount)
    }
}

/// Errors decoding a persisted cart.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The blob is not a cart in any known format.
    #[error("Invalid cart blob: {0}")]
    Parse(#[from] serde_json::Error),

    /// The blob was written by a newer client.
    #[error("Unsupported cart version {found} (supported up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Versioned persistence envelope for a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub version: u32,
    pub entries: Vec<CartEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCart {
    Versioned(CartSnapshot),
    Legacy(Vec<CartEntry>),
}

impl CartSnapshot {
    /// Wrap entries in an envelope at the current version.
    #[must_use]
    pub const fn new(entries: Vec<CartEntry>) -> Self {
        Self {
            version: CART_SNAPSHOT_VERSION,
            entries,
        }
    }

    /// Serialize the envelope to its JSON blob.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a persisted blob, accepting the legacy bare-array format.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::Parse` for malformed blobs and
    /// `SnapshotError::UnsupportedVersion` for envelopes newer than this client.
    pub fn from_json(blob: &str) -> Result<Self, SnapshotError> {
        match serde_json::from_str::<StoredCart>(blob)? {
            StoredCart::Versioned(snapshot) if snapshot.version > CART_SNAPSHOT_VERSION => {
                Err(SnapshotError::UnsupportedVersion {
                    found: snapshot.version,
                    supported: CART_SNAPSHOT_VERSION,
                })
            }
            StoredCart::Versioned(snapshot) => Ok(Self::new(snapshot.entries)),
            StoredCart::Legacy(entries) => Ok(Self::new(entries)),
        }
    }

    /// Consume the envelope, keeping only entries a cart may hold.
    ///
    /// Drops entries with a zero amount and any repeated product ID (the
    /// first occurrence wins). Returns the kept entries and how many were
    /// dropped.
    #[must_use]
    pub fn into_valid_entries(self) -> (Vec<CartEntry>, usize) {
        let total = self.entries.len();
        let mut seen = HashSet::with_capacity(total);
        let entries: Vec<CartEntry> = self
            .entries
            .into_iter()
            .filter(|entry| entry.amount > 0 && seen.insert(entry.id))
            .collect();
        let dropped = total - entries.len();
        (entries, dropped)
    }
}

/// Derived totals for displaying a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub entries: Vec<CartEntry>,
    /// Sum of all entry amounts (the cart badge count).
    pub item_count: u32,
    pub subtotal: Decimal,
}

impl CartSummary {
    /// Compute totals for a list of entries.
    #[must_use]
    pub fn from_entries(entries: &[CartEntry]) -> Self {
        let item_count = entries
            .iter()
            .fold(0u32, |count, entry| count.saturating_add(entry.amount));
        let subtotal = entries.iter().map(CartEntry::line_total).sum();

        Self {
            entries: entries.to_vec(),
            item_count,
            subtotal,
        }
    }

    /// Subtotal formatted for display.
    #[must_use]
    pub fn formatted_subtotal(&self) -> String {
        format_price(self.subtotal)
    }
}
