//! Cart operation errors.
//!
//! Every store operation returns `Result<_, CartError>`. The same failure is
//! also reported to the store's [`Notifier`](crate::notify::Notifier), so UI
//! code can rely on either channel.

use storecart_core::ProductId;
use thiserror::Error;

use crate::stock::StockError;
use crate::storage::StorageError;

/// Why a cart operation did not change the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity exceeds available stock.
    #[error("Product {product_id} out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: u64,
        available: u32,
    },

    /// Product is not in the cart.
    #[error("Product {0} is not in the cart")]
    NotFound(ProductId),

    /// A stock lookup or storage write failed.
    #[error(transparent)]
    Transient(#[from] TransientError),
}

/// Failures of the store's collaborators.
#[derive(Debug, Error)]
pub enum TransientError {
    /// Stock API request failed.
    #[error("Stock service error: {0}")]
    Stock(#[from] StockError),

    /// Reading or writing the cart blob failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StockError> for CartError {
    fn from(err: StockError) -> Self {
        Self::Transient(err.into())
    }
}

impl From<StorageError> for CartError {
    fn from(err: StorageError) -> Self {
        Self::Transient(err.into())
    }
}

impl From<serde_json::Error> for CartError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transient(err.into())
    }
}

impl CartError {
    /// Whether this is an out-of-stock rejection.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        matches!(self, Self::OutOfStock { .. })
    }
}
