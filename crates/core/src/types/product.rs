//! Product catalog and stock records as served by the stock API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Product metadata from `GET /products/{id}`.
///
/// The API names the image field `image`; `imageUrl` is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    #[serde(alias = "image")]
    pub image_url: String,
}

/// Available stock from `GET /stock/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Product this record describes. Older stock payloads omit it.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    /// Units available for purchase.
    pub amount: u32,
}

impl StockRecord {
    /// Create a stock record for a product.
    #[must_use]
    pub const fn new(product_id: ProductId, amount: u32) -> Self {
        Self {
            product_id: Some(product_id),
            amount,
        }
    }

    /// Whether `requested` units can be satisfied.
    #[must_use]
    pub const fn covers(&self, requested: u32) -> bool {
        requested <= self.amount
    }
}
