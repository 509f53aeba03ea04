//! Stock and product lookups against the remote stock API.
//!
//! # Endpoints
//!
//! - `GET /stock/{id}` → `{ "id": 1, "amount": 3 }`
//! - `GET /products/{id}` → `{ "id": 1, "title": "…", "price": 179.9, "image": "…" }`
//!
//! Product metadata is cached in memory; stock levels are always fetched
//! fresh since they drive the out-of-stock decision.

mod http;

pub use http::HttpStockService;

use async_trait::async_trait;
use storecart_core::{Product, ProductId, StockRecord};
use thiserror::Error;

/// Errors that can occur when querying the stock API.
#[derive(Debug, Error)]
pub enum StockError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Read-only view of stock levels and the product catalog.
#[async_trait]
pub trait StockService: Send + Sync {
    /// Units currently available for `product_id`.
    async fn stock(&self, product_id: ProductId) -> Result<StockRecord, StockError>;

    /// Catalog metadata for `product_id`.
    async fn product(&self, product_id: ProductId) -> Result<Product, StockError>;
}
