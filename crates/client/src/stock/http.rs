//! REST client for the stock API.
//!
//! Uses `reqwest` for HTTP and caches product metadata with `moka`.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use storecart_core::{Product, ProductId, StockRecord};
use tracing::{debug, instrument};
use url::Url;

use super::{StockError, StockService};
use crate::config::StockApiConfig;

/// Client for the stock API.
///
/// Cheaply cloneable; clones share the HTTP connection pool and product
/// cache.
#[derive(Clone)]
pub struct HttpStockService {
    inner: Arc<HttpStockServiceInner>,
}

struct HttpStockServiceInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<ProductId, Product>,
}

impl HttpStockService {
    /// Create a new stock API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StockApiConfig) -> Result<Self, StockError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| StockError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpStockServiceInner {
                client,
                base_url: with_trailing_slash(config.base_url.clone()),
                products,
            }),
        })
    }

    fn endpoint(&self, resource: &str, product_id: ProductId) -> Result<Url, StockError> {
        Ok(self
            .inner
            .base_url
            .join(&format!("{resource}/{product_id}"))?)
    }

    /// Fetch and decode a JSON resource.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, StockError> {
        let response = self.inner.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StockError::NotFound(url.path().to_string()));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                url = %url,
                body = %message.chars().take(500).collect::<String>(),
                "Stock API returned non-success status"
            );
            return Err(StockError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                url = %url,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse stock API response"
            );
            StockError::Parse(e.to_string())
        })
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl StockService for HttpStockService {
    #[instrument(skip(self))]
    async fn stock(&self, product_id: ProductId) -> Result<StockRecord, StockError> {
        let url = self.endpoint("stock", product_id)?;
        let record: StockRecord = self.get_json(url).await?;
        debug!(available = record.amount, "Fetched stock");
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn product(&self, product_id: ProductId) -> Result<Product, StockError> {
        if let Some(product) = self.inner.products.get(&product_id).await {
            debug!("Product cache hit");
            return Ok(product);
        }

        let url = self.endpoint("products", product_id)?;
        let product: Product = self.get_json(url).await?;
        self.inner.products.insert(product_id, product.clone()).await;
        Ok(product)
    }
}
