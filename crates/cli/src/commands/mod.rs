//! Cart commands.
//!
//! # Environment Variables
//!
//! - `STORECART_API_URL` - Stock API base URL
//! - `STORECART_STORAGE_PATH` - Where the cart is persisted

use std::fmt::Write as _;
use std::sync::Arc;

use storecart_client::{
    CartError, CartStore, ClientConfig, ConfigError, HttpStockService, JsonFileStore,
    StockError, StorageError, TracingNotifier,
};
use storecart_core::{CartSummary, ProductId, format_price};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stock API client could not be built.
    #[error("Stock service error: {0}")]
    Stock(#[from] StockError),

    /// Storage file could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart operation was rejected or failed.
    #[error("{0}")]
    Cart(#[from] CartError),
}

/// Build a cart store from configuration.
pub async fn open_store(config: &ClientConfig) -> Result<CartStore, CliError> {
    let stock = Arc::new(HttpStockService::new(&config.api)?);
    let storage = Arc::new(JsonFileStore::open(&config.storage_path).await?);
    tracing::debug!(path = %storage.path().display(), "Opened cart storage");

    Ok(CartStore::load(stock, storage, Arc::new(TracingNotifier)).await?)
}

pub async fn add(store: &CartStore, id: i32) -> Result<(), CliError> {
    store.add_product(ProductId::new(id)).await?;
    tracing::info!("Added product {id}");
    Ok(())
}

pub async fn remove(store: &CartStore, id: i32) -> Result<(), CliError> {
    store.remove_product(ProductId::new(id)).await?;
    tracing::info!("Removed product {id}");
    Ok(())
}

pub async fn update(store: &CartStore, id: i32, amount: i64) -> Result<(), CliError> {
    store
        .update_product_amount(ProductId::new(id), amount)
        .await?;
    tracing::info!("Product {id} amount set to {amount}");
    Ok(())
}

/// Render a cart as a plain-text table.
pub fn render_summary(summary: &CartSummary) -> String {
    if summary.entries.is_empty() {
        return "Cart is empty\n".to_string();
    }

    let mut out = String::new();
    for entry in &summary.entries {
        let _ = writeln!(
            out,
            "#{:<6} {:>3} x {:<40} {:>10} {:>10}",
            entry.id.as_i32(),
            entry.amount,
            entry.title,
            format_price(entry.price),
            format_price(entry.line_total()),
        );
    }
    let _ = writeln!(
        out,
        "Items: {}  Subtotal: {}",
        summary.item_count,
        summary.formatted_subtotal()
    );
    out
}

pub fn print_summary(summary: &CartSummary) {
    #[allow(clippy::print_stdout)]
    {
        print!("{}", render_summary(summary));
    }
}
