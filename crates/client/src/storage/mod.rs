//! Device-local key-value storage for the cart blob.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, for tests and throwaway sessions
//! - [`JsonFileStore`] - one JSON file of key → string, survives restarts
//!
//! The cart only ever touches [`CART_STORAGE_KEY`]; other keys belong to the
//! rest of the application.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Key under which the cart blob is read and written.
pub const CART_STORAGE_KEY: &str = "@storecart:cart";

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage file exists but is not a JSON object of strings.
    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// In-memory map could not be encoded for writing.
    #[error("Failed to encode storage contents: {0}")]
    Serialize(serde_json::Error),

    /// Backend refused the operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable string storage keyed by name.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
}
