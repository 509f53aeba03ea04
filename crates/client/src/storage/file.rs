use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use tracing::debug;

use super::{KeyValueStore, StorageError};

/// File-backed key-value store.
///
/// Keeps a map of `key -> value` persisted as a single JSON object. Every
/// write replaces the file through a temporary sibling and a rename, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    inner: RwLock<HashMap<String, String>>,
    file_path: PathBuf,
    tmp_path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, creating the file (and parent directories)
    /// with an empty map if missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read or created, and
    /// `StorageError::Corrupt` if it exists but does not hold a JSON object
    /// of strings.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let file_path = path.as_ref().to_path_buf();
        let mut tmp_path = file_path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let map = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = HashMap::new();
                write_atomic(&file_path, &tmp_path, &empty).await?;
                debug!(path = %file_path.display(), "Created storage file");
                empty
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            inner: RwLock::new(map),
            file_path,
            tmp_path,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

async fn write_atomic(
    file_path: &Path,
    tmp_path: &Path,
    map: &HashMap<String, String>,
) -> Result<(), StorageError> {
    let data = serde_json::to_vec(map).map_err(StorageError::Serialize)?;
    fs::write(tmp_path, data).await?;
    fs::rename(tmp_path, file_path).await?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let map = self.inner.read().await;
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        next.insert(key.to_string(), value);

        // Only a completed write reaches the in-memory map.
        write_atomic(&self.file_path, &self.tmp_path, &next).await?;
        *map = next;

        debug!(key, path = %self.file_path.display(), "Storage file written");
        Ok(())
    }
}
