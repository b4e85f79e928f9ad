//! Response cache
//!
//! Memoizes upstream responses and aggregate results as JSON, keyed by
//! `(prefix, suffix, from, to)`. The stored entry itself is the only
//! record of what is cached; there is no index and no expiry. Callers put
//! the exact date range in the key so different ranges never mix.

use async_trait::async_trait;
use inb4_common::DateRange;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache entry {location}: {source}")]
    Corrupt {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot encode cache entry {location}: {source}")]
    Encode {
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Identity of one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub prefix: String,
    pub suffix: String,
    pub from: i64,
    pub to: i64,
}

impl CacheKey {
    pub fn new(prefix: impl Into<String>, suffix: impl ToString, range: &DateRange) -> Self {
        Self::from_parts(prefix, suffix, range.from_ts(), range.to_ts())
    }

    pub fn from_parts(prefix: impl Into<String>, suffix: impl ToString, from: i64, to: i64) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.to_string(),
            from,
            to,
        }
    }

    /// `<prefix>-<from>-<to>-<suffix>.json`
    ///
    /// Prefix and suffix are escaped so they never contain `-` or a path
    /// separator, which keeps distinct keys on distinct names.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}.json",
            escape_component(&self.prefix),
            self.from,
            self.to,
            escape_component(&self.suffix)
        )
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9._]`
fn escape_component(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'_' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{:02X}", byte));
        }
    }
    escaped
}

/// Byte-level storage behind [`ResponseCache`]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn contains(&self, key: &CacheKey) -> bool;

    /// `Ok(None)` when there is no entry
    async fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Replaces any existing entry
    async fn store(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError>;

    /// Human readable location of an entry (file path for disk stores)
    fn location(&self, key: &CacheKey) -> String;
}

/// One JSON file per key in a directory
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    fn io_error(&self, key: &CacheKey, source: std::io::Error) -> CacheError {
        CacheError::Io {
            location: self.location(key),
            source,
        }
    }
}

#[async_trait]
impl CacheStore for FsCache {
    async fn contains(&self, key: &CacheKey) -> bool {
        tokio::fs::try_exists(self.path(key)).await.unwrap_or(false)
    }

    async fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(key, e)),
        }
    }

    /// Written to a temporary file first and renamed into place, so an
    /// entry that exists is always complete
    async fn store(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError> {
        let path = self.path(key);
        let tmp_path = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.io_error(key, e))?;
        tokio::fs::write(&tmp_path, data)
            .await
            .map_err(|e| self.io_error(key, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| self.io_error(key, e))?;

        Ok(())
    }

    fn location(&self, key: &CacheKey) -> String {
        self.path(key).display().to_string()
    }
}

/// Process-local store, lost on exit
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().await.contains_key(key)
    }

    async fn load(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn store(&self, key: &CacheKey, data: &[u8]) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.clone(), data.to_vec());
        Ok(())
    }

    fn location(&self, key: &CacheKey) -> String {
        format!("memory:{}", key.file_name())
    }
}

/// Typed JSON cache over a [`CacheStore`]
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsCache::new(dir)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    pub fn location(&self, key: &CacheKey) -> String {
        self.store.location(key)
    }

    pub async fn has(&self, key: &CacheKey) -> bool {
        self.store.contains(key).await
    }

    /// `Ok(None)` when absent; [`CacheError::Corrupt`] when present but
    /// undecodable. Corrupt entries are left in place.
    pub async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        let Some(bytes) = self.store.load(key).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                location: self.location(key),
                source,
            })
    }

    pub async fn write<T: Serialize + ?Sized>(&self, key: &CacheKey, data: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(data).map_err(|source| CacheError::Encode {
            location: self.location(key),
            source,
        })?;

        tracing::debug!(location = %self.location(key), "Writing cache entry");
        self.store.store(key, &bytes).await
    }
}
