//! Content-addressed memoization for geocoding lookups.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::geocode::provider::{GeocodeCandidate, GeocodeProvider, GeocodeQuery};

/// Bumped whenever the key encoding or stored value format changes.
pub const CACHE_KEY_VERSION: u32 = 1;

/// Byte store addressed by hex keys.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` on a miss.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Files under a root directory, sharded by the first two key characters.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache directory: {}", root.display()))?;
        Ok(Self { root })
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.len() < 3 || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow!("Invalid cache key: {key}"));
        }
        Ok(self.root.join(&key[..2]).join(format!("{key}.json")))
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read cache entry: {}", path.display())),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let shard = path
            .parent()
            .ok_or_else(|| anyhow!("Cache entry has no parent: {}", path.display()))?;
        fs::create_dir_all(shard)
            .with_context(|| format!("Failed to create cache shard: {}", shard.display()))?;

        let mut tmp = NamedTempFile::new_in(shard).context("Failed to create temp cache file")?;
        tmp.write_all(value)
            .context("Failed to write temp cache file")?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist cache entry: {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// Returns true when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[derive(Serialize)]
struct KeyMaterial<'a> {
    version: u32,
    query: &'a GeocodeQuery,
}

/// Stable SHA-256 hex key for the normalised form of `query`.
pub fn cache_key(query: &GeocodeQuery) -> Result<String> {
    let normalized = query.normalized();
    let material = serde_json::to_vec(&KeyMaterial {
        version: CACHE_KEY_VERSION,
        query: &normalized,
    })
    .context("Failed to encode cache key")?;
    Ok(format!("{:x}", Sha256::digest(&material)))
}

/// Hit and miss counters for a [`CachedGeocoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups answered from the store.
    pub hits: usize,
    /// Lookups forwarded to the provider.
    pub misses: usize,
}

/// Provider wrapper that consults a store before calling through.
pub struct CachedGeocoder<P, S> {
    provider: P,
    store: S,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<P: GeocodeProvider, S: KeyValueStore> CachedGeocoder<P, S> {
    /// Wraps `provider` with `store`.
    pub fn new(provider: P, store: S) -> Self {
        Self {
            provider,
            store,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Returns hit and miss counts so far.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Returns the wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn cached(&self, key: &str) -> Result<Option<Vec<GeocodeCandidate>>> {
        let Some(bytes) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(candidates) => Ok(Some(candidates)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }
}

impl<P: GeocodeProvider, S: KeyValueStore> GeocodeProvider for CachedGeocoder<P, S> {
    fn geocode<'a>(
        &'a self,
        query: &'a GeocodeQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<GeocodeCandidate>>> + Send + 'a>> {
        Box::pin(async move {
            let key = cache_key(query)?;
            if let Some(candidates) = self.cached(&key)? {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Geocode cache hit");
                return Ok(candidates);
            }

            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Geocode cache miss");
            let candidates = self.provider.geocode(query).await?;

            let bytes =
                serde_json::to_vec(&candidates).context("Failed to encode geocode result")?;
            self.store.put(&key, &bytes)?;
            Ok(candidates)
        })
    }
}
