//! In-memory cache store - used as fallback when Redis is unavailable.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use dixis_core::ports::{CacheError, CacheStore, StoreCapabilities, StoreInfo};

use super::pattern::glob_match;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// Writes between expiry sweeps never drop below this.
const MIN_SWEEP_INTERVAL: usize = 64;

fn purge_expired(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before - entries.len()
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    commands: AtomicU64,
}

/// In-memory store using a HashMap behind an async RwLock.
///
/// Supports pattern scans, tags, flush and hit/miss counters. Capabilities can
/// be narrowed to mimic a plainer backend.
/// Note: Data is lost on process restart and is not shared between instances.
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    tags: RwLock<HashMap<String, HashSet<String>>>,
    counters: Counters,
    capabilities: StoreCapabilities,
    writes_since_sweep: AtomicUsize,
    sweep_after: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_capabilities(StoreCapabilities::all())
    }

    pub fn with_capabilities(capabilities: StoreCapabilities) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            tags: RwLock::new(HashMap::new()),
            counters: Counters::default(),
            capabilities,
            writes_since_sweep: AtomicUsize::new(0),
            sweep_after: AtomicUsize::new(MIN_SWEEP_INTERVAL),
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn command(&self) {
        self.counters.commands.fetch_add(1, Ordering::Relaxed);
    }

    /// Expired entries are only dropped lazily by `get`, so writes purge
    /// them too, once per as many writes as there were live entries after
    /// the previous sweep.
    async fn insert(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|d| now + d),
            },
        );

        let writes = self.writes_since_sweep.fetch_add(1, Ordering::Relaxed) + 1;
        if writes >= self.sweep_after.load(Ordering::Relaxed) {
            let removed = purge_expired(&mut entries, now);
            self.writes_since_sweep.store(0, Ordering::Relaxed);
            self.sweep_after
                .store(entries.len().max(MIN_SWEEP_INTERVAL), Ordering::Relaxed);
            tracing::trace!(removed, live = entries.len(), "Expired entries swept");
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    fn driver(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.command();
        let now = Instant::now();

        let lookup = {
            let entries = self.entries.read().await;
            entries
                .get(key)
                .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()))
        };

        let value = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                // Clean up expired entry with write lock, unless it was replaced meanwhile
                let mut entries = self.entries.write().await;
                if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
                    entries.remove(key);
                }
                None
            }
            None => None,
        };

        let counter = if value.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);

        value
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.command();
        self.insert(key, value, ttl).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.command();
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        self.command();
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        self.command();
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        if !self.capabilities.pattern_scan {
            return Err(CacheError::Unsupported("pattern scan"));
        }
        self.command();
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn set_tagged(
        &self,
        tags: &[String],
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        if !self.capabilities.tags {
            return Err(CacheError::Unsupported("tags"));
        }
        self.command();
        self.insert(key, value, ttl).await;

        let mut groups = self.tags.write().await;
        for tag in tags {
            groups.entry(tag.clone()).or_default().insert(key.to_string());
        }
        Ok(())
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<(), CacheError> {
        if !self.capabilities.tags {
            return Err(CacheError::Unsupported("tags"));
        }
        self.command();

        let members: HashSet<String> = {
            let mut groups = self.tags.write().await;
            tags.iter()
                .filter_map(|tag| groups.remove(tag))
                .flatten()
                .collect()
        };

        let mut entries = self.entries.write().await;
        for key in &members {
            entries.remove(key);
        }
        tracing::debug!(?tags, removed = members.len(), "Tagged entries flushed");
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        if !self.capabilities.flush {
            return Err(CacheError::Unsupported("flush"));
        }
        self.command();
        self.entries.write().await.clear();
        self.tags.write().await.clear();
        Ok(())
    }

    async fn info(&self) -> Result<StoreInfo, CacheError> {
        if !self.capabilities.info {
            return Err(CacheError::Unsupported("info"));
        }

        let used_bytes: usize = {
            let mut entries = self.entries.write().await;
            purge_expired(&mut entries, Instant::now());
            entries
                .iter()
                .map(|(key, entry)| key.len() + entry.value.len())
                .sum()
        };

        Ok(StoreInfo {
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            used_memory: Some(human_bytes(used_bytes)),
            connected_clients: None,
            total_commands_processed: Some(self.counters.commands.load(Ordering::Relaxed)),
            keyspace_hits: Some(self.counters.hits.load(Ordering::Relaxed)),
            keyspace_misses: Some(self.counters.misses.load(Ordering::Relaxed)),
        })
    }
}

/// Format a byte count the way Redis reports `used_memory_human`.
fn human_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];

    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut size = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{size:.2}{unit}")
}
