use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Optional features a backing store may offer.
///
/// Resolved once when the facade is built; operations that depend on a
/// missing capability degrade instead of failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCapabilities {
    /// Enumerate keys by glob pattern.
    pub pattern_scan: bool,
    /// Group keys under tags and flush them together.
    pub tags: bool,
    /// Drop the entire keyspace.
    pub flush: bool,
    /// Report version, memory and hit/miss counters.
    pub info: bool,
}

impl StoreCapabilities {
    pub fn all() -> Self {
        Self {
            pattern_scan: true,
            tags: true,
            flush: true,
            info: true,
        }
    }
}

/// Store metadata, each field only when the store reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreInfo {
    pub version: Option<String>,
    pub used_memory: Option<String>,
    pub connected_clients: Option<u64>,
    pub total_commands_processed: Option<u64>,
    pub keyspace_hits: Option<u64>,
    pub keyspace_misses: Option<u64>,
}

/// Key-value store abstraction (Redis, in-memory).
///
/// Single-key operations are assumed atomic; nothing spans keys.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name reported in stats.
    fn driver(&self) -> &'static str;

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }

    /// Get a value. Misses and backend errors both yield `None`.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value with optional TTL, replacing any previous entry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete several keys as independent operations.
    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> bool;

    /// Keys matching a glob pattern (`*` wildcard).
    async fn scan_keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::Unsupported("pattern scan"))
    }

    /// Set a value and register it under each tag.
    async fn set_tagged(
        &self,
        _tags: &[String],
        _key: &str,
        _value: &str,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Err(CacheError::Unsupported("tags"))
    }

    /// Delete every key registered under any of the tags.
    async fn flush_tags(&self, _tags: &[String]) -> Result<(), CacheError> {
        Err(CacheError::Unsupported("tags"))
    }

    /// Drop every key in the store.
    async fn flush_all(&self) -> Result<(), CacheError> {
        Err(CacheError::Unsupported("flush"))
    }

    async fn info(&self) -> Result<StoreInfo, CacheError> {
        Err(CacheError::Unsupported("info"))
    }
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Store does not support {0}")]
    Unsupported(&'static str),
}
