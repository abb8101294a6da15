//! Redis cache store with connection management, key scans and tag groups.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, InfoDict};

use dixis_core::ports::{CacheError, CacheStore, StoreCapabilities, StoreInfo};

/// Redis connection configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g., redis://localhost:6379)
    pub url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whether to fallback to the in-memory store if Redis is unavailable
    pub fallback_to_memory: bool,
    /// Prefix of the sets that hold tag membership
    pub tag_prefix: String,
    /// COUNT hint passed to SCAN
    pub scan_batch: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            fallback_to_memory: true,
            tag_prefix: "tags:".to_string(),
            scan_batch: 200,
        }
    }
}

impl RedisConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            connect_timeout: std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            fallback_to_memory: std::env::var("REDIS_FALLBACK_TO_MEMORY")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.fallback_to_memory),
            tag_prefix: std::env::var("REDIS_TAG_PREFIX").unwrap_or(defaults.tag_prefix),
            scan_batch: std::env::var("REDIS_SCAN_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.scan_batch),
        }
    }
}

/// Redis-backed store.
///
/// Uses connection manager for automatic reconnection. Tag groups are Redis
/// sets named `<tag_prefix><tag>` holding member keys.
pub struct RedisStore {
    conn: ConnectionManager,
    config: RedisConfig,
}

impl RedisStore {
    pub async fn new(config: RedisConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        // Use timeout to prevent hanging if Redis is unreachable
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| CacheError::Connection("Connection timed out".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, "Connected to Redis cache");

        Ok(Self { conn, config })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, CacheError> {
        Self::new(RedisConfig::from_env()).await
    }

    fn tag_key(&self, tag: &str) -> String {
        format!("{}{}", self.config.tag_prefix, tag)
    }
}

fn op_err(e: redis::RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}

/// Redis rejects `SET EX 0`, so sub-second TTLs round up.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    fn driver(&self) -> &'static str {
        "redis"
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::all()
    }

    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                conn.set_ex::<_, _, ()>(key, value, ttl_secs(duration))
                    .await
                    .map_err(op_err)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value).await.map_err(op_err)?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(op_err)?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(keys.to_vec()).await.map_err(op_err)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(key).await.unwrap_or(false)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        // Cursor-based SCAN rather than KEYS so large keyspaces do not block the server
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.config.scan_batch)
                .query_async(&mut conn)
                .await
                .map_err(op_err)?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn set_tagged(
        &self,
        tags: &[String],
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.set(key, value, ttl).await?;

        let mut conn = self.conn.clone();
        for tag in tags {
            conn.sadd::<_, _, ()>(self.tag_key(tag), key)
                .await
                .map_err(op_err)?;
        }
        Ok(())
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        for tag in tags {
            let tag_key = self.tag_key(tag);
            let members: Vec<String> = conn.smembers(&tag_key).await.map_err(op_err)?;
            if !members.is_empty() {
                conn.del::<_, ()>(&members).await.map_err(op_err)?;
            }
            conn.del::<_, ()>(&tag_key).await.map_err(op_err)?;
            tracing::debug!(tag = %tag, removed = members.len(), "Redis tag flushed");
        }
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(op_err)?;
        Ok(())
    }

    async fn info(&self) -> Result<StoreInfo, CacheError> {
        let mut conn = self.conn.clone();
        let info: InfoDict = redis::cmd("INFO")
            .query_async(&mut conn)
            .await
            .map_err(op_err)?;

        Ok(StoreInfo {
            version: info.get("redis_version"),
            used_memory: info.get("used_memory_human"),
            connected_clients: info.get("connected_clients"),
            total_commands_processed: info.get("total_commands_processed"),
            keyspace_hits: info.get("keyspace_hits"),
            keyspace_misses: info.get("keyspace_misses"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get_test_store() -> Option<RedisStore> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            fallback_to_memory: false,
            tag_prefix: "test-tags:".to_string(),
            ..RedisConfig::default()
        };

        RedisStore::new(config).await.ok()
    }

    #[test]
    fn test_subsecond_ttl_rounds_up() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(300)), 300);
    }

    #[tokio::test]
    async fn test_redis_store_set_get() {
        let store = match get_test_store().await {
            Some(s) => s,
            None => {
                tracing::warn!("Redis not available, skipping test");
                return;
            }
        };

        let key = "dixis_test_key";
        store.set(key, "value", None).await.unwrap();
        assert_eq!(store.get(key).await, Some("value".to_string()));

        store.delete(key).await.unwrap();
        assert_eq!(store.get(key).await, None);
    }

    #[tokio::test]
    async fn test_redis_scan_and_tags() {
        let store = match get_test_store().await {
            Some(s) => s,
            None => return,
        };

        store.set("dixis_test:pricing:1:100", "9.99", None).await.unwrap();
        store.set("dixis_test:pricing:1:200", "14.99", None).await.unwrap();
        let keys = store.scan_keys("dixis_test:pricing:1:*").await.unwrap();
        assert_eq!(keys, vec!["dixis_test:pricing:1:100", "dixis_test:pricing:1:200"]);
        store.delete_many(&keys).await.unwrap();

        let tags = vec!["dixis_test".to_string()];
        store
            .set_tagged(&tags, "dixis_test:tagged", "1", Some(Duration::from_secs(30)))
            .await
            .unwrap();
        store.flush_tags(&tags).await.unwrap();
        assert!(!store.exists("dixis_test:tagged").await);
    }
}
