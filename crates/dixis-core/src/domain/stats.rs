//! Cache statistics derived from store metadata.

use serde::{Deserialize, Serialize};

use crate::ports::{StoreCapabilities, StoreInfo};

/// Snapshot returned by `CacheFacade::get_cache_stats`.
///
/// Store metadata fields stay `None` when the backing store does not expose them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub driver: String,
    pub capabilities: StoreCapabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_clients: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_commands_processed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyspace_hits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyspace_misses: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStats {
    pub(crate) fn new(driver: &str, capabilities: StoreCapabilities) -> Self {
        Self {
            driver: driver.to_string(),
            capabilities,
            ..Self::default()
        }
    }

    pub(crate) fn with_info(mut self, info: StoreInfo) -> Self {
        if info.keyspace_hits.is_some() || info.keyspace_misses.is_some() {
            self.hit_rate = Some(hit_rate(
                info.keyspace_hits.unwrap_or(0),
                info.keyspace_misses.unwrap_or(0),
            ));
        }
        self.version = info.version;
        self.used_memory = info.used_memory;
        self.connected_clients = info.connected_clients;
        self.total_commands_processed = info.total_commands_processed;
        self.keyspace_hits = info.keyspace_hits;
        self.keyspace_misses = info.keyspace_misses;
        self
    }
}

/// Hit percentage rounded to two decimals; 0 when nothing was looked up.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    if hits == 0 && misses == 0 {
        return 0.0;
    }
    // Summed as floats: server counters can sit near u64::MAX
    let rate = hits as f64 / (hits as f64 + misses as f64) * 100.0;
    (rate * 100.0).round() / 100.0
}
