//! In-process reverse indices for alias keys the store cannot enumerate cheaply.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Entries keyed by owner id, each carrying the expiry of the cache entry it
/// points at.
///
/// Expired entries are swept on writes at most once per half TTL, so the
/// index stays bounded by what was written during the last TTL and a half.
struct Expiring<V> {
    entries: HashMap<u64, V>,
    next_sweep: Option<Instant>,
}

impl<V> Default for Expiring<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_sweep: None,
        }
    }
}

impl<V> Expiring<V> {
    fn sweep_due(&mut self, now: Instant, ttl: Duration) -> bool {
        if self.next_sweep.is_some_and(|at| now < at) {
            return false;
        }
        self.next_sweep = Some(now + ttl / 2);
        true
    }
}

/// Product id -> slug and user id -> priced product ids.
///
/// Readers get a snapshot; callers drop entries only once the keys they
/// name are gone from the store, so a failed delete can be retried.
#[derive(Default)]
pub(crate) struct SecondaryIndex {
    slugs: RwLock<Expiring<(String, Instant)>>,
    pricing: RwLock<Expiring<HashMap<u64, Instant>>>,
}

impl SecondaryIndex {
    /// Remember the slug for a product, returning the previous one if it changed.
    pub(crate) async fn record_slug(
        &self,
        product_id: u64,
        slug: &str,
        ttl: Duration,
    ) -> Option<String> {
        let now = Instant::now();
        let mut slugs = self.slugs.write().await;
        if slugs.sweep_due(now, ttl) {
            slugs.entries.retain(|_, (_, expires_at)| *expires_at > now);
        }

        match slugs
            .entries
            .insert(product_id, (slug.to_string(), now + ttl))
        {
            Some((previous, _)) if previous != slug => Some(previous),
            _ => None,
        }
    }

    pub(crate) async fn slug(&self, product_id: u64) -> Option<String> {
        let now = Instant::now();
        self.slugs
            .read()
            .await
            .entries
            .get(&product_id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(slug, _)| slug.clone())
    }

    /// Drop the slug entry unless it has been replaced since it was read.
    pub(crate) async fn forget_slug(&self, product_id: u64, slug: &str) {
        let mut slugs = self.slugs.write().await;
        if slugs
            .entries
            .get(&product_id)
            .is_some_and(|(current, _)| current == slug)
        {
            slugs.entries.remove(&product_id);
        }
    }

    pub(crate) async fn record_pricing(&self, user_id: u64, product_id: u64, ttl: Duration) {
        let now = Instant::now();
        let mut pricing = self.pricing.write().await;
        if pricing.sweep_due(now, ttl) {
            pricing.entries.retain(|_, products| {
                products.retain(|_, expires_at| *expires_at > now);
                !products.is_empty()
            });
        }

        pricing
            .entries
            .entry(user_id)
            .or_default()
            .insert(product_id, now + ttl);
    }

    /// Product ids with a live cached price for `user_id`, ascending.
    pub(crate) async fn pricing(&self, user_id: u64) -> Vec<u64> {
        let now = Instant::now();
        let pricing = self.pricing.read().await;
        let mut products: Vec<u64> = pricing
            .entries
            .get(&user_id)
            .map(|products| {
                products
                    .iter()
                    .filter(|(_, expires_at)| **expires_at > now)
                    .map(|(product_id, _)| *product_id)
                    .collect()
            })
            .unwrap_or_default();
        products.sort_unstable();
        products
    }

    pub(crate) async fn forget_pricing(&self, user_id: u64, product_ids: &[u64]) {
        let mut pricing = self.pricing.write().await;
        if let Some(products) = pricing.entries.get_mut(&user_id) {
            for product_id in product_ids {
                products.remove(product_id);
            }
            if products.is_empty() {
                pricing.entries.remove(&user_id);
            }
        }
    }

    pub(crate) async fn clear(&self) {
        *self.slugs.write().await = Expiring::default();
        *self.pricing.write().await = Expiring::default();
    }
}
