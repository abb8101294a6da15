//! The cache facade: typed, named cache operations per domain entity.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{CacheKey, CacheSettings, KeySpace, TtlTier, WriteFailurePolicy};
use crate::error::ConfigError;
use crate::ports::{CacheError, CacheStore, CatalogSource, MaintenanceRunner, StoreCapabilities};
use crate::services::index::SecondaryIndex;

/// Policy layer between the application and the backing key-value store.
///
/// Callers never build keys or pick TTLs; every entity has a `cache_*` /
/// `get_cached_*` pair and matching `invalidate_*` operations.
///
/// Reads never fail: a miss, a store error and an undecodable payload all
/// come back as `None`. Writes and invalidations follow the configured
/// [`WriteFailurePolicy`].
pub struct CacheFacade {
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) catalog: Option<Arc<dyn CatalogSource>>,
    pub(crate) maintenance: Option<Arc<dyn MaintenanceRunner>>,
    pub(crate) settings: CacheSettings,
    pub(crate) keys: KeySpace,
    pub(crate) capabilities: StoreCapabilities,
    pub(crate) index: SecondaryIndex,
}

impl CacheFacade {
    pub fn new(store: Arc<dyn CacheStore>, settings: CacheSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let capabilities = store.capabilities();
        tracing::info!(
            driver = store.driver(),
            pattern_scan = capabilities.pattern_scan,
            tags = capabilities.tags,
            flush = capabilities.flush,
            info = capabilities.info,
            "Cache facade initialized"
        );

        Ok(Self {
            keys: KeySpace::new(settings.prefixes.clone()),
            store,
            catalog: None,
            maintenance: None,
            settings,
            capabilities,
            index: SecondaryIndex::default(),
        })
    }

    /// Attach the system of record used by warm-up.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Attach the runner for application-level cache clears.
    pub fn with_maintenance(mut self, runner: Arc<dyn MaintenanceRunner>) -> Self {
        self.maintenance = Some(runner);
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Cache a product for the medium tier.
    ///
    /// When the payload is an object with a string `slug` field the entry is
    /// also written under the slug alias.
    pub async fn cache_product<T: Serialize + ?Sized>(
        &self,
        product_id: u64,
        data: &T,
    ) -> Result<(), CacheError> {
        self.cache_product_with_ttl(product_id, data, TtlTier::Medium)
            .await
    }

    pub async fn cache_product_with_ttl<T: Serialize + ?Sized>(
        &self,
        product_id: u64,
        data: &T,
        tier: TtlTier,
    ) -> Result<(), CacheError> {
        let result = self.write_product(product_id, data, tier).await;
        self.settle("cache_product", result)
    }

    async fn write_product<T: Serialize + ?Sized>(
        &self,
        product_id: u64,
        data: &T,
        tier: TtlTier,
    ) -> Result<(), CacheError> {
        let value =
            serde_json::to_value(data).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let slug = value
            .get("slug")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        let payload = value.to_string();

        self.write_raw(&self.keys.product(product_id), &payload, tier)
            .await?;

        if let Some(slug) = slug {
            self.write_raw(&self.keys.product_slug(&slug), &payload, tier)
                .await?;

            if self.settings.index.slug_aliases {
                if let Some(previous) = self
                    .index
                    .record_slug(product_id, &slug, self.ttl(tier))
                    .await
                {
                    tracing::debug!(product_id, previous = %previous, slug = %slug, "Product slug changed");
                    self.store
                        .delete(self.keys.product_slug(&previous).as_str())
                        .await?;
                }
            }
        }

        Ok(())
    }

    pub async fn get_cached_product<T: DeserializeOwned>(&self, product_id: u64) -> Option<T> {
        self.fetch(&self.keys.product(product_id)).await
    }

    pub async fn get_cached_product_by_slug<T: DeserializeOwned>(&self, slug: &str) -> Option<T> {
        self.fetch(&self.keys.product_slug(slug)).await
    }

    pub async fn cache_featured_products<T: Serialize + ?Sized>(
        &self,
        products: &T,
    ) -> Result<(), CacheError> {
        let result = self
            .write(&self.keys.featured_products(), products, TtlTier::Medium)
            .await;
        self.settle("cache_featured_products", result)
    }

    pub async fn get_cached_featured_products<T: DeserializeOwned>(&self) -> Option<T> {
        self.fetch(&self.keys.featured_products()).await
    }

    // ------------------------------------------------------------------
    // Categories and producers
    // ------------------------------------------------------------------

    pub async fn cache_category_tree<T: Serialize + ?Sized>(
        &self,
        tree: &T,
    ) -> Result<(), CacheError> {
        let result = self
            .write(&self.keys.category_tree(), tree, TtlTier::Long)
            .await;
        self.settle("cache_category_tree", result)
    }

    pub async fn get_cached_category_tree<T: DeserializeOwned>(&self) -> Option<T> {
        self.fetch(&self.keys.category_tree()).await
    }

    pub async fn cache_producer<T: Serialize + ?Sized>(
        &self,
        producer_id: u64,
        data: &T,
    ) -> Result<(), CacheError> {
        let result = self
            .write(&self.keys.producer(producer_id), data, TtlTier::Long)
            .await;
        self.settle("cache_producer", result)
    }

    pub async fn get_cached_producer<T: DeserializeOwned>(&self, producer_id: u64) -> Option<T> {
        self.fetch(&self.keys.producer(producer_id)).await
    }

    // ------------------------------------------------------------------
    // Orders, B2B and invoices
    // ------------------------------------------------------------------

    /// Order history changes often, so it only lives for the short tier.
    pub async fn cache_user_orders<T: Serialize + ?Sized>(
        &self,
        user_id: u64,
        orders: &T,
    ) -> Result<(), CacheError> {
        let result = self
            .write(&self.keys.user_orders(user_id), orders, TtlTier::Short)
            .await;
        self.settle("cache_user_orders", result)
    }

    pub async fn get_cached_user_orders<T: DeserializeOwned>(&self, user_id: u64) -> Option<T> {
        self.fetch(&self.keys.user_orders(user_id)).await
    }

    pub async fn cache_b2b_user<T: Serialize + ?Sized>(
        &self,
        user_id: u64,
        data: &T,
    ) -> Result<(), CacheError> {
        let result = self
            .write(&self.keys.b2b_user(user_id), data, TtlTier::Medium)
            .await;
        self.settle("cache_b2b_user", result)
    }

    pub async fn get_cached_b2b_user<T: DeserializeOwned>(&self, user_id: u64) -> Option<T> {
        self.fetch(&self.keys.b2b_user(user_id)).await
    }

    pub async fn cache_b2b_pricing(
        &self,
        user_id: u64,
        product_id: u64,
        price: f64,
    ) -> Result<(), CacheError> {
        let key = self.keys.b2b_pricing(user_id, product_id);
        let result = self.write(&key, &price, TtlTier::Medium).await;
        if result.is_ok() && self.settings.index.b2b_pricing {
            self.index
                .record_pricing(user_id, product_id, self.ttl(TtlTier::Medium))
                .await;
        }
        self.settle("cache_b2b_pricing", result)
    }

    pub async fn get_cached_b2b_pricing(&self, user_id: u64, product_id: u64) -> Option<f64> {
        self.fetch(&self.keys.b2b_pricing(user_id, product_id))
            .await
    }

    pub async fn cache_invoice<T: Serialize + ?Sized>(
        &self,
        invoice_id: u64,
        data: &T,
    ) -> Result<(), CacheError> {
        let result = self
            .write(&self.keys.invoice(invoice_id), data, TtlTier::Medium)
            .await;
        self.settle("cache_invoice", result)
    }

    pub async fn get_cached_invoice<T: DeserializeOwned>(&self, invoice_id: u64) -> Option<T> {
        self.fetch(&self.keys.invoice(invoice_id)).await
    }

    pub async fn cache_user_invoices<T: Serialize + ?Sized>(
        &self,
        user_id: u64,
        invoices: &T,
    ) -> Result<(), CacheError> {
        let result = self
            .write(&self.keys.user_invoices(user_id), invoices, TtlTier::Short)
            .await;
        self.settle("cache_user_invoices", result)
    }

    pub async fn get_cached_user_invoices<T: DeserializeOwned>(&self, user_id: u64) -> Option<T> {
        self.fetch(&self.keys.user_invoices(user_id)).await
    }

    /// Read-through: return the cached value or run `loader` and cache its result.
    ///
    /// A failed cache write is logged and never hides the loaded value.
    pub async fn remember<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        tier: TtlTier,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.fetch(key).await {
            return Ok(cached);
        }

        let value = loader().await?;
        if let Err(e) = self.write(key, &value, tier).await {
            tracing::warn!(key = %key, error = %e, "Read-through cache write failed");
        }
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Drop a product's id entry, its slug alias and the featured list.
    ///
    /// The featured list is always evicted since membership is unknown here.
    /// Without `slug` the alias survives unless the slug index is enabled.
    pub async fn invalidate_product_caches(
        &self,
        product_id: u64,
        slug: Option<&str>,
    ) -> Result<(), CacheError> {
        let mut keys = vec![self.keys.product(product_id), self.keys.featured_products()];
        if let Some(slug) = slug {
            keys.push(self.keys.product_slug(slug));
        }
        let indexed = if self.settings.index.slug_aliases {
            self.index.slug(product_id).await
        } else {
            None
        };
        if let Some(indexed) = indexed.as_deref() {
            if slug != Some(indexed) {
                keys.push(self.keys.product_slug(indexed));
            }
        }

        let result = self.forget(keys).await;
        // Keep the index entry when the delete failed so a retry still finds the alias
        if let (Ok(()), Some(indexed)) = (&result, indexed.as_deref()) {
            self.index.forget_slug(product_id, indexed).await;
        }
        self.settle("invalidate_product_caches", result)
    }

    pub async fn invalidate_category_caches(&self) -> Result<(), CacheError> {
        let result = self.forget(vec![self.keys.category_tree()]).await;
        self.settle("invalidate_category_caches", result)
    }

    pub async fn invalidate_producer_caches(&self, producer_id: u64) -> Result<(), CacheError> {
        let result = self.forget(vec![self.keys.producer(producer_id)]).await;
        self.settle("invalidate_producer_caches", result)
    }

    pub async fn invalidate_invoice_caches(&self, invoice_id: u64) -> Result<(), CacheError> {
        let result = self.forget(vec![self.keys.invoice(invoice_id)]).await;
        self.settle("invalidate_invoice_caches", result)
    }

    /// Drop a user's orders, B2B profile and invoice list.
    ///
    /// The deletes are independent; a concurrent reader may see some of them
    /// applied before the others.
    pub async fn invalidate_user_caches(&self, user_id: u64) -> Result<(), CacheError> {
        let keys = vec![
            self.keys.user_orders(user_id),
            self.keys.b2b_user(user_id),
            self.keys.user_invoices(user_id),
        ];
        let result = self.forget(keys).await;
        self.settle("invalidate_user_caches", result)
    }

    /// Drop every cached B2B price of one user.
    ///
    /// Keys come from the pricing index and, when the store supports it, a
    /// pattern scan. With neither available this is a no-op.
    pub async fn invalidate_b2b_pricing_caches(&self, user_id: u64) -> Result<(), CacheError> {
        let indexed = if self.settings.index.b2b_pricing {
            self.index.pricing(user_id).await
        } else {
            Vec::new()
        };
        let mut keys: BTreeSet<String> = indexed
            .iter()
            .map(|product_id| self.keys.b2b_pricing(user_id, *product_id).into_string())
            .collect();

        let mut scan_error = None;
        if self.capabilities.pattern_scan {
            match self
                .store
                .scan_keys(&self.keys.b2b_pricing_pattern(user_id))
                .await
            {
                Ok(found) => keys.extend(found),
                Err(e) => scan_error = Some(e),
            }
        } else if !self.settings.index.b2b_pricing {
            tracing::debug!(
                user_id,
                driver = self.store.driver(),
                "Store cannot scan keys and pricing index is off; skipping B2B pricing invalidation"
            );
            return Ok(());
        }

        let keys: Vec<String> = keys.into_iter().collect();
        let mut result = if keys.is_empty() {
            Ok(())
        } else {
            self.store.delete_many(&keys).await
        };
        if result.is_ok() && !indexed.is_empty() {
            self.index.forget_pricing(user_id, &indexed).await;
        }
        if let Some(e) = scan_error {
            result = result.and(Err(e));
        }

        tracing::debug!(user_id, removed = keys.len(), "B2B pricing caches invalidated");
        self.settle("invalidate_b2b_pricing_caches", result)
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Cache under tags when the store supports them, as a plain entry otherwise.
    ///
    /// The value is readable through `key` either way.
    pub async fn cache_with_tags<T: Serialize + ?Sized>(
        &self,
        tags: &[&str],
        key: &CacheKey,
        value: &T,
        tier: TtlTier,
    ) -> Result<(), CacheError> {
        let result = if self.capabilities.tags {
            match serde_json::to_string(value) {
                Ok(payload) => {
                    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
                    self.store
                        .set_tagged(&tags, key.as_str(), &payload, Some(self.ttl(tier)))
                        .await
                }
                Err(e) => Err(CacheError::Serialization(e.to_string())),
            }
        } else {
            tracing::debug!(key = %key, "Store has no tag support; caching without tags");
            self.write(key, value, tier).await
        };
        self.settle("cache_with_tags", result)
    }

    /// Flush tagged groups. A no-op on stores without tag support.
    pub async fn invalidate_by_tags(&self, tags: &[&str]) -> Result<(), CacheError> {
        if !self.capabilities.tags {
            tracing::debug!(?tags, "Store has no tag support; tag invalidation skipped");
            return Ok(());
        }
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let result = self.store.flush_tags(&tags).await;
        self.settle("invalidate_by_tags", result)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(crate) fn ttl(&self, tier: TtlTier) -> std::time::Duration {
        self.settings.ttl.duration(tier)
    }

    pub(crate) async fn write<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        tier: TtlTier,
    ) -> Result<(), CacheError> {
        let payload =
            serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.write_raw(key, &payload, tier).await
    }

    async fn write_raw(&self, key: &CacheKey, payload: &str, tier: TtlTier) -> Result<(), CacheError> {
        self.store
            .set(key.as_str(), payload, Some(self.ttl(tier)))
            .await?;
        tracing::trace!(key = %key, tier = tier.as_str(), "Cache entry written");
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = self.store.get(key.as_str()).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn forget(&self, keys: Vec<CacheKey>) -> Result<(), CacheError> {
        let keys: Vec<String> = keys.into_iter().map(CacheKey::into_string).collect();
        self.store.delete_many(&keys).await
    }

    /// Apply the write failure policy to the outcome of a write or invalidation.
    fn settle(&self, operation: &'static str, result: Result<(), CacheError>) -> Result<(), CacheError> {
        match (result, self.settings.write_failures) {
            (Ok(()), _) => Ok(()),
            (Err(e), WriteFailurePolicy::Propagate) => Err(e),
            (Err(e), WriteFailurePolicy::LogAndContinue) => {
                tracing::warn!(
                    operation,
                    driver = self.store.driver(),
                    error = %e,
                    "Cache operation failed; continuing without cache"
                );
                Ok(())
            }
        }
    }
}
