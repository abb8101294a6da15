use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use dixis_core::CacheFacade;
use dixis_core::domain::{
    CacheSettings, Entity, IndexPolicy, SectionOutcome, TtlPolicy, TtlTier, WriteFailurePolicy,
};
use dixis_core::error::{MaintenanceError, SourceError};
use dixis_core::ports::{
    CacheError, CacheStore, CatalogRecord, ClearTarget, MaintenanceRunner, StoreCapabilities,
};
use dixis_core::services::FlushConfirmation;
use dixis_infra::{CatalogSection, CatalogSeed, InMemoryCatalog, InMemoryStore};

fn facade_with(store: Arc<InMemoryStore>, settings: CacheSettings) -> CacheFacade {
    CacheFacade::new(store, settings).unwrap()
}

fn facade() -> (Arc<InMemoryStore>, CacheFacade) {
    let store = Arc::new(InMemoryStore::new());
    (store.clone(), facade_with(store, CacheSettings::default()))
}

fn plain_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_capabilities(StoreCapabilities::default()))
}

/// Store whose every operation fails, as if the server were down.
struct UnreachableStore;

#[async_trait]
impl CacheStore for UnreachableStore {
    fn driver(&self) -> &'static str {
        "unreachable"
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            info: true,
            ..StoreCapabilities::default()
        }
    }

    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn exists(&self, _key: &str) -> bool {
        false
    }

    async fn info(&self) -> Result<dixis_core::ports::StoreInfo, CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }
}

/// Scan-less store whose deletes fail while `failing_deletes` is set.
#[derive(Default)]
struct FlakyDeleteStore {
    inner: InMemoryStore,
    failing_deletes: AtomicBool,
}

impl FlakyDeleteStore {
    fn fail_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for FlakyDeleteStore {
    fn driver(&self) -> &'static str {
        "flaky"
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(CacheError::Operation("READONLY replica".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> bool {
        self.inner.exists(key).await
    }
}

#[derive(Default)]
struct RecordingRunner {
    calls: AtomicUsize,
}

#[async_trait]
impl MaintenanceRunner for RecordingRunner {
    async fn clear(&self, target: ClearTarget) -> Result<(), MaintenanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match target {
            ClearTarget::Route => Err(MaintenanceError::Failed("route cache locked".to_string())),
            _ => Ok(()),
        }
    }
}

fn seed() -> CatalogSeed {
    CatalogSeed {
        featured_products: vec![
            json!({"id": 1, "name": "Kalamata olive oil", "slug": "kalamata-oil"}),
            json!({"id": 2, "name": "Thyme honey", "slug": "thyme-honey"}),
        ],
        category_tree: vec![json!({"id": 1, "name": "Pantry", "children": []})],
        verified_producers: vec![
            CatalogRecord {
                id: 10,
                data: json!({"id": 10, "business_name": "Crete Apiaries"}),
            },
            CatalogRecord {
                id: 11,
                data: json!({"id": 11, "business_name": "Lesvos Dairy"}),
            },
        ],
    }
}

#[tokio::test]
async fn test_product_round_trip() {
    let (_, cache) = facade();
    let product = json!({"id": 42, "name": "Feta PDO", "price": 8.5, "slug": "feta-pdo"});

    cache.cache_product(42, &product).await.unwrap();

    assert_eq!(cache.get_cached_product::<Value>(42).await, Some(product.clone()));
    assert_eq!(
        cache.get_cached_product_by_slug::<Value>("feta-pdo").await,
        Some(product)
    );
    assert_eq!(cache.get_cached_product::<Value>(43).await, None);
}

#[tokio::test]
async fn test_product_invalidation_with_slug_clears_both_keys() {
    let (_, cache) = facade();
    cache
        .cache_product(42, &json!({"slug": "feta-pdo"}))
        .await
        .unwrap();
    cache
        .cache_featured_products(&vec![json!({"id": 42})])
        .await
        .unwrap();

    cache
        .invalidate_product_caches(42, Some("feta-pdo"))
        .await
        .unwrap();

    assert_eq!(cache.get_cached_product::<Value>(42).await, None);
    assert_eq!(cache.get_cached_product_by_slug::<Value>("feta-pdo").await, None);
    assert_eq!(cache.get_cached_featured_products::<Value>().await, None);
}

#[tokio::test]
async fn test_product_invalidation_without_slug_keeps_alias() {
    let (_, cache) = facade();
    cache
        .cache_product(42, &json!({"slug": "feta-pdo"}))
        .await
        .unwrap();

    cache.invalidate_product_caches(42, None).await.unwrap();

    assert_eq!(cache.get_cached_product::<Value>(42).await, None);
    assert!(
        cache
            .get_cached_product_by_slug::<Value>("feta-pdo")
            .await
            .is_some()
    );
}

#[tokio::test]
async fn test_slug_index_evicts_alias_without_slug() {
    let store = Arc::new(InMemoryStore::new());
    let cache = facade_with(
        store,
        CacheSettings {
            index: IndexPolicy {
                slug_aliases: true,
                b2b_pricing: true,
            },
            ..CacheSettings::default()
        },
    );
    cache
        .cache_product(42, &json!({"slug": "feta"}))
        .await
        .unwrap();
    // Renaming the slug drops the stale alias right away
    cache
        .cache_product(42, &json!({"slug": "feta-pdo"}))
        .await
        .unwrap();
    assert_eq!(cache.get_cached_product_by_slug::<Value>("feta").await, None);

    cache.invalidate_product_caches(42, None).await.unwrap();
    assert_eq!(cache.get_cached_product_by_slug::<Value>("feta-pdo").await, None);
}

#[tokio::test]
async fn test_entity_round_trips() {
    let (_, cache) = facade();

    cache
        .cache_category_tree(&vec![json!({"id": 1, "children": []})])
        .await
        .unwrap();
    cache
        .cache_producer(3, &json!({"business_name": "Naxos Farm"}))
        .await
        .unwrap();
    cache.cache_user_orders(7, &vec![101, 102]).await.unwrap();
    cache
        .cache_b2b_user(7, &json!({"company": "Taverna Ltd"}))
        .await
        .unwrap();
    cache.cache_invoice(900, &json!({"total": 120.0})).await.unwrap();
    cache.cache_user_invoices(7, &vec![900]).await.unwrap();

    assert!(cache.get_cached_category_tree::<Vec<Value>>().await.is_some());
    assert_eq!(
        cache.get_cached_producer::<Value>(3).await,
        Some(json!({"business_name": "Naxos Farm"}))
    );
    assert_eq!(cache.get_cached_user_orders::<Vec<u64>>(7).await, Some(vec![101, 102]));
    assert!(cache.get_cached_b2b_user::<Value>(7).await.is_some());
    assert_eq!(
        cache.get_cached_invoice::<Value>(900).await,
        Some(json!({"total": 120.0}))
    );
    assert_eq!(cache.get_cached_user_invoices::<Vec<u64>>(7).await, Some(vec![900]));
}

#[tokio::test]
async fn test_user_invalidation_clears_user_bundle_only() {
    let (_, cache) = facade();
    cache.cache_user_orders(7, &vec![1]).await.unwrap();
    cache.cache_b2b_user(7, &json!({})).await.unwrap();
    cache.cache_user_invoices(7, &vec![2]).await.unwrap();
    cache.cache_user_orders(8, &vec![3]).await.unwrap();
    cache.cache_invoice(2, &json!({})).await.unwrap();

    cache.invalidate_user_caches(7).await.unwrap();

    assert_eq!(cache.get_cached_user_orders::<Vec<u64>>(7).await, None);
    assert_eq!(cache.get_cached_b2b_user::<Value>(7).await, None);
    assert_eq!(cache.get_cached_user_invoices::<Vec<u64>>(7).await, None);
    assert!(cache.get_cached_user_orders::<Vec<u64>>(8).await.is_some());
    assert!(cache.get_cached_invoice::<Value>(2).await.is_some());
}

#[tokio::test]
async fn test_category_producer_and_invoice_invalidation() {
    let (_, cache) = facade();
    cache.cache_category_tree(&json!([])).await.unwrap();
    cache.cache_producer(3, &json!({})).await.unwrap();
    cache.cache_invoice(9, &json!({})).await.unwrap();

    cache.invalidate_category_caches().await.unwrap();
    cache.invalidate_producer_caches(3).await.unwrap();
    cache.invalidate_invoice_caches(9).await.unwrap();

    assert_eq!(cache.get_cached_category_tree::<Value>().await, None);
    assert_eq!(cache.get_cached_producer::<Value>(3).await, None);
    assert_eq!(cache.get_cached_invoice::<Value>(9).await, None);
}

#[tokio::test]
async fn test_b2b_pricing_keys_do_not_collide() {
    let (_, cache) = facade();
    cache.cache_b2b_pricing(1, 100, 9.99).await.unwrap();
    cache.cache_b2b_pricing(1, 200, 14.99).await.unwrap();

    assert_eq!(cache.get_cached_b2b_pricing(1, 100).await, Some(9.99));
    assert_eq!(cache.get_cached_b2b_pricing(1, 200).await, Some(14.99));
    assert_eq!(cache.get_cached_b2b_pricing(2, 100).await, None);
}

#[tokio::test]
async fn test_b2b_pricing_invalidation_via_scan() {
    let store = Arc::new(InMemoryStore::new());
    let cache = facade_with(
        store.clone(),
        CacheSettings {
            index: IndexPolicy {
                slug_aliases: false,
                b2b_pricing: false,
            },
            ..CacheSettings::default()
        },
    );
    cache.cache_b2b_pricing(1, 100, 9.99).await.unwrap();
    cache.cache_b2b_pricing(1, 200, 14.99).await.unwrap();
    cache.cache_b2b_pricing(12, 100, 7.5).await.unwrap();

    cache.invalidate_b2b_pricing_caches(1).await.unwrap();

    assert_eq!(cache.get_cached_b2b_pricing(1, 100).await, None);
    assert_eq!(cache.get_cached_b2b_pricing(1, 200).await, None);
    assert_eq!(cache.get_cached_b2b_pricing(12, 100).await, Some(7.5));
}

#[tokio::test]
async fn test_b2b_pricing_invalidation_via_index_on_scanless_store() {
    let cache = facade_with(plain_store(), CacheSettings::default());
    cache.cache_b2b_pricing(1, 100, 9.99).await.unwrap();
    cache.cache_b2b_pricing(1, 200, 14.99).await.unwrap();
    cache.cache_b2b_pricing(2, 100, 3.0).await.unwrap();

    cache.invalidate_b2b_pricing_caches(1).await.unwrap();

    assert_eq!(cache.get_cached_b2b_pricing(1, 100).await, None);
    assert_eq!(cache.get_cached_b2b_pricing(1, 200).await, None);
    assert_eq!(cache.get_cached_b2b_pricing(2, 100).await, Some(3.0));
}

#[tokio::test]
async fn test_b2b_pricing_invalidation_is_noop_without_scan_or_index() {
    let cache = facade_with(
        plain_store(),
        CacheSettings {
            index: IndexPolicy {
                slug_aliases: false,
                b2b_pricing: false,
            },
            ..CacheSettings::default()
        },
    );
    cache.cache_b2b_pricing(1, 100, 9.99).await.unwrap();

    cache.invalidate_b2b_pricing_caches(1).await.unwrap();

    assert_eq!(cache.get_cached_b2b_pricing(1, 100).await, Some(9.99));
}

#[tokio::test]
async fn test_b2b_pricing_invalidation_retries_after_failed_delete() {
    let store = Arc::new(FlakyDeleteStore::default());
    let cache = CacheFacade::new(store.clone(), CacheSettings::default()).unwrap();
    cache.cache_b2b_pricing(1, 100, 9.99).await.unwrap();

    store.fail_deletes(true);
    assert!(cache.invalidate_b2b_pricing_caches(1).await.is_ok());
    assert_eq!(cache.get_cached_b2b_pricing(1, 100).await, Some(9.99));

    store.fail_deletes(false);
    cache.invalidate_b2b_pricing_caches(1).await.unwrap();
    assert_eq!(cache.get_cached_b2b_pricing(1, 100).await, None);
}

#[tokio::test]
async fn test_slug_alias_invalidation_retries_after_failed_delete() {
    let store = Arc::new(FlakyDeleteStore::default());
    let cache = CacheFacade::new(
        store.clone(),
        CacheSettings {
            index: IndexPolicy {
                slug_aliases: true,
                b2b_pricing: true,
            },
            ..CacheSettings::default()
        },
    )
    .unwrap();
    cache
        .cache_product(42, &json!({"slug": "feta-pdo"}))
        .await
        .unwrap();

    store.fail_deletes(true);
    assert!(cache.invalidate_product_caches(42, None).await.is_ok());
    assert!(
        cache
            .get_cached_product_by_slug::<Value>("feta-pdo")
            .await
            .is_some()
    );

    store.fail_deletes(false);
    cache.invalidate_product_caches(42, None).await.unwrap();
    assert_eq!(cache.get_cached_product_by_slug::<Value>("feta-pdo").await, None);
}

#[tokio::test]
async fn test_cache_with_tags_on_tagless_store_keeps_value() {
    let cache = facade_with(plain_store(), CacheSettings::default());
    let key = cache.keys().scoped(Entity::Products, "popular:10");

    cache
        .cache_with_tags(&["products", "products:popular"], &key, &json!([1, 2]), TtlTier::Medium)
        .await
        .unwrap();
    cache.invalidate_by_tags(&["products"]).await.unwrap();

    let cached = cache
        .remember(&key, TtlTier::Medium, || async {
            Err::<Value, SourceError>(SourceError::Query("should be served from cache".into()))
        })
        .await
        .unwrap();
    assert_eq!(cached, json!([1, 2]));
}

#[tokio::test]
async fn test_tag_invalidation_on_tagging_store() {
    let (store, cache) = facade();
    let popular = cache.keys().scoped(Entity::Products, "popular:10");
    let filters = cache.keys().scoped(Entity::Categories, "filters");

    cache
        .cache_with_tags(&["products"], &popular, &json!([1]), TtlTier::Short)
        .await
        .unwrap();
    cache
        .cache_with_tags(&["categories"], &filters, &json!({}), TtlTier::Short)
        .await
        .unwrap();
    assert!(store.exists(popular.as_str()).await);

    cache.invalidate_by_tags(&["products"]).await.unwrap();

    assert!(!store.exists(popular.as_str()).await);
    assert!(store.exists(filters.as_str()).await);
}

#[tokio::test]
async fn test_remember_loads_once() {
    let (_, cache) = facade();
    let key = cache.keys().scoped(Entity::Producers, "locations");
    let loads = AtomicUsize::new(0);

    for _ in 0..3 {
        let value: Vec<String> = cache
            .remember(&key, TtlTier::Long, || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SourceError>(vec!["Crete".to_string(), "Lesvos".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(value.len(), 2);
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remember_falls_back_when_store_is_down() {
    let cache = CacheFacade::new(Arc::new(UnreachableStore), CacheSettings::default()).unwrap();
    let key = cache.keys().scoped(Entity::Products, "count");

    let value = cache
        .remember(&key, TtlTier::Short, || async { Ok::<_, SourceError>(17u32) })
        .await
        .unwrap();
    assert_eq!(value, 17);
}

#[tokio::test]
async fn test_entries_expire_with_tier() {
    let store = Arc::new(InMemoryStore::new());
    let cache = facade_with(
        store,
        CacheSettings {
            ttl: TtlPolicy {
                short: Duration::from_millis(30),
                ..TtlPolicy::default()
            },
            ..CacheSettings::default()
        },
    );
    cache.cache_user_orders(7, &vec![1]).await.unwrap();
    cache.cache_b2b_user(7, &json!({})).await.unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(cache.get_cached_user_orders::<Vec<u64>>(7).await, None);
    assert!(cache.get_cached_b2b_user::<Value>(7).await.is_some());
}

#[tokio::test]
async fn test_undecodable_entry_reads_as_absent() {
    let (store, cache) = facade();
    store
        .set("producers:5", "{not json", None)
        .await
        .unwrap();
    assert_eq!(cache.get_cached_producer::<Value>(5).await, None);

    cache.cache_producer(6, &json!("a string")).await.unwrap();
    assert_eq!(cache.get_cached_producer::<u64>(6).await, None);
}

#[tokio::test]
async fn test_write_failures_follow_policy() {
    let lenient =
        CacheFacade::new(Arc::new(UnreachableStore), CacheSettings::default()).unwrap();
    assert!(lenient.cache_producer(1, &json!({})).await.is_ok());
    assert!(lenient.invalidate_user_caches(1).await.is_ok());
    assert_eq!(lenient.get_cached_producer::<Value>(1).await, None);

    let strict = CacheFacade::new(
        Arc::new(UnreachableStore),
        CacheSettings {
            write_failures: WriteFailurePolicy::Propagate,
            ..CacheSettings::default()
        },
    )
    .unwrap();
    assert!(matches!(
        strict.cache_producer(1, &json!({})).await,
        Err(CacheError::Connection(_))
    ));
    assert!(strict.invalidate_category_caches().await.is_err());
}

#[tokio::test]
async fn test_warm_up_populates_all_sections() {
    let (_, cache) = facade();
    let cache = cache.with_catalog(Arc::new(InMemoryCatalog::new(seed())));

    let report = cache.warm_up_caches().await;

    assert!(!report.has_failures());
    assert_eq!(report.get("producers"), Some(&SectionOutcome::succeeded("2 cached")));
    assert_eq!(
        cache.get_cached_featured_products::<Vec<Value>>().await.map(|p| p.len()),
        Some(2)
    );
    assert!(cache.get_cached_category_tree::<Vec<Value>>().await.is_some());
    assert_eq!(
        cache.get_cached_producer::<Value>(11).await,
        Some(json!({"id": 11, "business_name": "Lesvos Dairy"}))
    );
}

#[tokio::test]
async fn test_warm_up_isolates_producer_failure() {
    let (_, cache) = facade();
    let cache = cache.with_catalog(Arc::new(InMemoryCatalog::new(seed()).failing(
        CatalogSection::VerifiedProducers,
        "relation \"producers\" does not exist",
    )));

    let report = cache.warm_up_caches().await;

    assert_eq!(report.failed_sections(), vec!["producers"]);
    assert_eq!(
        report.get("featured_products"),
        Some(&SectionOutcome::succeeded("cached"))
    );
    assert_eq!(report.get("category_tree"), Some(&SectionOutcome::succeeded("cached")));
    assert!(cache.get_cached_featured_products::<Vec<Value>>().await.is_some());
    assert!(cache.get_cached_category_tree::<Vec<Value>>().await.is_some());
    assert_eq!(cache.get_cached_producer::<Value>(10).await, None);
}

#[tokio::test]
async fn test_warm_up_without_catalog_reports_every_section() {
    let (_, cache) = facade();
    let report = cache.warm_up_caches().await;
    assert_eq!(report.failed_sections().len(), 3);
}

#[tokio::test]
async fn test_clear_all_caches() {
    let (store, cache) = facade();
    let runner = Arc::new(RecordingRunner::default());
    let cache = cache.with_maintenance(runner.clone());
    cache.cache_producer(1, &json!({})).await.unwrap();
    cache.cache_b2b_pricing(1, 100, 9.99).await.unwrap();
    store.set("legacy:key", "x", None).await.unwrap();

    let report = cache
        .clear_all_caches(FlushConfirmation::confirmed("integration test"))
        .await;

    assert!(store.is_empty().await);
    assert_eq!(report.get("store"), Some(&SectionOutcome::succeeded("flushed")));
    assert_eq!(report.get("config_cache"), Some(&SectionOutcome::succeeded("cleared")));
    assert_eq!(report.get("view_cache"), Some(&SectionOutcome::succeeded("cleared")));
    assert_eq!(report.failed_sections(), vec!["route_cache"]);
    assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_clear_all_on_store_without_flush() {
    let cache = facade_with(plain_store(), CacheSettings::default());
    let report = cache
        .clear_all_caches(FlushConfirmation::confirmed("integration test"))
        .await;
    assert_eq!(report.failed_sections(), vec!["store"]);
}

#[tokio::test]
async fn test_cache_stats() {
    let (_, cache) = facade();
    let empty = cache.get_cache_stats().await;
    assert_eq!(empty.driver, "memory");
    assert_eq!(empty.hit_rate, Some(0.0));

    cache.cache_producer(1, &json!({})).await.unwrap();
    for _ in 0..3 {
        cache.get_cached_producer::<Value>(1).await;
    }
    cache.get_cached_producer::<Value>(2).await;

    let stats = cache.get_cache_stats().await;
    assert_eq!(stats.keyspace_hits, Some(3));
    assert_eq!(stats.keyspace_misses, Some(1));
    assert_eq!(stats.hit_rate, Some(75.0));
}

#[tokio::test]
async fn test_cache_stats_degrade() {
    let plain = facade_with(plain_store(), CacheSettings::default());
    let stats = plain.get_cache_stats().await;
    assert_eq!(stats.hit_rate, None);
    assert_eq!(stats.error, None);

    let down = CacheFacade::new(Arc::new(UnreachableStore), CacheSettings::default()).unwrap();
    let stats = down.get_cache_stats().await;
    assert_eq!(stats.driver, "unreachable");
    assert!(stats.error.is_some());
}
